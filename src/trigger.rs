//! Trigger classifier: decides whether a request is about Chilean law.
//!
//! Classification is a prioritized list of pure rules. Each rule either
//! yields an [`Intent`] or passes; the first rule that yields wins, so
//! tie-breaking is fixed by [`RULES`] order:
//!
//! 1. explicit command prefix (`/leychile ...`)
//! 2. foreign-jurisdiction cue ("Argentina", "Mexican", "US")
//! 3. explicit identifier phrase ("idNorma 172986")
//! 4. Chilean legal vocabulary
//! 5. jurisdiction-ambiguous legal terms ("labor laws")
//!
//! and a fallback that always yields [`Intent::OutOfDomain`]. The foreign cue
//! rule runs before the identifier rule so that no request naming another
//! country ever reaches the query builder.

use std::sync::Arc;

use serde::Serialize;

use crate::intent::{Intent, OutOfDomainReason};
use crate::lexicon::{
    self, CHILE_CUES, CODE_TERMS, ENGLISH_LEGAL_TERMS, SPANISH_LEGAL_TERMS, UNRELATED_TASK_CUES,
};
use crate::registry::{KnownEntityRegistry, Resolution};

/// Default explicit invocation prefix.
pub const DEFAULT_PREFIX: &str = "/leychile";

/// Identifies the rule that produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    ExplicitPrefix,
    ForeignJurisdiction,
    IdentifierPhrase,
    ChileanLegalVocabulary,
    AmbiguousLegalTerm,
    Fallback,
}

/// An intent together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub intent: Intent,
    pub rule: RuleId,
}

/// Everything a rule may look at. Rules never mutate it.
pub struct RuleContext<'a> {
    /// The request as typed.
    pub raw: &'a str,
    /// Normalized tokens of `raw`.
    pub tokens: Vec<String>,
    pub prefixes: &'a [String],
    pub registry: &'a KnownEntityRegistry,
}

impl<'a> RuleContext<'a> {
    pub fn new(raw: &'a str, prefixes: &'a [String], registry: &'a KnownEntityRegistry) -> Self {
        Self {
            raw,
            tokens: lexicon::tokenize(raw),
            prefixes,
            registry,
        }
    }

    fn has(&self, terms: &[&str]) -> bool {
        lexicon::contains_any(&self.tokens, terms)
    }
}

/// A classification rule.
pub type Rule = fn(&RuleContext<'_>) -> Option<Intent>;

/// Rules in priority order.
pub const RULES: &[(RuleId, Rule)] = &[
    (RuleId::ExplicitPrefix, explicit_prefix),
    (RuleId::ForeignJurisdiction, foreign_jurisdiction),
    (RuleId::IdentifierPhrase, identifier_phrase),
    (RuleId::ChileanLegalVocabulary, chilean_legal_vocabulary),
    (RuleId::AmbiguousLegalTerm, ambiguous_legal_term),
];

/// `/leychile` alone is [`Intent::Empty`]; with arguments it is an explicit
/// invocation. The prefix must be followed by whitespace or end of input.
pub fn explicit_prefix(ctx: &RuleContext<'_>) -> Option<Intent> {
    let trimmed = ctx.raw.trim();
    for prefix in ctx.prefixes {
        let Some(head) = trimmed.get(..prefix.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(prefix) {
            continue;
        }
        let rest = &trimmed[prefix.len()..];
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let args = rest.trim();
        return Some(if args.is_empty() {
            Intent::Empty
        } else {
            Intent::ExplicitInvocation {
                raw_args: args.to_string(),
            }
        });
    }
    None
}

/// Another country's legislation is never ours.
pub fn foreign_jurisdiction(ctx: &RuleContext<'_>) -> Option<Intent> {
    lexicon::find_foreign_cue(ctx.raw).map(|cue| Intent::OutOfDomain {
        reason: OutOfDomainReason::ForeignJurisdiction { cue },
    })
}

pub fn identifier_phrase(ctx: &RuleContext<'_>) -> Option<Intent> {
    lexicon::find_identifier(ctx.raw).map(|id| Intent::IdentifierLookup { id })
}

/// Spanish legal vocabulary, or legal vocabulary with an explicit Chilean cue.
///
/// "codigo" only counts when the request is not about programming; English
/// legal terms and registry names only count next to a Chilean cue.
pub fn chilean_legal_vocabulary(ctx: &RuleContext<'_>) -> Option<Intent> {
    let keywords = lexicon::extract_keywords(ctx.raw);
    if keywords.is_empty() {
        return None;
    }

    let spanish = ctx.has(SPANISH_LEGAL_TERMS);
    let code = ctx.has(CODE_TERMS) && !ctx.has(UNRELATED_TASK_CUES);
    let chile = ctx.has(CHILE_CUES);
    let english = ctx.has(ENGLISH_LEGAL_TERMS);
    let known = !matches!(
        ctx.registry.resolve_keywords(&keywords),
        Resolution::Unresolved
    );

    if spanish || code || (chile && (english || known)) {
        Some(Intent::TopicalSearch { keywords })
    } else {
        None
    }
}

/// Legal terms without a country: ask rather than guess. Programming
/// requests ("Debug my Rust code") are left to the fallback.
pub fn ambiguous_legal_term(ctx: &RuleContext<'_>) -> Option<Intent> {
    let legal = ctx.has(ENGLISH_LEGAL_TERMS) && !ctx.has(UNRELATED_TASK_CUES);
    legal.then(|| Intent::OutOfDomain {
        reason: OutOfDomainReason::AmbiguousJurisdiction,
    })
}

fn fallback(ctx: &RuleContext<'_>) -> Intent {
    let reason = if ctx.has(UNRELATED_TASK_CUES) {
        OutOfDomainReason::UnrelatedTask
    } else {
        OutOfDomainReason::NoLegalVocabulary
    };
    Intent::OutOfDomain { reason }
}

/// Re-interpret the arguments of an explicit invocation.
///
/// The user already asked for this subsystem, so any remaining keyword is a
/// topic. Arguments with neither identifier nor keywords come back as
/// [`OutOfDomainReason::NoLegalVocabulary`].
pub fn reinterpret_arguments(raw_args: &str) -> Intent {
    if let Some(cue) = lexicon::find_foreign_cue(raw_args) {
        return Intent::OutOfDomain {
            reason: OutOfDomainReason::ForeignJurisdiction { cue },
        };
    }
    if let Some(id) = lexicon::find_identifier(raw_args) {
        return Intent::IdentifierLookup { id };
    }
    let keywords = lexicon::extract_keywords(raw_args);
    if keywords.is_empty() {
        Intent::OutOfDomain {
            reason: OutOfDomainReason::NoLegalVocabulary,
        }
    } else {
        Intent::TopicalSearch { keywords }
    }
}

/// Classifies raw requests into [`Intent`]s.
#[derive(Debug, Clone)]
pub struct TriggerClassifier {
    registry: Arc<KnownEntityRegistry>,
    prefixes: Vec<String>,
}

impl TriggerClassifier {
    /// Classifier with the default `/leychile` prefix.
    pub fn new(registry: Arc<KnownEntityRegistry>) -> Self {
        Self::with_prefixes(registry, vec![DEFAULT_PREFIX.to_string()])
    }

    pub fn with_prefixes(registry: Arc<KnownEntityRegistry>, prefixes: Vec<String>) -> Self {
        Self { registry, prefixes }
    }

    /// Classify a request.
    pub fn classify(&self, raw_text: &str) -> Intent {
        self.explain(raw_text).intent
    }

    /// Classify a request and report which rule decided.
    pub fn explain(&self, raw_text: &str) -> Classification {
        let ctx = RuleContext::new(raw_text, &self.prefixes, &self.registry);
        for (rule, apply) in RULES {
            if let Some(intent) = apply(&ctx) {
                tracing::debug!(rule = ?rule, intent = intent.kind(), "request classified");
                return Classification {
                    intent,
                    rule: *rule,
                };
            }
        }
        let intent = fallback(&ctx);
        tracing::debug!(intent = intent.kind(), "no rule matched");
        Classification {
            intent,
            rule: RuleId::Fallback,
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}
