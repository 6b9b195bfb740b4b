//! Structured intents produced by the trigger classifier.

use serde::Serialize;

/// What a request asks for, as recognized from raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// The explicit command prefix followed by arguments.
    ExplicitInvocation { raw_args: String },
    /// A numeric LeyChile identifier ("idNorma 172986").
    IdentifierLookup { id: u64 },
    /// A topical request about Chilean law.
    TopicalSearch { keywords: Vec<String> },
    /// The explicit command prefix with nothing after it.
    Empty,
    /// Not a request about Chilean legislation.
    OutOfDomain { reason: OutOfDomainReason },
}

impl Intent {
    /// Short name of the variant, for logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExplicitInvocation { .. } => "explicit_invocation",
            Self::IdentifierLookup { .. } => "identifier_lookup",
            Self::TopicalSearch { .. } => "topical_search",
            Self::Empty => "empty",
            Self::OutOfDomain { .. } => "out_of_domain",
        }
    }

    /// Whether this subsystem should handle the request at all.
    pub fn is_applicable(&self) -> bool {
        !matches!(self, Self::OutOfDomain { .. })
    }
}

/// Why a request was classified as out of domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum OutOfDomainReason {
    /// The request names another country's legislation.
    ForeignJurisdiction { cue: String },
    /// General legal terms with no country; worth a clarifying question.
    AmbiguousJurisdiction,
    /// A task that is not legal research (coding, summarizing, ...).
    UnrelatedTask,
    /// No legal vocabulary at all.
    NoLegalVocabulary,
}

impl OutOfDomainReason {
    /// Whether the caller should ask the user instead of deferring elsewhere.
    pub fn wants_clarification(&self) -> bool {
        matches!(self, Self::AmbiguousJurisdiction)
    }
}

impl std::fmt::Display for OutOfDomainReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ForeignJurisdiction { cue } => write!(f, "foreign jurisdiction ({cue})"),
            Self::AmbiguousJurisdiction => write!(f, "no jurisdiction given"),
            Self::UnrelatedTask => write!(f, "not a legal research task"),
            Self::NoLegalVocabulary => write!(f, "no legal vocabulary"),
        }
    }
}
