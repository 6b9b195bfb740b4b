//! Query builder: turns intents into SPARQL queries over the BCN graph.
//!
//! A [`Query`] is a template plus named parameters. It is immutable once
//! built and renders to SPARQL text deterministically, so the same intent
//! always produces byte-identical query text.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::{BuildResult, QueryBuildError};
use crate::intent::{Intent, OutOfDomainReason};
use crate::lexicon;
use crate::registry::{KnownEntityRegistry, Resolution};
use crate::trigger;

/// The BCN endpoint is slow under load; one minute is the observed safe bound.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default cap on returned rows.
pub const DEFAULT_LIMIT: usize = 20;

pub const BCN_NS: &str = "http://datos.bcn.cl/ontologies/bcn-resources#";
pub const BCN_NORMS_NS: &str = "http://datos.bcn.cl/ontologies/bcn-norms#";
pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

pub const PARAM_CLASS: &str = "class";
pub const PARAM_ID_NORMA: &str = "id_norma";
pub const PARAM_SCOPE: &str = "scope";
pub const PARAM_KEYWORDS: &str = "keywords";
pub const PARAM_LIMIT: &str = "limit";

/// Words that ask for bills rather than enacted norms.
const BILL_WORDS: &[&str] = &["proyecto", "proyectos", "boletin", "mocion", "mociones"];

/// Words that name enacted norms in general.
const NORM_WORDS: &[&str] = &[
    "ley",
    "leyes",
    "decreto",
    "decretos",
    "dfl",
    "norma",
    "normas",
    "normativa",
    "idnorma",
    "codigo",
    "codigos",
    "constitucion",
    "reglamento",
    "reglamentos",
    "legislacion",
];

/// Structural references that never appear in titles.
const STRUCTURAL_WORDS: &[&str] = &["articulo", "articulos", "art", "inciso", "capitulo", "titulo"];

/// Query shapes understood by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryTemplate {
    /// Members of one graph class.
    ClassMembership,
    /// The norm with a given `bcnnorms:leychileCode`.
    IdentifierMatch,
    /// Norms and/or bills whose title contains every keyword.
    KeywordSearch,
}

impl std::fmt::Display for QueryTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClassMembership => write!(f, "class_membership"),
            Self::IdentifierMatch => write!(f, "identifier_match"),
            Self::KeywordSearch => write!(f, "keyword_search"),
        }
    }
}

/// Graph classes the builder queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GraphClass {
    /// `bcnnorms:Norm`
    Norm,
    /// `bcn:ProyectoDeLey`
    Bill,
}

impl GraphClass {
    pub fn curie(self) -> &'static str {
        match self {
            Self::Norm => "bcnnorms:Norm",
            Self::Bill => "bcn:ProyectoDeLey",
        }
    }

    fn from_curie(curie: &str) -> Option<Self> {
        match curie {
            "bcnnorms:Norm" => Some(Self::Norm),
            "bcn:ProyectoDeLey" => Some(Self::Bill),
            _ => None,
        }
    }
}

/// Which classes a keyword search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    Norms,
    Bills,
    All,
}

impl SearchScope {
    fn as_str(self) -> &'static str {
        match self {
            Self::Norms => "norms",
            Self::Bills => "bills",
            Self::All => "all",
        }
    }

    fn from_param(value: &str) -> Self {
        match value {
            "norms" => Self::Norms,
            "bills" => Self::Bills,
            _ => Self::All,
        }
    }

    fn classes(self) -> &'static [GraphClass] {
        match self {
            Self::Norms => &[GraphClass::Norm],
            Self::Bills => &[GraphClass::Bill],
            Self::All => &[GraphClass::Norm, GraphClass::Bill],
        }
    }

    /// Scope implied by the class words among `keywords`.
    fn from_keywords(keywords: &[String]) -> Self {
        if lexicon::contains_any(keywords, BILL_WORDS) {
            Self::Bills
        } else if lexicon::contains_any(keywords, NORM_WORDS) {
            Self::Norms
        } else {
            Self::All
        }
    }
}

/// A structured graph query. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    template: QueryTemplate,
    parameters: BTreeMap<String, String>,
    timeout_secs: u64,
}

impl Query {
    pub fn class_membership(class: GraphClass, limit: usize, timeout_secs: u64) -> Self {
        Self::new(
            QueryTemplate::ClassMembership,
            [(PARAM_CLASS, class.curie().to_string()), (PARAM_LIMIT, limit.to_string())],
            timeout_secs,
        )
    }

    pub fn identifier_match(id_norma: u64, limit: usize, timeout_secs: u64) -> Self {
        Self::new(
            QueryTemplate::IdentifierMatch,
            [(PARAM_ID_NORMA, id_norma.to_string()), (PARAM_LIMIT, limit.to_string())],
            timeout_secs,
        )
    }

    pub fn keyword_search(
        scope: SearchScope,
        keywords: &[String],
        limit: usize,
        timeout_secs: u64,
    ) -> Self {
        let mut query = Self::new(
            QueryTemplate::KeywordSearch,
            [(PARAM_SCOPE, scope.as_str().to_string()), (PARAM_LIMIT, limit.to_string())],
            timeout_secs,
        );
        query
            .parameters
            .insert(PARAM_KEYWORDS.to_string(), keywords.join(" "));
        query
    }

    fn new<const N: usize>(
        template: QueryTemplate,
        parameters: [(&str, String); N],
        timeout_secs: u64,
    ) -> Self {
        Self {
            template,
            parameters: parameters
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            timeout_secs,
        }
    }

    pub fn template(&self) -> QueryTemplate {
        self.template
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// The bound idNorma, for identifier matches.
    pub fn identifier(&self) -> Option<u64> {
        self.parameter(PARAM_ID_NORMA)?.parse().ok()
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Render the query as SPARQL text.
    pub fn to_sparql(&self) -> String {
        let limit: usize = self
            .parameter(PARAM_LIMIT)
            .and_then(|l| l.parse().ok())
            .unwrap_or(DEFAULT_LIMIT);

        let mut sparql = format!(
            "PREFIX bcn: <{BCN_NS}>\nPREFIX bcnnorms: <{BCN_NORMS_NS}>\nPREFIX dc: <{DC_NS}>\n"
        );

        match self.template {
            QueryTemplate::ClassMembership => {
                let class = self
                    .parameter(PARAM_CLASS)
                    .and_then(GraphClass::from_curie)
                    .unwrap_or(GraphClass::Norm);
                sparql.push_str(&format!(
                    "SELECT ?item ?title WHERE {{\n  ?item a {} .\n  OPTIONAL {{ ?item dc:title ?title }}\n}}\n",
                    class.curie()
                ));
            }
            QueryTemplate::IdentifierMatch => {
                let id = self.identifier().unwrap_or_default();
                sparql.push_str(&format!(
                    "SELECT ?norma ?title WHERE {{\n  ?norma bcnnorms:leychileCode {id} .\n  OPTIONAL {{ ?norma dc:title ?title }}\n}}\n"
                ));
            }
            QueryTemplate::KeywordSearch => {
                let scope = SearchScope::from_param(self.parameter(PARAM_SCOPE).unwrap_or_default());
                let membership = scope
                    .classes()
                    .iter()
                    .map(|c| format!("{{ ?item a {} }}", c.curie()))
                    .collect::<Vec<_>>()
                    .join(" UNION ");
                let filters = self
                    .parameter(PARAM_KEYWORDS)
                    .unwrap_or_default()
                    .split_whitespace()
                    .map(|k| {
                        format!(
                            "REGEX(STR(?title), \"{}\", \"i\")",
                            escape_literal(&lexicon::accent_insensitive_pattern(k))
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(" && ");
                sparql.push_str(&format!(
                    "SELECT DISTINCT ?item ?title WHERE {{\n  {membership}\n  ?item dc:title ?title .\n"
                ));
                if !filters.is_empty() {
                    sparql.push_str(&format!("  FILTER({filters})\n"));
                }
                sparql.push_str("}\n");
            }
        }

        sparql.push_str(&format!("LIMIT {limit}"));
        sparql
    }
}

/// Escape text for a double-quoted SPARQL string literal.
pub fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Builds [`Query`]s from [`Intent`]s.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    registry: Arc<KnownEntityRegistry>,
    timeout_secs: u64,
    limit: usize,
}

impl QueryBuilder {
    pub fn new(registry: Arc<KnownEntityRegistry>) -> Self {
        Self {
            registry,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Build the query for `intent`.
    ///
    /// `Empty` and `OutOfDomain` must be handled by the caller and fail with
    /// [`QueryBuildError::UnsupportedIntent`].
    pub fn build(&self, intent: &Intent) -> BuildResult<Query> {
        match intent {
            Intent::IdentifierLookup { id } => Ok(self.identifier(*id)),
            Intent::TopicalSearch { keywords } => self.topical(keywords),
            Intent::ExplicitInvocation { raw_args } => {
                match trigger::reinterpret_arguments(raw_args) {
                    Intent::IdentifierLookup { id } => Ok(self.identifier(id)),
                    Intent::TopicalSearch { keywords } => self.topical(&keywords),
                    Intent::OutOfDomain {
                        reason: OutOfDomainReason::ForeignJurisdiction { cue },
                    } => Err(QueryBuildError::OutOfDomain { cue }),
                    _ => Err(QueryBuildError::AmbiguousIntent {
                        detail: format!("no law, idNorma or topic in \"{raw_args}\""),
                    }),
                }
            }
            Intent::Empty | Intent::OutOfDomain { .. } => Err(QueryBuildError::UnsupportedIntent {
                intent: intent.kind().to_string(),
            }),
        }
    }

    fn identifier(&self, id: u64) -> Query {
        Query::identifier_match(id, self.limit, self.timeout_secs)
    }

    fn topical(&self, keywords: &[String]) -> BuildResult<Query> {
        match self.registry.resolve_keywords(keywords) {
            Resolution::Unique(norm) => {
                tracing::debug!(id = norm.identifier, name = norm.name(), "keywords resolved to known norm");
                return Ok(self.identifier(norm.identifier));
            }
            Resolution::Ambiguous(norms) => {
                let candidates = norms
                    .iter()
                    .map(|n| format!("{} (idNorma {})", n.name(), n.identifier))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(QueryBuildError::AmbiguousIntent {
                    detail: format!("matches several norms: {candidates}"),
                });
            }
            Resolution::Unresolved => {}
        }

        let scope = SearchScope::from_keywords(keywords);
        let content = content_keywords(keywords);

        if !content.is_empty() {
            return Ok(Query::keyword_search(scope, &content, self.limit, self.timeout_secs));
        }
        match scope {
            SearchScope::Norms => Ok(Query::class_membership(
                GraphClass::Norm,
                self.limit,
                self.timeout_secs,
            )),
            SearchScope::Bills => Ok(Query::class_membership(
                GraphClass::Bill,
                self.limit,
                self.timeout_secs,
            )),
            SearchScope::All => Err(QueryBuildError::AmbiguousIntent {
                detail: format!("no searchable topic in \"{}\"", keywords.join(" ")),
            }),
        }
    }
}

/// Keywords that can be matched against titles: class words, structural
/// references and article numbers are dropped.
fn content_keywords(keywords: &[String]) -> Vec<String> {
    let mut content = Vec::new();
    let mut previous: Option<&str> = None;
    for keyword in keywords {
        let word = keyword.as_str();
        let is_article_number = word.chars().all(|c| c.is_ascii_digit())
            && previous.is_some_and(|p| STRUCTURAL_WORDS.contains(&p));
        if !BILL_WORDS.contains(&word)
            && !NORM_WORDS.contains(&word)
            && !STRUCTURAL_WORDS.contains(&word)
            && !is_article_number
        {
            content.push(keyword.clone());
        }
        previous = Some(word);
    }
    content
}
