//! Typed outcomes of talking to the BCN endpoints.
//!
//! Expected failures of a flaky remote service are values, not errors: the
//! caller always receives one of these variants and can render a graceful
//! message for each.

use std::collections::BTreeMap;

use serde::Serialize;

/// One result row: variable name → bound value.
pub type Binding = BTreeMap<String, String>;

/// Why an endpoint could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnavailableCause {
    /// No response within the query timeout.
    Timeout { timeout_secs: u64 },
    /// DNS, connect or I/O failure.
    Connection { message: String },
    /// The endpoint answered with a non-success HTTP status.
    Status { code: u16 },
}

impl std::fmt::Display for UnavailableCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout { timeout_secs } => write!(f, "timed out after {timeout_secs}s"),
            Self::Connection { message } => write!(f, "connection failed: {message}"),
            Self::Status { code } => write!(f, "HTTP status {code}"),
        }
    }
}

/// Result of executing one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// At least one row, in endpoint order.
    Success { bindings: Vec<Binding> },
    /// A well-formed answer with no rows: no such law.
    EmptyResult,
    /// Transient endpoint failure; the caller may try again later.
    EndpointUnavailable { cause: UnavailableCause },
    /// The endpoint answered, but not with a SPARQL result set.
    MalformedResponse { detail: String },
}

impl QueryOutcome {
    /// Rows of a successful outcome; empty otherwise.
    pub fn bindings(&self) -> &[Binding] {
        match self {
            Self::Success { bindings } => bindings,
            _ => &[],
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Whether retrying the same query later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::EndpointUnavailable { .. })
    }

    /// Message suitable for the end user, in Spanish like the data source.
    pub fn user_message(&self) -> String {
        match self {
            Self::Success { bindings } => match bindings.len() {
                1 => "Se encontró 1 resultado.".to_string(),
                n => format!("Se encontraron {n} resultados."),
            },
            Self::EmptyResult => {
                "No se encontró ninguna norma que coincida con la búsqueda.".to_string()
            }
            Self::EndpointUnavailable { cause } => format!(
                "El servicio de datos de la Biblioteca del Congreso Nacional no está disponible \
                 en este momento ({cause}). Intenta nuevamente en unos minutos."
            ),
            Self::MalformedResponse { .. } => "La Biblioteca del Congreso Nacional respondió con \
                 datos en un formato inesperado; los resultados no son confiables."
                .to_string(),
        }
    }
}

/// Result of fetching one resource document by identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResourceOutcome {
    /// The JSON document describing the norm.
    Document { document: serde_json::Value },
    /// 404, or an empty document.
    NotFound,
    EndpointUnavailable { cause: UnavailableCause },
    MalformedResponse { detail: String },
}
