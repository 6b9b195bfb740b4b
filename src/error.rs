//! Rich diagnostic error types for leychile.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Transport and payload failures are not
//! errors here: they surface as [`QueryOutcome`](crate::outcome::QueryOutcome)
//! variants so that nothing below the trigger classifier raises a fault.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for leychile.
#[derive(Debug, Error, Diagnostic)]
pub enum LeyChileError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryBuildError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("failed to parse norm table: {message}")]
    #[diagnostic(
        code(leychile::registry::parse),
        help("Each entry needs `identifier`, `kind` and `common_names`. Check the TOML syntax.")
    )]
    Parse { message: String },

    #[error("failed to read norm table: {path}")]
    #[diagnostic(
        code(leychile::registry::io),
        help("Check that `norms_file` in the configuration points to a readable file.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("norm \"{name}\" has identifier 0")]
    #[diagnostic(
        code(leychile::registry::invalid_identifier),
        help("Use the idNorma published by LeyChile (https://www.bcn.cl/leychile). It is never 0.")
    )]
    InvalidIdentifier { name: String },

    #[error("norm {identifier} has no common name")]
    #[diagnostic(
        code(leychile::registry::missing_name),
        help("Give every norm at least one name users would type, e.g. \"Codigo Civil\".")
    )]
    MissingName { identifier: u64 },

    #[error("identifier {identifier} is registered twice")]
    #[diagnostic(
        code(leychile::registry::duplicate_identifier),
        help("An idNorma belongs to exactly one norm. Merge the entries into one.")
    )]
    DuplicateIdentifier { identifier: u64 },

    #[error("common name \"{name}\" is used by norms {existing} and {identifier}")]
    #[diagnostic(
        code(leychile::registry::duplicate_name),
        help("Common names must resolve to a single norm. Rename or drop one of them.")
    )]
    DuplicateName {
        name: String,
        existing: u64,
        identifier: u64,
    },

    #[error("law number {number} is used by norms {existing} and {identifier}")]
    #[diagnostic(
        code(leychile::registry::duplicate_law_number),
        help("A law number names exactly one norm. Drop `law_number` from one of the entries.")
    )]
    DuplicateLawNumber {
        number: String,
        existing: u64,
        identifier: u64,
    },
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

// ---------------------------------------------------------------------------
// Query build errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryBuildError {
    #[error("intent {intent} cannot be turned into a query")]
    #[diagnostic(
        code(leychile::query::unsupported_intent),
        help(
            "Empty and out-of-domain intents must be handled by the caller before \
             reaching the query builder."
        )
    )]
    UnsupportedIntent { intent: String },

    #[error("request is ambiguous: {detail}")]
    #[diagnostic(
        code(leychile::query::ambiguous),
        help("Ask the user which law, idNorma or topic they mean.")
    )]
    AmbiguousIntent { detail: String },

    #[error("request refers to a foreign jurisdiction ({cue})")]
    #[diagnostic(
        code(leychile::query::out_of_domain),
        help("Only Chilean legislation is available from the BCN endpoint.")
    )]
    OutOfDomain { cue: String },
}

pub type BuildResult<T> = std::result::Result<T, QueryBuildError>;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(leychile::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(leychile::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("`{field}` is not an http(s) URL: {url}")]
    #[diagnostic(
        code(leychile::config::invalid_url),
        help("Endpoints must start with http:// or https://.")
    )]
    InvalidUrl { field: String, url: String },

    #[error("`{field}` must be greater than zero")]
    #[diagnostic(
        code(leychile::config::invalid_value),
        help("Timeouts and limits of 0 would disable the bound on network calls.")
    )]
    NonPositive { field: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Convenience result type for crate-level operations.
pub type LeyChileResult<T> = std::result::Result<T, LeyChileError>;
