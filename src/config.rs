//! Runtime configuration, persisted as TOML.
//!
//! Resolution order: an explicit `--config` path, then
//! `$XDG_CONFIG_HOME/leychile/config.toml` (falling back to
//! `~/.config/leychile/config.toml`), then built-in defaults.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{DEFAULT_RESOURCE_BASE, DEFAULT_SPARQL_ENDPOINT};
use crate::error::{ConfigError, ConfigResult, RegistryResult};
use crate::health::{DEFAULT_HEALTH_TTL_SECS, DEFAULT_PROBE_TIMEOUT_SECS};
use crate::query::{DEFAULT_LIMIT, DEFAULT_TIMEOUT_SECS};
use crate::registry::KnownEntityRegistry;
use crate::trigger::DEFAULT_PREFIX;

/// Name of the retired Ley Fácil API in the default configuration.
pub const LEYFACIL: &str = "leyfacil";

/// The Ley Fácil API, which now answers every request with 401.
pub const DEFAULT_LEYFACIL_ENDPOINT: &str = "https://www.bcn.cl/leyfacil/recurso/trabajo";

/// Everything the subsystem can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeyChileConfig {
    /// SPARQL endpoint URL.
    #[serde(default = "default_sparql_endpoint")]
    pub sparql_endpoint: String,
    /// Base URL of resource documents.
    #[serde(default = "default_resource_base")]
    pub resource_base: String,
    /// Per-query timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Health probe timeout in seconds.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// How long a probe verdict stays valid, in seconds.
    #[serde(default = "default_health_ttl_secs")]
    pub health_ttl_secs: u64,
    /// LIMIT of search queries.
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    /// Command prefixes that force explicit invocation.
    #[serde(default = "default_invocation_prefixes")]
    pub invocation_prefixes: Vec<String>,
    /// Retired endpoints to watch, by name.
    #[serde(default = "default_retired_endpoints")]
    pub retired_endpoints: BTreeMap<String, String>,
    /// Extra norm table merged over the bundled one.
    #[serde(default)]
    pub norms_file: Option<PathBuf>,
}

fn default_sparql_endpoint() -> String {
    DEFAULT_SPARQL_ENDPOINT.into()
}
fn default_resource_base() -> String {
    DEFAULT_RESOURCE_BASE.into()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_probe_timeout_secs() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}
fn default_health_ttl_secs() -> u64 {
    DEFAULT_HEALTH_TTL_SECS
}
fn default_result_limit() -> usize {
    DEFAULT_LIMIT
}
fn default_invocation_prefixes() -> Vec<String> {
    vec![DEFAULT_PREFIX.into()]
}
fn default_retired_endpoints() -> BTreeMap<String, String> {
    BTreeMap::from([(LEYFACIL.into(), DEFAULT_LEYFACIL_ENDPOINT.into())])
}

impl Default for LeyChileConfig {
    fn default() -> Self {
        Self {
            sparql_endpoint: default_sparql_endpoint(),
            resource_base: default_resource_base(),
            timeout_secs: default_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            health_ttl_secs: default_health_ttl_secs(),
            result_limit: default_result_limit(),
            invocation_prefixes: default_invocation_prefixes(),
            retired_endpoints: default_retired_endpoints(),
            norms_file: None,
        }
    }
}

impl LeyChileConfig {
    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `explicit`, else from the XDG location if it exists, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Reject values that would make network calls unbounded or nonsensical.
    pub fn validate(&self) -> ConfigResult<()> {
        check_url("sparql_endpoint", &self.sparql_endpoint)?;
        check_url("resource_base", &self.resource_base)?;
        for (name, url) in &self.retired_endpoints {
            check_url(&format!("retired_endpoints.{name}"), url)?;
        }
        for (field, value) in [
            ("timeout_secs", self.timeout_secs),
            ("probe_timeout_secs", self.probe_timeout_secs),
            ("result_limit", self.result_limit as u64),
        ] {
            if value == 0 {
                return Err(ConfigError::NonPositive {
                    field: field.into(),
                });
            }
        }
        Ok(())
    }

    /// The bundled norm table, extended by `norms_file` when set.
    pub fn registry(&self) -> RegistryResult<KnownEntityRegistry> {
        match &self.norms_file {
            Some(path) => KnownEntityRegistry::bundled_with_file(path),
            None => KnownEntityRegistry::bundled(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn health_ttl(&self) -> Duration {
        Duration::from_secs(self.health_ttl_secs)
    }

    /// Retired endpoints in the shape the health guard takes.
    pub fn retired_endpoint_map(&self) -> HashMap<String, String> {
        self.retired_endpoints
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// `$XDG_CONFIG_HOME/leychile/config.toml`, with the `~/.config` fallback.
pub fn default_path() -> Option<PathBuf> {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
        .ok()?;
    Some(base.join("leychile").join("config.toml"))
}

fn check_url(field: &str, url: &str) -> ConfigResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl {
            field: field.into(),
            url: url.into(),
        })
    }
}
