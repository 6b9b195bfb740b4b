//! Endpoint health guard.
//!
//! Probes named endpoints (typically retired ones such as the old Ley Fácil
//! API) and caches the verdict for a configurable time-to-live, so that the
//! subsystem never routes requests to a service that has stopped answering.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use serde::Serialize;

use crate::client::{Transport, UreqTransport};

/// Default probe timeout.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Default cache lifetime of a probe verdict.
pub const DEFAULT_HEALTH_TTL_SECS: u64 = 300;

/// Last known state of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EndpointStatus {
    pub available: bool,
    pub last_checked_at: SystemTime,
}

impl EndpointStatus {
    fn is_fresh(&self, ttl: Duration, now: SystemTime) -> bool {
        // A clock that went backwards counts as stale.
        now.duration_since(self.last_checked_at)
            .is_ok_and(|age| age < ttl)
    }
}

/// Probes and remembers endpoint availability.
pub struct EndpointHealthGuard {
    endpoints: HashMap<String, String>,
    cache: DashMap<String, EndpointStatus>,
    transport: Arc<dyn Transport>,
    probe_timeout: Duration,
    ttl: Duration,
}

impl EndpointHealthGuard {
    /// Guard over `endpoints` (name → URL) using `ureq`.
    pub fn new(endpoints: HashMap<String, String>) -> Self {
        Self::with_transport(endpoints, Arc::new(UreqTransport))
    }

    pub fn with_transport(
        endpoints: HashMap<String, String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            endpoints,
            cache: DashMap::new(),
            transport,
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            ttl: Duration::from_secs(DEFAULT_HEALTH_TTL_SECS),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Whether `name` currently answers with a 2xx status.
    ///
    /// Uses the cached verdict while it is younger than the TTL and probes
    /// otherwise. Unknown names are never available and are not probed.
    pub fn is_available(&self, name: &str) -> bool {
        if !self.endpoints.contains_key(name) {
            tracing::debug!(endpoint = name, "unknown endpoint treated as unavailable");
            return false;
        }
        let cached = self
            .status(name)
            .filter(|s| s.is_fresh(self.ttl, SystemTime::now()));
        if let Some(status) = cached {
            return status.available;
        }
        self.refresh(name).is_some_and(|s| s.available)
    }

    /// Probe `name` now, ignoring the cache. `None` for unknown names.
    pub fn refresh(&self, name: &str) -> Option<EndpointStatus> {
        let url = self.endpoints.get(name)?;
        let available = match self.transport.get(url, self.probe_timeout) {
            Ok(response) if response.is_success() => true,
            Ok(response) => {
                tracing::info!(endpoint = name, %url, status = response.status, "endpoint reports failure status");
                false
            }
            Err(failure) => {
                tracing::info!(endpoint = name, %url, ?failure, "endpoint probe failed");
                false
            }
        };
        let status = EndpointStatus {
            available,
            last_checked_at: SystemTime::now(),
        };
        self.cache.insert(name.to_string(), status);
        Some(status)
    }

    /// Cached status, if `name` was probed before.
    pub fn status(&self, name: &str) -> Option<EndpointStatus> {
        self.cache.get(name).map(|s| *s)
    }

    /// Configured endpoint names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.endpoints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for EndpointHealthGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointHealthGuard")
            .field("endpoints", &self.endpoints)
            .field("probe_timeout", &self.probe_timeout)
            .field("ttl", &self.ttl)
            .finish()
    }
}
