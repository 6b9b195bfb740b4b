//! Resilient client for the BCN SPARQL and resource endpoints.
//!
//! Uses `ureq` for synchronous HTTP. Every call makes at most one network
//! attempt, bounded by an explicit timeout, and converts every transport or
//! payload problem into a [`QueryOutcome`] / [`ResourceOutcome`] variant.
//! Retrying is the caller's decision.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::outcome::{QueryOutcome, ResourceOutcome, UnavailableCause};
use crate::query::{DEFAULT_TIMEOUT_SECS, Query};
use crate::validate;

/// Public SPARQL endpoint of the BCN linked-data service.
pub const DEFAULT_SPARQL_ENDPOINT: &str = "https://datos.bcn.cl/sparql";

/// Base URL of BCN resource documents.
pub const DEFAULT_RESOURCE_BASE: &str = "https://datos.bcn.cl/recurso";

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// An HTTP response with any status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Why no HTTP response was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    TimedOut,
    Connection { message: String },
}

impl TransportFailure {
    fn into_cause(self, timeout: Duration) -> UnavailableCause {
        match self {
            Self::TimedOut => UnavailableCause::Timeout {
                timeout_secs: timeout.as_secs(),
            },
            Self::Connection { message } => UnavailableCause::Connection { message },
        }
    }
}

/// Blocking HTTP transport. Non-success statuses are responses, not failures.
pub trait Transport: Send + Sync {
    /// POST an urlencoded form and ask for JSON.
    fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportFailure>;

    /// Plain GET.
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportFailure>;
}

/// [`Transport`] backed by `ureq`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UreqTransport;

impl UreqTransport {
    fn agent(timeout: Duration) -> ureq::Agent {
        ureq::AgentBuilder::new().timeout(timeout).build()
    }

    fn finish(
        result: Result<ureq::Response, ureq::Error>,
    ) -> Result<HttpResponse, TransportFailure> {
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => return Err(classify_transport(&transport)),
        };
        let status = response.status();
        // Reading the body is still bounded by the agent timeout.
        let body = response.into_string().map_err(|e| classify_io(&e))?;
        Ok(HttpResponse { status, body })
    }
}

impl Transport for UreqTransport {
    fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportFailure> {
        Self::finish(
            Self::agent(timeout)
                .post(url)
                .set("Accept", "application/json")
                .send_form(form),
        )
    }

    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportFailure> {
        Self::finish(
            Self::agent(timeout)
                .get(url)
                .set("Accept", "application/json")
                .call(),
        )
    }
}

fn classify_transport(transport: &ureq::Transport) -> TransportFailure {
    let mut source: Option<&(dyn std::error::Error + 'static)> =
        std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return classify_io(io);
        }
        source = err.source();
    }
    let message = transport.to_string();
    if message.contains("timed out") {
        TransportFailure::TimedOut
    } else {
        TransportFailure::Connection { message }
    }
}

fn classify_io(err: &std::io::Error) -> TransportFailure {
    match err.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => TransportFailure::TimedOut,
        _ => TransportFailure::Connection {
            message: err.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Resource paths
// ---------------------------------------------------------------------------

/// `{jurisdiction}/{kind}/{identifier}` part of a resource URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    pub jurisdiction: String,
    pub kind: String,
    pub identifier: String,
}

impl ResourcePath {
    /// A Chilean law (`cl/ley/{identifier}`).
    pub fn law(identifier: u64) -> Self {
        Self {
            jurisdiction: "cl".into(),
            kind: "ley".into(),
            identifier: identifier.to_string(),
        }
    }

    /// Full document URL under `base`.
    pub fn url(&self, base: &str) -> String {
        format!(
            "{}/{}/{}/{}/datos.json",
            base.trim_end_matches('/'),
            self.jurisdiction,
            self.kind,
            self.identifier
        )
    }
}

// ---------------------------------------------------------------------------
// ResilientQueryClient
// ---------------------------------------------------------------------------

/// Executes queries against the BCN endpoints.
#[derive(Clone)]
pub struct ResilientQueryClient {
    sparql_endpoint: String,
    resource_base: String,
    resource_timeout: Duration,
    transport: Arc<dyn Transport>,
}

impl ResilientQueryClient {
    /// Client for the public BCN endpoints over `ureq`.
    pub fn new() -> Self {
        Self::with_transport(
            DEFAULT_SPARQL_ENDPOINT,
            DEFAULT_RESOURCE_BASE,
            Arc::new(UreqTransport),
        )
    }

    pub fn with_transport(
        sparql_endpoint: impl Into<String>,
        resource_base: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            sparql_endpoint: sparql_endpoint.into(),
            resource_base: resource_base.into(),
            resource_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            transport,
        }
    }

    /// Timeout for resource-by-identifier fetches.
    pub fn with_resource_timeout(mut self, timeout: Duration) -> Self {
        self.resource_timeout = timeout;
        self
    }

    pub fn sparql_endpoint(&self) -> &str {
        &self.sparql_endpoint
    }

    /// Execute `query` with its own timeout. One network attempt, no retries.
    pub fn execute(&self, query: &Query) -> QueryOutcome {
        let sparql = query.to_sparql();
        let timeout = query.timeout();
        tracing::debug!(
            endpoint = %self.sparql_endpoint,
            template = %query.template(),
            timeout_secs = query.timeout_secs(),
            "executing SPARQL query"
        );

        let response = match self.transport.post_form(
            &self.sparql_endpoint,
            &[("query", sparql.as_str())],
            timeout,
        ) {
            Ok(response) => response,
            Err(failure) => {
                let cause = failure.into_cause(timeout);
                tracing::warn!(endpoint = %self.sparql_endpoint, %cause, "SPARQL endpoint unavailable");
                return QueryOutcome::EndpointUnavailable { cause };
            }
        };

        if !response.is_success() {
            tracing::warn!(
                endpoint = %self.sparql_endpoint,
                status = response.status,
                "SPARQL endpoint returned an error status"
            );
            return QueryOutcome::EndpointUnavailable {
                cause: UnavailableCause::Status {
                    code: response.status,
                },
            };
        }

        let outcome = validate::validate(&response.body);
        tracing::debug!(rows = outcome.bindings().len(), "SPARQL query finished");
        outcome
    }

    /// Fetch the JSON document of one resource.
    pub fn fetch_resource(&self, path: &ResourcePath) -> ResourceOutcome {
        let url = path.url(&self.resource_base);
        tracing::debug!(%url, "fetching resource document");

        let response = match self.transport.get(&url, self.resource_timeout) {
            Ok(response) => response,
            Err(failure) => {
                let cause = failure.into_cause(self.resource_timeout);
                tracing::warn!(%url, %cause, "resource endpoint unavailable");
                return ResourceOutcome::EndpointUnavailable { cause };
            }
        };

        match response.status {
            404 => return ResourceOutcome::NotFound,
            status if !response.is_success() => {
                return ResourceOutcome::EndpointUnavailable {
                    cause: UnavailableCause::Status { code: status },
                };
            }
            _ => {}
        }

        match serde_json::from_str::<Value>(&response.body) {
            Ok(Value::Object(map)) if map.is_empty() => ResourceOutcome::NotFound,
            Ok(Value::Array(items)) if items.is_empty() => ResourceOutcome::NotFound,
            Ok(document @ (Value::Object(_) | Value::Array(_))) => {
                ResourceOutcome::Document { document }
            }
            Ok(_) => ResourceOutcome::MalformedResponse {
                detail: "resource document is not a JSON object or array".into(),
            },
            Err(e) => ResourceOutcome::MalformedResponse {
                detail: format!("resource document is not JSON: {e}"),
            },
        }
    }
}

impl Default for ResilientQueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResilientQueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientQueryClient")
            .field("sparql_endpoint", &self.sparql_endpoint)
            .field("resource_base", &self.resource_base)
            .finish()
    }
}
