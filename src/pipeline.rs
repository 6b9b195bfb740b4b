//! The trigger-and-retrieve pipeline.
//!
//! ```text
//! raw text ─► TriggerClassifier ─► QueryBuilder ─► ResilientQueryClient ─► ResultValidator
//!                  │ Empty / OutOfDomain    │ build errors
//!                  └──────────► Response::NotApplicable / NeedsClarification
//! ```
//!
//! [`Pipeline::handle`] never fails: every path ends in a [`Response`].

use std::sync::Arc;

use serde::Serialize;

use crate::client::{ResilientQueryClient, ResourcePath, Transport, UreqTransport};
use crate::config::LeyChileConfig;
use crate::error::{LeyChileResult, QueryBuildError};
use crate::health::EndpointHealthGuard;
use crate::intent::{Intent, OutOfDomainReason};
use crate::outcome::{QueryOutcome, ResourceOutcome};
use crate::query::{Query, QueryBuilder};
use crate::registry::KnownEntityRegistry;
use crate::trigger::TriggerClassifier;

/// Prompt for an explicit invocation without arguments.
pub const EMPTY_PROMPT: &str =
    "¿Qué quieres buscar en LeyChile? Indica una ley, un código, un idNorma o un tema.";

/// What the pipeline answers to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum Response {
    /// Not a Chilean-law request; another handler should take it.
    NotApplicable { reason: OutOfDomainReason },
    /// The request needs more detail before anything can be queried.
    NeedsClarification { prompt: String },
    /// A query was executed.
    Retrieved { query: Query, outcome: QueryOutcome },
}

impl Response {
    /// Text for the end user.
    pub fn message(&self) -> String {
        match self {
            Self::NotApplicable { reason } => {
                format!("La solicitud no trata sobre legislación chilena ({reason}).")
            }
            Self::NeedsClarification { prompt } => prompt.clone(),
            Self::Retrieved { outcome, .. } => outcome.user_message(),
        }
    }
}

/// Classifier, builder, client and health guard wired from one configuration.
#[derive(Debug)]
pub struct Pipeline {
    config: LeyChileConfig,
    registry: Arc<KnownEntityRegistry>,
    classifier: TriggerClassifier,
    builder: QueryBuilder,
    client: ResilientQueryClient,
    health: EndpointHealthGuard,
}

impl Pipeline {
    /// Pipeline talking to the configured endpoints over `ureq`.
    pub fn from_config(config: LeyChileConfig) -> LeyChileResult<Self> {
        Self::with_transport(config, Arc::new(UreqTransport))
    }

    /// Pipeline over an arbitrary transport.
    pub fn with_transport(
        config: LeyChileConfig,
        transport: Arc<dyn Transport>,
    ) -> LeyChileResult<Self> {
        config.validate()?;
        let registry = Arc::new(config.registry()?);
        tracing::debug!(norms = registry.len(), "norm registry loaded");

        let classifier =
            TriggerClassifier::with_prefixes(registry.clone(), config.invocation_prefixes.clone());
        let builder = QueryBuilder::new(registry.clone())
            .with_timeout_secs(config.timeout_secs)
            .with_limit(config.result_limit);
        let client = ResilientQueryClient::with_transport(
            config.sparql_endpoint.clone(),
            config.resource_base.clone(),
            transport.clone(),
        )
        .with_resource_timeout(config.timeout());
        let health = EndpointHealthGuard::with_transport(config.retired_endpoint_map(), transport)
            .with_probe_timeout(config.probe_timeout())
            .with_ttl(config.health_ttl());

        Ok(Self {
            config,
            registry,
            classifier,
            builder,
            client,
            health,
        })
    }

    /// Handle one raw request end to end.
    pub fn handle(&self, raw_text: &str) -> Response {
        let intent = self.classifier.classify(raw_text);
        self.handle_intent(&intent)
    }

    /// Handle an already classified request.
    pub fn handle_intent(&self, intent: &Intent) -> Response {
        match intent {
            Intent::Empty => Response::NeedsClarification {
                prompt: EMPTY_PROMPT.to_string(),
            },
            Intent::OutOfDomain { reason } if reason.wants_clarification() => {
                Response::NeedsClarification {
                    prompt: "¿Te refieres a la legislación chilena? Indica el país o la ley \
                             que te interesa."
                        .to_string(),
                }
            }
            Intent::OutOfDomain { reason } => Response::NotApplicable {
                reason: reason.clone(),
            },
            _ => match self.builder.build(intent) {
                Ok(query) => {
                    let outcome = self.client.execute(&query);
                    Response::Retrieved { query, outcome }
                }
                Err(QueryBuildError::OutOfDomain { cue }) => Response::NotApplicable {
                    reason: OutOfDomainReason::ForeignJurisdiction { cue },
                },
                Err(QueryBuildError::AmbiguousIntent { detail }) => {
                    Response::NeedsClarification {
                        prompt: format!("No queda claro qué norma buscas: {detail}."),
                    }
                }
                Err(e @ QueryBuildError::UnsupportedIntent { .. }) => {
                    tracing::warn!(error = %e, "classifier produced an unbuildable intent");
                    Response::NeedsClarification {
                        prompt: EMPTY_PROMPT.to_string(),
                    }
                }
            },
        }
    }

    /// Fetch the resource document of a law by idNorma.
    pub fn fetch_norm(&self, identifier: u64) -> ResourceOutcome {
        self.client.fetch_resource(&ResourcePath::law(identifier))
    }

    pub fn config(&self) -> &LeyChileConfig {
        &self.config
    }

    pub fn registry(&self) -> &KnownEntityRegistry {
        &self.registry
    }

    pub fn classifier(&self) -> &TriggerClassifier {
        &self.classifier
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub fn client(&self) -> &ResilientQueryClient {
        &self.client
    }

    pub fn health(&self) -> &EndpointHealthGuard {
        &self.health
    }
}
