//! End-to-end tests of the trigger-and-retrieve pipeline.
//!
//! Network calls go through the real `ureq` transport against a local stub
//! server, so timeouts, refused connections and error statuses are the real
//! thing.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Reply, StubServer, refused_url};
use leychile::client::{ResilientQueryClient, ResourcePath, UreqTransport};
use leychile::config::{LEYFACIL, LeyChileConfig};
use leychile::health::EndpointHealthGuard;
use leychile::intent::{Intent, OutOfDomainReason};
use leychile::outcome::{QueryOutcome, ResourceOutcome, UnavailableCause};
use leychile::pipeline::{Pipeline, Response};
use leychile::query::{Query, QueryTemplate};
use leychile::registry::KnownEntityRegistry;
use leychile::trigger::TriggerClassifier;

const CIVIL_CODE_ROW: &str = r#"{
  "head": {"vars": ["norma", "title"]},
  "results": {"bindings": [{
    "norma": {"type": "uri", "value": "http://datos.bcn.cl/recurso/cl/ley/172986"},
    "title": {"type": "literal", "value": "CODIGO CIVIL"}
  }]}
}"#;

const NO_ROWS: &str = r#"{"head": {"vars": ["item"]}, "results": {"bindings": []}}"#;

fn config_for(server: &StubServer) -> LeyChileConfig {
    LeyChileConfig {
        sparql_endpoint: server.url("/sparql"),
        resource_base: server.url("/recurso"),
        retired_endpoints: [(LEYFACIL.to_string(), server.url("/leyfacil/recurso/trabajo"))]
            .into_iter()
            .collect(),
        ..Default::default()
    }
}

fn pipeline_for(server: &StubServer) -> Pipeline {
    Pipeline::from_config(config_for(server)).unwrap()
}

fn classifier() -> TriggerClassifier {
    TriggerClassifier::new(Arc::new(KnownEntityRegistry::bundled().unwrap()))
}

// ---------------------------------------------------------------------------
// Trigger corpus
// ---------------------------------------------------------------------------

const SHOULD_TRIGGER: &[&str] = &[
    "/leychile busca leyes sobre teletrabajo",
    "/leychile que dice el codigo civil sobre compraventa",
    "Que dice la ley 19.628 sobre proteccion de datos?",
    "Busca el articulo 1545 del Codigo Civil",
    "Muestrame la Constitucion de Chile",
    "Que leyes regulan el trabajo remoto en Chile?",
    "Busca decretos sobre medio ambiente",
    "Cual es el Codigo del Trabajo chileno?",
    "Necesito informacion sobre la ley de pension alimenticia",
    "Muestrame la ley con idNorma 172986",
    "Busca la norma 242302",
    "¿Qué ley se usa en Chile para el arriendo?",
    "Busca la ley Germán Riesco sobre habitaciones obreras",
];

const SHOULD_NOT_TRIGGER: &[&str] = &[
    "What does US copyright law say?",
    "Busca leyes de Argentina sobre trabajo",
    "Mexican labor code",
    "What is contract law?",
    "Explain habeas corpus",
    "Define tort",
    "Write a Python function",
    "Summarize this document",
    "Help me with my resume",
    "What are labor laws?",
    "Write Python code to sort a list",
    "Debug my Rust code",
    "Fix this JavaScript code",
];

#[test]
fn chilean_requests_trigger() {
    let c = classifier();
    for text in SHOULD_TRIGGER {
        let intent = c.classify(text);
        assert!(intent.is_applicable(), "{text:?} classified as {intent:?}");
        assert_ne!(intent, Intent::Empty, "{text:?}");
    }
}

#[test]
fn other_requests_do_not_trigger() {
    let c = classifier();
    for text in SHOULD_NOT_TRIGGER {
        let intent = c.classify(text);
        assert!(
            matches!(intent, Intent::OutOfDomain { .. }),
            "{text:?} classified as {intent:?}"
        );
    }
}

#[test]
fn programming_requests_are_unrelated_tasks() {
    let server = StubServer::start(Reply::json(CIVIL_CODE_ROW));
    let pipeline = pipeline_for(&server);
    for text in ["Write Python code to sort a list", "Debug my Rust code"] {
        assert_eq!(
            pipeline.handle(text),
            Response::NotApplicable {
                reason: OutOfDomainReason::UnrelatedTask
            },
            "{text:?}"
        );
    }
    assert!(server.requests().is_empty());
}

#[test]
fn foreign_cues_never_reach_identifier_lookup() {
    let c = classifier();
    for text in [
        "norma 242302 de Argentina",
        "idNorma 172986 Mexico",
        "/leychile norma 1984 de Peru",
    ] {
        assert!(
            !matches!(c.classify(text), Intent::IdentifierLookup { .. }),
            "{text:?}"
        );
    }
}

#[test]
fn classification_is_idempotent() {
    let c = classifier();
    for text in SHOULD_TRIGGER.iter().chain(SHOULD_NOT_TRIGGER) {
        assert_eq!(c.classify(text), c.classify(text), "{text:?}");
    }
}

// ---------------------------------------------------------------------------
// Pipeline against a stub endpoint
// ---------------------------------------------------------------------------

#[test]
fn identifier_request_end_to_end() {
    let server = StubServer::start(Reply::json(CIVIL_CODE_ROW));
    let pipeline = pipeline_for(&server);

    let (query, outcome) = match pipeline.handle("Busca la ley con idNorma 172986") {
        Response::Retrieved { query, outcome } => (query, outcome),
        other => panic!("expected a retrieval, got {other:?}"),
    };
    assert_eq!(query.template(), QueryTemplate::IdentifierMatch);
    assert_eq!(query.identifier(), Some(172986));
    assert_eq!(outcome.bindings().len(), 1);
    assert_eq!(outcome.bindings()[0]["title"], "CODIGO CIVIL");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/sparql");
    assert!(requests[0].body.starts_with("query="));
    assert!(requests[0].body.contains("leychileCode"));
    assert!(requests[0].body.contains("172986"));
}

#[test]
fn known_code_resolves_to_its_identifier() {
    let server = StubServer::start(Reply::json(CIVIL_CODE_ROW));
    let pipeline = pipeline_for(&server);

    match pipeline.handle("/leychile codigo civil") {
        Response::Retrieved { query, outcome } => {
            assert_eq!(query.identifier(), Some(172986));
            assert!(outcome.is_success());
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[test]
fn empty_invocation_makes_no_request() {
    let server = StubServer::start(Reply::json(CIVIL_CODE_ROW));
    let pipeline = pipeline_for(&server);

    assert!(matches!(
        pipeline.handle("/leychile"),
        Response::NeedsClarification { .. }
    ));
    assert!(matches!(
        pipeline.handle("/leychile @#$%^&"),
        Response::NeedsClarification { .. }
    ));
    assert!(server.requests().is_empty());
}

#[test]
fn unknown_law_number_reports_no_results() {
    let server = StubServer::start(Reply::json(NO_ROWS));
    let pipeline = pipeline_for(&server);

    let response = pipeline.handle("/leychile ley 99999999");
    match &response {
        Response::Retrieved { outcome, .. } => assert_eq!(*outcome, QueryOutcome::EmptyResult),
        other => panic!("unexpected response: {other:?}"),
    }
    assert!(!response.message().is_empty());
}

#[test]
fn foreign_requests_are_deferred_without_network() {
    let server = StubServer::start(Reply::json(CIVIL_CODE_ROW));
    let pipeline = pipeline_for(&server);

    for text in ["Busca leyes de Argentina sobre trabajo", "/leychile leyes de Peru"] {
        assert!(
            matches!(
                pipeline.handle(text),
                Response::NotApplicable {
                    reason: OutOfDomainReason::ForeignJurisdiction { .. }
                }
            ),
            "{text:?}"
        );
    }
    assert!(server.requests().is_empty());
}

#[test]
fn ambiguous_legal_terms_ask_for_jurisdiction() {
    let server = StubServer::start(Reply::json(CIVIL_CODE_ROW));
    let pipeline = pipeline_for(&server);
    assert!(matches!(
        pipeline.handle("What are labor laws?"),
        Response::NeedsClarification { .. }
    ));
}

#[test]
fn repeated_requests_give_equal_responses() {
    let server = StubServer::start(Reply::json(CIVIL_CODE_ROW));
    let pipeline = pipeline_for(&server);
    let first = pipeline.handle("Muestrame la ley con idNorma 172986");
    let second = pipeline.handle("Muestrame la ley con idNorma 172986");
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Endpoint failures
// ---------------------------------------------------------------------------

#[test]
fn server_error_is_unavailable() {
    let server = StubServer::start(Reply::new(500, "Internal Server Error"));
    let client = ResilientQueryClient::with_transport(
        server.url("/sparql"),
        server.url("/recurso"),
        Arc::new(UreqTransport),
    );
    let outcome = client.execute(&Query::identifier_match(172986, 20, 5));
    assert_eq!(
        outcome,
        QueryOutcome::EndpointUnavailable {
            cause: UnavailableCause::Status { code: 500 }
        }
    );
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn slow_endpoint_times_out() {
    let server = StubServer::start(Reply::json(CIVIL_CODE_ROW).delayed(Duration::from_secs(3)));
    let client = ResilientQueryClient::with_transport(
        server.url("/sparql"),
        server.url("/recurso"),
        Arc::new(UreqTransport),
    );
    let outcome = client.execute(&Query::identifier_match(172986, 20, 1));
    assert!(outcome.is_transient(), "got {outcome:?}");
    assert!(!matches!(
        outcome,
        QueryOutcome::EndpointUnavailable {
            cause: UnavailableCause::Status { .. }
        }
    ));
}

#[test]
fn refused_connection_is_unavailable() {
    let base = refused_url();
    let client = ResilientQueryClient::with_transport(
        format!("{base}/sparql"),
        format!("{base}/recurso"),
        Arc::new(UreqTransport),
    );
    let outcome = client.execute(&Query::identifier_match(1984, 20, 5));
    assert!(outcome.is_transient(), "got {outcome:?}");
    assert!(!outcome.user_message().is_empty());
}

#[test]
fn html_error_page_is_malformed() {
    let server = StubServer::start(Reply::json("<html><body>Mantención</body></html>"));
    let client = ResilientQueryClient::with_transport(
        server.url("/sparql"),
        server.url("/recurso"),
        Arc::new(UreqTransport),
    );
    assert!(matches!(
        client.execute(&Query::identifier_match(1, 20, 5)),
        QueryOutcome::MalformedResponse { .. }
    ));
}

// ---------------------------------------------------------------------------
// Resources and health
// ---------------------------------------------------------------------------

#[test]
fn resource_document_is_fetched_by_identifier() {
    let server = StubServer::start(Reply::json(
        r#"{"@id": "http://datos.bcn.cl/recurso/cl/ley/172986", "title": "Código Civil"}"#,
    ));
    let pipeline = pipeline_for(&server);

    let document = match pipeline.fetch_norm(172986) {
        ResourceOutcome::Document { document } => document,
        other => panic!("expected a document, got {other:?}"),
    };
    assert_eq!(document["title"], "Código Civil");

    let requests = server.requests();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/recurso/cl/ley/172986/datos.json");
}

#[test]
fn missing_resource_is_not_found() {
    let server = StubServer::start(Reply::new(404, ""));
    let client = ResilientQueryClient::with_transport(
        server.url("/sparql"),
        server.url("/recurso"),
        Arc::new(UreqTransport),
    );
    assert_eq!(
        client.fetch_resource(&ResourcePath::law(99999999)),
        ResourceOutcome::NotFound
    );
}

#[test]
fn retired_endpoint_is_unavailable() {
    let server = StubServer::start(Reply::new(401, r#"{"error": "unauthorized"}"#));
    let pipeline = pipeline_for(&server);

    assert!(!pipeline.health().is_available(LEYFACIL));
    assert!(!pipeline.health().is_available(LEYFACIL));
    // The second check is served from the cache.
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn healthy_endpoint_is_available() {
    let server = StubServer::start(Reply::json("{}"));
    let guard = EndpointHealthGuard::new(
        [("mirror".to_string(), server.url("/sparql"))]
            .into_iter()
            .collect(),
    )
    .with_probe_timeout(Duration::from_secs(2));
    assert!(guard.is_available("mirror"));
    assert!(guard.status("mirror").is_some_and(|s| s.available));
}
