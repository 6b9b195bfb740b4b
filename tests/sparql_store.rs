//! Runs generated SPARQL against a small in-memory BCN-shaped graph.
//!
//! `Store::query` is deprecated in oxigraph 0.5 but remains the simplest
//! entry point for a SELECT.
#![allow(deprecated)]

use std::sync::Arc;

use oxigraph::model::vocab::rdf;
use oxigraph::model::{GraphNameRef, Literal, NamedNode, Quad, Term};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use leychile::intent::Intent;
use leychile::query::{BCN_NORMS_NS, BCN_NS, DC_NS, GraphClass, Query, QueryBuilder, SearchScope};
use leychile::registry::KnownEntityRegistry;

const RESOURCE: &str = "http://datos.bcn.cl/recurso/cl/ley/";

fn node(iri: &str) -> NamedNode {
    NamedNode::new(iri).unwrap()
}

fn add(store: &Store, subject: &str, predicate: NamedNode, object: impl Into<Term>) {
    store
        .insert(&Quad::new(
            node(subject),
            predicate,
            object,
            GraphNameRef::DefaultGraph,
        ))
        .unwrap();
}

fn add_norm(store: &Store, id: i64, class_iri: &str, title: &str) {
    let subject = format!("{RESOURCE}{id}");
    add(store, &subject, rdf::TYPE.into(), node(class_iri));
    add(
        store,
        &subject,
        node(&format!("{BCN_NORMS_NS}leychileCode")),
        Literal::from(id),
    );
    add(
        store,
        &subject,
        node(&format!("{DC_NS}title")),
        Literal::new_simple_literal(title),
    );
}

fn bcn_graph() -> Store {
    let store = Store::new().unwrap();
    let norm = format!("{BCN_NORMS_NS}Norm");
    let bill = format!("{BCN_NS}ProyectoDeLey");
    add_norm(&store, 172986, &norm, "Código Civil");
    add_norm(&store, 1984, &norm, "Código Penal");
    add_norm(
        &store,
        141599,
        &norm,
        "Ley 19.628 sobre protección de la vida privada",
    );
    add_norm(&store, 1141977, &norm, "Ley que regula el teletrabajo");
    add_norm(&store, 900001, &bill, "Proyecto de ley sobre teletrabajo en el sector público");
    store
}

/// Titles bound in the result, sorted.
fn titles(store: &Store, query: &Query) -> Vec<String> {
    let sparql = query.to_sparql();
    let QueryResults::Solutions(solutions) = store.query(sparql.as_str()).unwrap() else {
        panic!("expected solutions for {sparql}");
    };
    let mut titles: Vec<String> = solutions
        .map(|solution| {
            let solution = solution.unwrap();
            match solution.get("title") {
                Some(Term::Literal(literal)) => literal.value().to_string(),
                other => panic!("unexpected title binding {other:?}"),
            }
        })
        .collect();
    titles.sort();
    titles
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[test]
fn identifier_match_finds_the_norm() {
    let store = bcn_graph();
    let query = Query::identifier_match(172986, 20, 60);
    assert_eq!(titles(&store, &query), vec!["Código Civil"]);
}

#[test]
fn unknown_identifier_has_no_rows() {
    let store = bcn_graph();
    assert!(titles(&store, &Query::identifier_match(99999999, 20, 60)).is_empty());
}

#[test]
fn keyword_search_respects_scope() {
    let store = bcn_graph();
    let words = keywords(&["teletrabajo"]);

    let norms = Query::keyword_search(SearchScope::Norms, &words, 20, 60);
    assert_eq!(titles(&store, &norms), vec!["Ley que regula el teletrabajo"]);

    let bills = Query::keyword_search(SearchScope::Bills, &words, 20, 60);
    assert_eq!(
        titles(&store, &bills),
        vec!["Proyecto de ley sobre teletrabajo en el sector público"]
    );

    let all = Query::keyword_search(SearchScope::All, &words, 20, 60);
    assert_eq!(titles(&store, &all).len(), 2);
}

#[test]
fn keyword_search_ignores_accents_and_thousands_dots() {
    let store = bcn_graph();
    let query = Query::keyword_search(
        SearchScope::Norms,
        &keywords(&["19628", "proteccion"]),
        20,
        60,
    );
    assert_eq!(
        titles(&store, &query),
        vec!["Ley 19.628 sobre protección de la vida privada"]
    );
}

#[test]
fn keyword_search_requires_every_keyword() {
    let store = bcn_graph();
    let query = Query::keyword_search(
        SearchScope::All,
        &keywords(&["teletrabajo", "publico"]),
        20,
        60,
    );
    assert_eq!(titles(&store, &query).len(), 1);
}

#[test]
fn limit_caps_rows() {
    let store = bcn_graph();
    let query = Query::class_membership(GraphClass::Norm, 2, 60);
    assert_eq!(titles(&store, &query).len(), 2);
}

#[test]
fn class_membership_lists_bills() {
    let store = bcn_graph();
    let query = Query::class_membership(GraphClass::Bill, 20, 60);
    assert_eq!(titles(&store, &query).len(), 1);
}

#[test]
fn built_queries_run_against_the_graph() {
    let store = bcn_graph();
    let builder = QueryBuilder::new(Arc::new(KnownEntityRegistry::bundled().unwrap()));

    let penal = builder
        .build(&Intent::TopicalSearch {
            keywords: keywords(&["codigo", "penal"]),
        })
        .unwrap();
    assert_eq!(titles(&store, &penal), vec!["Código Penal"]);

    let privacy = builder
        .build(&Intent::TopicalSearch {
            keywords: keywords(&["ley", "19628", "proteccion", "datos"]),
        })
        .unwrap();
    assert_eq!(penal.identifier(), Some(1984));
    assert_eq!(privacy.identifier(), Some(141599));
    assert_eq!(titles(&store, &privacy).len(), 1);
}
