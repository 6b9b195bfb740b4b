// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # leychile
//!
//! Recognizes requests about Chilean legislation and retrieves the matching
//! norms from the linked-data service of the Biblioteca del Congreso Nacional
//! (BCN).
//!
//! ## Architecture
//!
//! - **Trigger classifier** (`trigger`): prioritized rules turning raw text into an [`Intent`](intent::Intent)
//! - **Registry** (`registry`): curated table of well-known norms and their idNorma
//! - **Query builder** (`query`): intents to SPARQL over the BCN ontologies
//! - **Client** (`client`): single-attempt, timeout-bounded HTTP via `ureq`
//! - **Validator** (`validate`): SPARQL JSON results to typed outcomes
//! - **Health guard** (`health`): cached probes of retired endpoints
//!
//! ## Library usage
//!
//! ```no_run
//! use leychile::config::LeyChileConfig;
//! use leychile::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::from_config(LeyChileConfig::default()).unwrap();
//! let response = pipeline.handle("Muestrame la ley con idNorma 172986");
//! println!("{}", response.message());
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod intent;
pub mod lexicon;
pub mod outcome;
pub mod pipeline;
pub mod query;
pub mod registry;
pub mod trigger;
pub mod validate;
