//! Result validator: interprets SPARQL JSON result payloads.
//!
//! The expected shape is the W3C SPARQL 1.1 JSON results format:
//!
//! ```json
//! {"head": {"vars": ["norma"]},
//!  "results": {"bindings": [{"norma": {"type": "uri", "value": "..."}}]}}
//! ```
//!
//! Anything else is a [`QueryOutcome::MalformedResponse`], never a panic.

use serde_json::Value;

use crate::outcome::{Binding, QueryOutcome};

/// Validate a raw response body.
pub fn validate(raw_payload: &str) -> QueryOutcome {
    let json: Value = match serde_json::from_str(raw_payload) {
        Ok(json) => json,
        Err(e) => {
            return malformed(format!("response is not JSON: {e}"));
        }
    };
    validate_json(&json)
}

/// Validate an already-parsed response.
pub fn validate_json(json: &Value) -> QueryOutcome {
    let Some(results) = json.get("results") else {
        return malformed("missing `results`".to_string());
    };
    let Some(rows) = results.get("bindings").and_then(Value::as_array) else {
        return malformed("`results.bindings` is missing or not an array".to_string());
    };
    if rows.is_empty() {
        return QueryOutcome::EmptyResult;
    }

    let mut bindings = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        match parse_row(row) {
            Ok(binding) => bindings.push(binding),
            Err(detail) => return malformed(format!("row {index}: {detail}")),
        }
    }
    QueryOutcome::Success { bindings }
}

fn parse_row(row: &Value) -> Result<Binding, String> {
    let Some(fields) = row.as_object() else {
        return Err("row is not an object".to_string());
    };
    let mut binding = Binding::new();
    for (name, term) in fields {
        let value = match term {
            Value::Object(obj) => obj
                .get("value")
                .and_then(Value::as_str)
                .ok_or_else(|| format!("`{name}` has no string `value`"))?,
            Value::String(s) => s.as_str(),
            _ => return Err(format!("`{name}` is neither a term object nor a string")),
        };
        binding.insert(name.clone(), value.to_string());
    }
    Ok(binding)
}

fn malformed(detail: String) -> QueryOutcome {
    tracing::warn!(%detail, "malformed SPARQL response");
    QueryOutcome::MalformedResponse { detail }
}
