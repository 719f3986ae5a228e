//! # Embedded Content
//!
//! JSON Schemas for every registered schema identity are compiled into the
//! binary from `schemas/`, one file per short name (`bill/invoice` lives in
//! `schemas/bill/invoice.json`). Regime definitions are not stored as
//! files; they are serialized from the [`Registry`] on request so they can
//! never drift from the rules actually applied.

use std::path::Path;

use docket_core::DocketError;
use docket_doc::{schema, Registry};
use serde_json::Value;

/// `(file, contents)` for every embedded schema.
const SCHEMAS: &[(&str, &str)] = &[
    (
        "bill/correction-options.json",
        include_str!("../schemas/bill/correction-options.json"),
    ),
    ("bill/invoice.json", include_str!("../schemas/bill/invoice.json")),
    ("envelope.json", include_str!("../schemas/envelope.json")),
    ("head/header.json", include_str!("../schemas/head/header.json")),
    ("head/stamp.json", include_str!("../schemas/head/stamp.json")),
    ("note/message.json", include_str!("../schemas/note/message.json")),
];

/// Every schema identity, sorted.
pub fn schema_ids() -> Vec<&'static str> {
    schema::registered()
}

/// Raw JSON of the schema at `path` (`head/stamp`, `head/stamp.json` or a
/// full identity). `.json` is appended when the path has no extension.
///
/// # Errors
///
/// `Invalid` with `invalid schema: …` when nothing is embedded there.
pub fn schema(path: &str) -> Result<&'static str, DocketError> {
    let path = path.strip_prefix(schema::BASE).unwrap_or(path).trim_matches('/');
    let file = if Path::new(path).extension().is_some() {
        path.to_string()
    } else {
        format!("{path}.json")
    };
    SCHEMAS
        .iter()
        .find(|(name, _)| *name == file)
        .map(|(_, data)| *data)
        .ok_or_else(|| DocketError::Invalid(format!("invalid schema: schemas/{file}: not found")))
}

/// The schema for a full identity, parsed.
pub fn schema_value(id: &str) -> Result<Value, DocketError> {
    let raw = schema(id)?;
    serde_json::from_str(raw).map_err(|e| DocketError::Internal(format!("embedded schema {id}: {e}")))
}

/// The regime definition for a country code (case-insensitive), as JSON.
///
/// # Errors
///
/// `Invalid` with `invalid regime: …` for unknown codes.
pub fn regime(registry: &Registry, code: &str) -> Result<Value, DocketError> {
    let code = code.trim().to_lowercase();
    let def = registry
        .regime_for(&code)
        .ok_or_else(|| DocketError::Invalid(format!("invalid regime: regimes/{code}.json: not found")))?;
    serde_json::to_value(def).map_err(|e| DocketError::Internal(format!("regime {code}: {e}")))
}
