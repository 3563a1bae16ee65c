// src/utils/serialization.rs
//! Serialization utilities.
//!
//! Provides the canonical text encoding that attestation signatures are
//! computed over, plus the plain JSON helper used by the metadata store.
//!
//! # Canonical form
//! - Compact JSON, no insignificant whitespace
//! - Object keys sorted by byte value at every nesting level
//! - Integers in plain decimal
//!
//! The output depends only on the payload's field/value set, never on the
//! order in which fields were inserted.

use crate::models::attestation::AttestationPayload;
use serde::Serialize;
use serde_json::{Map, Value};

/// Serializes a value to a JSON string.
pub fn serialize<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Rebuilds `value` with every object's keys in sorted order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(key, inner)| (key.clone(), canonicalize(inner)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Canonical JSON text of `value`.
pub fn canonical_string(value: &Value) -> String {
    canonicalize(value).to_string()
}

/// The exact text an attestation signature covers.
pub fn canonical_payload_json(payload: &AttestationPayload) -> String {
    let mut object = Map::new();
    for (key, value) in &payload.metadata {
        object.insert(key.clone(), value.clone());
    }
    object.insert("tokenId".into(), Value::from(payload.token_id));
    object.insert("valid".into(), Value::from(payload.valid));
    object.insert("timestamp".into(), Value::from(payload.timestamp));
    object.insert("issuer".into(), Value::from(payload.issuer.clone()));
    canonical_string(&Value::Object(object))
}
