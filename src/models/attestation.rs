// src/models/attestation.rs
//! Attestation data model.
//!
//! An attestation is a signed claim that a tokenized certificate was (or was
//! not) valid on the ledger at a given second, as seen by the issuer.

use crate::error::AttestationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Caller-supplied extension fields (holder name, institution, ...).
pub type Metadata = BTreeMap<String, Value>;

/// Field names the payload itself owns. Metadata may not reuse them.
pub const RESERVED_PAYLOAD_FIELDS: [&str; 4] = ["tokenId", "valid", "timestamp", "issuer"];

/// The record that gets signed.
///
/// Serialized with camelCase reserved names and the metadata entries
/// flattened to the top level. The signed bytes are produced by
/// [`crate::utils::serialization::canonical_payload_json`], not by this
/// derive, so field order here has no effect on signatures.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttestationPayload {
    /// Ledger token id of the certificate
    pub token_id: u64,

    /// Validity snapshot taken when the payload was built
    pub valid: bool,

    /// Unix seconds at build time
    pub timestamp: u64,

    /// EIP-55 checksummed address of the signing issuer
    pub issuer: String,

    /// Extension fields, signed together with the reserved ones
    #[serde(flatten)]
    pub metadata: Metadata,
}

/// A payload together with the issuer's signature over its canonical hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignedAttestation {
    pub payload: AttestationPayload,

    /// `0x`-prefixed 65-byte `r || s || v` signature
    pub signature: String,

    /// `0x`-prefixed keccak256 of the canonical payload bytes
    pub message_hash: String,
}

/// Coerces a JSON token id into its canonical numeric form.
///
/// Accepts a non-negative JSON integer or a decimal string such as `"42"`.
pub fn parse_token_id(value: &Value) -> Result<u64, AttestationError> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| AttestationError::InvalidTokenId(number.to_string())),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                return Err(AttestationError::InvalidTokenId(text.clone()));
            }
            trimmed
                .parse::<u64>()
                .map_err(|_| AttestationError::InvalidTokenId(text.clone()))
        }
        other => Err(AttestationError::InvalidTokenId(other.to_string())),
    }
}
