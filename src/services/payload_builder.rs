// src/services/payload_builder.rs
//! Canonical payload construction.
//!
//! The builder owns the issuer identity and the clock: callers choose the
//! token, the validity snapshot and the metadata, never the timestamp or the
//! issuer.

use crate::error::AttestationError;
use crate::models::attestation::{AttestationPayload, Metadata};
use crate::models::qr_record::is_reserved_key;
use crate::utils::time::unix_now;
use ethers::types::Address;
use ethers::utils::to_checksum;
use serde_json::Value;

/// Builds attestation payloads for a single issuer.
#[derive(Clone, Debug)]
pub struct PayloadBuilder {
    /// Checksummed issuer address stamped into every payload
    issuer: String,
}

impl PayloadBuilder {
    pub fn new(issuer: Address) -> Self {
        Self {
            issuer: to_checksum(&issuer, None),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Assembles a payload stamped with the current time.
    ///
    /// # Errors
    /// - `ReservedMetadataKey` if a metadata key reuses a payload or wire name
    /// - `FractionalMetadataValue` if a metadata value contains a non-integer number
    pub fn build(
        &self,
        token_id: u64,
        currently_valid: bool,
        metadata: Metadata,
    ) -> Result<AttestationPayload, AttestationError> {
        validate_metadata(&metadata)?;

        Ok(AttestationPayload {
            token_id,
            valid: currently_valid,
            timestamp: unix_now(),
            issuer: self.issuer.clone(),
            metadata,
        })
    }
}

fn validate_metadata(metadata: &Metadata) -> Result<(), AttestationError> {
    for (key, value) in metadata {
        if is_reserved_key(key) {
            return Err(AttestationError::ReservedMetadataKey(key.clone()));
        }
        if !is_integral(value) {
            return Err(AttestationError::FractionalMetadataValue(key.clone()));
        }
    }
    Ok(())
}

fn is_integral(value: &Value) -> bool {
    match value {
        Value::Number(number) => number.is_i64() || number.is_u64(),
        Value::Array(items) => items.iter().all(is_integral),
        Value::Object(map) => map.values().all(is_integral),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::key_management::{test_keys, IssuerKey};
    use serde_json::json;

    fn builder() -> PayloadBuilder {
        PayloadBuilder::new(IssuerKey::from_hex(test_keys::ISSUER_KEY).unwrap().address())
    }

    #[test]
    fn test_build_stamps_issuer_and_current_time() {
        let before = unix_now();
        let mut metadata = Metadata::new();
        metadata.insert("name".into(), json!("Alice"));

        let payload = builder().build(42, true, metadata.clone()).unwrap();

        assert_eq!(payload.token_id, 42);
        assert!(payload.valid);
        assert_eq!(payload.issuer, test_keys::ISSUER_ADDRESS);
        assert!(payload.timestamp >= before && payload.timestamp <= unix_now());
        assert_eq!(payload.metadata, metadata);
    }

    #[test]
    fn test_build_rejects_reserved_metadata_keys() {
        for key in ["tokenId", "valid", "timestamp", "issuer", "v", "t", "s", "ts", "iss"] {
            let mut metadata = Metadata::new();
            metadata.insert(key.into(), json!("spoofed"));
            assert_eq!(
                builder().build(1, true, metadata),
                Err(AttestationError::ReservedMetadataKey(key.into()))
            );
        }
    }

    #[test]
    fn test_build_rejects_fractional_numbers_anywhere() {
        let mut metadata = Metadata::new();
        metadata.insert("grades".into(), json!({"math": [90, 85.5]}));
        assert_eq!(
            builder().build(1, true, metadata),
            Err(AttestationError::FractionalMetadataValue("grades".into()))
        );
    }

    #[test]
    fn test_build_accepts_nested_integral_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert("year".into(), json!(2024));
        metadata.insert("honors".into(), json!({"cum_laude": true, "rank": [1, -2]}));
        metadata.insert("note".into(), json!(null));
        assert!(builder().build(1, false, metadata).is_ok());
    }
}
