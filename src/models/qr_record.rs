// src/models/qr_record.rs
//! Compact record embedded in the QR image.
//!
//! Short keys keep the symbol small. The mapping to [`AttestationPayload`]
//! is one-to-one: `t`/`valid`/`ts`/`iss` carry the reserved fields and every
//! other top-level key is a signed metadata entry.

use crate::error::CodecError;
use crate::models::attestation::{
    AttestationPayload, Metadata, SignedAttestation, RESERVED_PAYLOAD_FIELDS,
};
use serde::{Deserialize, Serialize};

/// Current wire format version (`v`).
pub const WIRE_VERSION: u64 = 1;

/// Keys the wire record owns.
pub const RESERVED_WIRE_KEYS: [&str; 6] = ["v", "t", "s", "ts", "iss", "valid"];

/// Flat QR payload: `{v, t, s, ts, iss, valid, ...extensions}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QrWireRecord {
    /// Format version
    pub v: u64,
    /// Token id
    pub t: u64,
    /// Issuer signature, `0x`-prefixed lowercase hex
    pub s: String,
    /// Signing time, unix seconds
    pub ts: u64,
    /// Issuer address as it appears in the signed payload
    pub iss: String,
    /// Validity snapshot at signing time
    pub valid: bool,
    /// Signed metadata entries spliced in at the top level
    #[serde(flatten)]
    pub extensions: Metadata,
}

impl QrWireRecord {
    /// Flattens a signed attestation into its wire shape.
    pub fn from_signed(signed: &SignedAttestation) -> Self {
        let payload = &signed.payload;
        Self {
            v: WIRE_VERSION,
            t: payload.token_id,
            s: signed.signature.clone(),
            ts: payload.timestamp,
            iss: payload.issuer.clone(),
            valid: payload.valid,
            extensions: payload.metadata.clone(),
        }
    }

    /// Rebuilds the exact payload that was signed.
    ///
    /// Fails if an extension key shadows a reserved payload or wire name,
    /// since such a record has no unambiguous payload.
    pub fn to_payload(&self) -> Result<AttestationPayload, CodecError> {
        if let Some(key) = self.extensions.keys().find(|key| is_reserved_key(key)) {
            return Err(CodecError::ReservedExtensionKey(key.clone()));
        }

        Ok(AttestationPayload {
            token_id: self.t,
            valid: self.valid,
            timestamp: self.ts,
            issuer: self.iss.clone(),
            metadata: self.extensions.clone(),
        })
    }

    /// Serializes the record to the text stored in the QR symbol.
    pub fn to_text(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(|e| CodecError::Render(e.to_string()))
    }
}

/// True when `key` belongs to either the payload or the wire record.
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_PAYLOAD_FIELDS.contains(&key) || RESERVED_WIRE_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signed_fixture() -> SignedAttestation {
        let mut metadata = Metadata::new();
        metadata.insert("name".into(), json!("Alice"));
        metadata.insert("institution".into(), json!("University"));
        SignedAttestation {
            payload: AttestationPayload {
                token_id: 42,
                valid: true,
                timestamp: 1_700_000_000,
                issuer: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".into(),
                metadata,
            },
            signature: format!("0x{}", "ab".repeat(65)),
            message_hash: format!("0x{}", "00".repeat(32)),
        }
    }

    #[test]
    fn test_wire_text_uses_short_keys_and_flat_extensions() {
        let record = QrWireRecord::from_signed(&signed_fixture());
        let value: serde_json::Value = serde_json::from_str(&record.to_text().unwrap()).unwrap();

        assert_eq!(value["v"], json!(1));
        assert_eq!(value["t"], json!(42));
        assert_eq!(value["ts"], json!(1_700_000_000u64));
        assert_eq!(value["iss"], json!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"));
        assert_eq!(value["valid"], json!(true));
        assert_eq!(value["name"], json!("Alice"));
        assert!(value.get("tokenId").is_none());
        assert!(value.get("extensions").is_none());
    }

    #[test]
    fn test_to_payload_inverts_from_signed() {
        let signed = signed_fixture();
        let record = QrWireRecord::from_signed(&signed);
        assert_eq!(record.to_payload().unwrap(), signed.payload);
    }

    #[test]
    fn test_to_payload_rejects_shadowing_extension() {
        let mut record = QrWireRecord::from_signed(&signed_fixture());
        record.extensions.insert("tokenId".into(), json!(7));
        assert_eq!(
            record.to_payload(),
            Err(CodecError::ReservedExtensionKey("tokenId".into()))
        );
    }
}
