// src/services/credential_issuer.rs
//! Attestation issuance.
//!
//! Ties the payload builder, the issuer key and the QR codec together:
//! a token id, its current validity and some metadata go in, a signed and
//! rendered QR proof comes out.

use crate::error::{AttestationError, CodecError};
use crate::models::attestation::{Metadata, SignedAttestation};
use crate::services::payload_builder::PayloadBuilder;
use crate::services::qr_codec::{self, EncodedQr};
use crate::wallet::key_management::AttestationSigner;
use log::info;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Why an issuance request was refused.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error(transparent)]
    Attestation(#[from] AttestationError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A freshly issued proof.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IssuedProof {
    #[serde(flatten)]
    pub qr: EncodedQr,
    #[serde(flatten)]
    pub signed: SignedAttestation,
}

/// Issues signed QR attestations for one issuer.
#[derive(Clone)]
pub struct CredentialIssuer {
    builder: PayloadBuilder,
    signer: Arc<dyn AttestationSigner>,
}

impl CredentialIssuer {
    /// Creates an issuer whose payloads are stamped with `signer`'s address.
    pub fn new(signer: Arc<dyn AttestationSigner>) -> Self {
        Self {
            builder: PayloadBuilder::new(signer.issuer()),
            signer,
        }
    }

    pub fn issuer(&self) -> &str {
        self.builder.issuer()
    }

    /// Builds, signs and renders an attestation.
    ///
    /// # Errors
    /// - `Attestation` for reserved or non-canonical metadata
    /// - `Codec` if the record does not fit in a QR symbol
    pub fn issue(
        &self,
        token_id: u64,
        currently_valid: bool,
        metadata: Metadata,
    ) -> Result<IssuedProof, IssueError> {
        let payload = self.builder.build(token_id, currently_valid, metadata)?;
        let signed = self.signer.sign(payload)?;
        let qr = qr_codec::encode(&signed)?;

        info!(
            "issued attestation for token {} (valid={}, hash {})",
            token_id, currently_valid, signed.message_hash
        );

        Ok(IssuedProof { qr, signed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::verifier::Verifier;
    use crate::wallet::key_management::{test_keys, IssuerKey};
    use serde_json::json;

    fn issuer() -> CredentialIssuer {
        CredentialIssuer::new(Arc::new(IssuerKey::from_hex(test_keys::ISSUER_KEY).unwrap()))
    }

    #[test]
    fn test_issue_produces_verifiable_proof() {
        let mut metadata = Metadata::new();
        metadata.insert("name".into(), json!("Alice"));
        let proof = issuer().issue(42, true, metadata).unwrap();

        assert_eq!(proof.qr.qr_data.t, 42);
        assert_eq!(proof.qr.qr_data.s, proof.signed.signature);
        assert_eq!(proof.signed.payload.issuer, test_keys::ISSUER_ADDRESS);

        let key = IssuerKey::from_hex(test_keys::ISSUER_KEY).unwrap();
        let payload = proof.qr.qr_data.to_payload().unwrap();
        assert!(Verifier::new(key.address()).verify(&payload, &proof.qr.qr_data.s).valid);
    }

    #[test]
    fn test_issue_rejects_reserved_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert("valid".into(), json!(true));
        assert!(matches!(
            issuer().issue(1, false, metadata),
            Err(IssueError::Attestation(AttestationError::ReservedMetadataKey(_)))
        ));
    }

    #[test]
    fn test_issued_proof_response_shape() {
        let value = serde_json::to_value(issuer().issue(5, true, Metadata::new()).unwrap()).unwrap();
        for key in ["qrCode", "qrData", "signature", "payload", "messageHash"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert!(value.get("qrText").is_none());
    }
}
