// src/services/verifier.rs
//! Attestation signature verification.
//!
//! Recovers the signing address from `(payload, signature)` and compares it
//! with the configured issuer. Verification never fails with an error:
//! every problem, from unparsable hex to a foreign signer, comes back as a
//! `SignatureVerdict` with `valid == false` and a reason.

use crate::models::attestation::AttestationPayload;
use crate::models::verdict::SignatureVerdict;
use crate::utils::crypto::{hash_data, personal_message_hash};
use crate::utils::serialization::canonical_payload_json;
use ethers::types::{Address, Signature};
use ethers::utils::to_checksum;
use log::debug;
use std::str::FromStr;

/// Recovery-based verifier bound to one expected issuer.
#[derive(Clone, Debug)]
pub struct Verifier {
    /// Address genuine attestations must recover to
    expected_issuer: Address,
}

impl Verifier {
    pub fn new(expected_issuer: Address) -> Self {
        Self { expected_issuer }
    }

    /// Checks that `signature` was produced by the expected issuer over the
    /// canonical form of `payload`.
    ///
    /// Addresses are compared as 20-byte values, so checksum casing in the
    /// signature input is irrelevant.
    pub fn verify(&self, payload: &AttestationPayload, signature: &str) -> SignatureVerdict {
        let expected_address = to_checksum(&self.expected_issuer, None);

        match recover_signer(payload, signature) {
            Ok(recovered) if recovered == self.expected_issuer => SignatureVerdict {
                valid: true,
                recovered_address: Some(to_checksum(&recovered, None)),
                expected_address,
                error: None,
            },
            Ok(recovered) => {
                let recovered_address = to_checksum(&recovered, None);
                debug!(
                    "token {} signature recovers to {}, expected {}",
                    payload.token_id, recovered_address, expected_address
                );
                SignatureVerdict {
                    valid: false,
                    error: Some(format!(
                        "signature recovers to {}, not the expected issuer {}",
                        recovered_address, expected_address
                    )),
                    recovered_address: Some(recovered_address),
                    expected_address,
                }
            }
            Err(reason) => {
                debug!("token {} signature rejected: {}", payload.token_id, reason);
                self.reject(reason)
            }
        }
    }

    /// Negative verdict for input that never reached recovery.
    pub fn reject(&self, reason: impl Into<String>) -> SignatureVerdict {
        SignatureVerdict {
            valid: false,
            recovered_address: None,
            expected_address: to_checksum(&self.expected_issuer, None),
            error: Some(reason.into()),
        }
    }
}

fn recover_signer(payload: &AttestationPayload, signature: &str) -> Result<Address, String> {
    let signature = Signature::from_str(signature.trim())
        .map_err(|e| format!("malformed signature: {}", e))?;
    let digest = hash_data(canonical_payload_json(payload).as_bytes());
    signature
        .recover(personal_message_hash(&digest))
        .map_err(|e| format!("signature recovery failed: {}", e))
}
