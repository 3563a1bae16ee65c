// src/wallet/key_management.rs
//! Issuer key management and attestation signing.
//!
//! The issuer key is process-wide, read-only configuration: parsed once at
//! startup, never rotated or mutated afterwards. Malformed key material is a
//! startup error, so a constructed [`IssuerKey`] is always usable.
//!
//! Uses the following cryptographic primitives:
//! - secp256k1 ECDSA with RFC 6979 deterministic nonces (via `k256`/`ethers`)
//! - Keccak-256 hashing
//! - EIP-191 personal-message framing, so an attestation signature can never
//!   double as a transaction signature

use crate::error::{AttestationError, KeyError};
use crate::models::attestation::{AttestationPayload, SignedAttestation};
use crate::utils::crypto::{hash_data, personal_message_hash, to_prefixed_hex};
use crate::utils::serialization::canonical_payload_json;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use ethers::utils::{hex, to_checksum};
use k256::ecdsa::SigningKey;

/// Signs attestation payloads on behalf of one issuer identity.
///
/// `IssuerKey` is the only implementation today. A multi-issuer deployment
/// would key several signers by [`AttestationSigner::issuer`].
pub trait AttestationSigner: Send + Sync {
    /// Address that signatures from this signer recover to.
    fn issuer(&self) -> Address;

    /// Hashes the canonical form of `payload` and signs it.
    fn sign(&self, payload: AttestationPayload) -> Result<SignedAttestation, AttestationError>;
}

/// Issuer signing key.
#[derive(Clone)]
pub struct IssuerKey {
    wallet: LocalWallet,
}

impl IssuerKey {
    /// Parses a hex-encoded secp256k1 secret (with or without `0x`).
    pub fn from_hex(private_key: &str) -> Result<Self, KeyError> {
        Ok(Self {
            wallet: parse_wallet(private_key)?,
        })
    }

    /// Generates a throwaway key.
    #[cfg(test)]
    pub fn random() -> Self {
        Self {
            wallet: LocalWallet::new(&mut ethers::core::rand::thread_rng()),
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// EIP-55 checksummed address.
    pub fn checksum_address(&self) -> String {
        to_checksum(&self.address(), None)
    }
}

impl AttestationSigner for IssuerKey {
    fn issuer(&self) -> Address {
        self.address()
    }

    fn sign(&self, payload: AttestationPayload) -> Result<SignedAttestation, AttestationError> {
        let digest = hash_data(canonical_payload_json(&payload).as_bytes());
        let signature = self
            .wallet
            .sign_hash(personal_message_hash(&digest))
            .map_err(|e| AttestationError::Signing(e.to_string()))?;

        Ok(SignedAttestation {
            payload,
            signature: format!("0x{}", signature),
            message_hash: to_prefixed_hex(&digest),
        })
    }
}

/// Parses a hex private key into a local wallet.
pub fn parse_wallet(private_key: &str) -> Result<LocalWallet, KeyError> {
    let trimmed = private_key.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(stripped).map_err(|e| KeyError::Hex(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(KeyError::Length(bytes.len()));
    }
    let signing_key = SigningKey::from_slice(&bytes).map_err(|_| KeyError::InvalidScalar)?;
    Ok(LocalWallet::from(signing_key))
}

/// Well-known development keys (Hardhat accounts #0 and #1). Never funded.
#[cfg(test)]
pub mod test_keys {
    pub const ISSUER_KEY: &str =
        "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
    pub const ISSUER_ADDRESS: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    pub const OTHER_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attestation::Metadata;
    use serde_json::json;

    fn payload(issuer: &IssuerKey) -> AttestationPayload {
        let mut metadata = Metadata::new();
        metadata.insert("name".into(), json!("Alice"));
        AttestationPayload {
            token_id: 42,
            valid: true,
            timestamp: 1_700_000_000,
            issuer: issuer.checksum_address(),
            metadata,
        }
    }

    #[test]
    fn test_from_hex_derives_expected_address() {
        let key = IssuerKey::from_hex(test_keys::ISSUER_KEY).unwrap();
        assert_eq!(key.checksum_address(), test_keys::ISSUER_ADDRESS);

        let unprefixed = IssuerKey::from_hex(test_keys::ISSUER_KEY.trim_start_matches("0x")).unwrap();
        assert_eq!(unprefixed.address(), key.address());
    }

    #[test]
    fn test_from_hex_rejects_malformed_keys() {
        assert!(matches!(IssuerKey::from_hex("0xnothex"), Err(KeyError::Hex(_))));
        assert!(matches!(IssuerKey::from_hex("0xabcd"), Err(KeyError::Length(2))));
        assert!(matches!(IssuerKey::from_hex(""), Err(KeyError::Length(0))));
        assert!(matches!(
            IssuerKey::from_hex(&"00".repeat(32)),
            Err(KeyError::InvalidScalar)
        ));
    }

    #[test]
    fn test_sign_produces_prefixed_signature_and_hash() {
        let key = IssuerKey::from_hex(test_keys::ISSUER_KEY).unwrap();
        let signed = key.sign(payload(&key)).unwrap();

        assert!(signed.signature.starts_with("0x"));
        assert_eq!(signed.signature.len(), 2 + 130);
        assert_eq!(signed.signature, signed.signature.to_lowercase());
        assert_eq!(
            signed.message_hash,
            to_prefixed_hex(&hash_data(canonical_payload_json(&signed.payload).as_bytes()))
        );
    }

    #[test]
    fn test_sign_is_deterministic() {
        let key = IssuerKey::from_hex(test_keys::ISSUER_KEY).unwrap();
        let first = key.sign(payload(&key)).unwrap();
        let second = key.sign(payload(&key)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_issuers_produce_different_signatures() {
        let key = IssuerKey::from_hex(test_keys::ISSUER_KEY).unwrap();
        let other = IssuerKey::from_hex(test_keys::OTHER_KEY).unwrap();
        let p = payload(&key);
        assert_ne!(key.sign(p.clone()).unwrap().signature, other.sign(p).unwrap().signature);
    }
}
