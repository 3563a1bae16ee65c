// src/services/cross_checker.rs
//! Combines offline signature verification with a live ledger read.
//!
//! The two answers are reported side by side. A genuine attestation for a
//! certificate revoked after signing yields `signature.valid == true` and
//! `ledger == Invalid`; an unreachable ledger yields `Unknown`.

use crate::blockchain::ledger_client::CertificateLedger;
use crate::models::qr_record::QrWireRecord;
use crate::models::verdict::{CombinedVerdict, LedgerStatus};
use crate::services::verifier::Verifier;
use crate::utils::time::unix_now;
use log::{info, warn};
use std::sync::Arc;

/// Verifies scanned QR records against the issuer key and the ledger.
#[derive(Clone)]
pub struct CrossChecker {
    verifier: Verifier,
    ledger: Arc<dyn CertificateLedger>,
}

impl CrossChecker {
    pub fn new(verifier: Verifier, ledger: Arc<dyn CertificateLedger>) -> Self {
        Self { verifier, ledger }
    }

    /// Produces the combined verdict for `record`.
    ///
    /// The ledger is queried even when the signature is invalid, so callers
    /// always learn the live status of the referenced token.
    pub async fn check(&self, record: &QrWireRecord) -> CombinedVerdict {
        let (signature, payload) = match record.to_payload() {
            Ok(payload) => (self.verifier.verify(&payload, &record.s), Some(payload)),
            Err(e) => (self.verifier.reject(e.to_string()), None),
        };

        let ledger = LedgerStatus::from(self.ledger.is_valid(record.t).await);
        if let LedgerStatus::Unknown { reason } = &ledger {
            warn!("ledger status of token {} unknown: {}", record.t, reason);
        }

        info!(
            "checked token {}: signature_valid={} ledger={:?}",
            record.t, signature.valid, ledger
        );

        CombinedVerdict {
            signature,
            ledger,
            payload,
            checked_at: unix_now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::in_memory_ledger::InMemoryLedger;
    use crate::blockchain::ledger_client::TxReceipt;
    use crate::error::LedgerError;
    use crate::models::attestation::Metadata;
    use crate::services::payload_builder::PayloadBuilder;
    use crate::services::qr_codec::{decode, encode};
    use crate::wallet::key_management::{test_keys, AttestationSigner, IssuerKey};
    use async_trait::async_trait;
    use ethers::types::Address;
    use serde_json::json;

    struct UnreachableLedger;

    #[async_trait]
    impl CertificateLedger for UnreachableLedger {
        async fn is_valid(&self, _token_id: u64) -> Result<bool, LedgerError> {
            Err(LedgerError::Rpc("connection refused".into()))
        }
        async fn mint_certificate(&self, _recipient: Address) -> Result<TxReceipt, LedgerError> {
            Err(LedgerError::Rpc("connection refused".into()))
        }
        async fn revoke_certificate(&self, _token_id: u64) -> Result<TxReceipt, LedgerError> {
            Err(LedgerError::Rpc("connection refused".into()))
        }
    }

    fn issuer() -> IssuerKey {
        IssuerKey::from_hex(test_keys::ISSUER_KEY).unwrap()
    }

    /// build -> sign -> encode -> decode, as a relying party would see it.
    fn scanned_record(key: &IssuerKey, token_id: u64, valid: bool) -> QrWireRecord {
        let mut metadata = Metadata::new();
        metadata.insert("name".into(), json!("Alice"));
        let payload = PayloadBuilder::new(key.address())
            .build(token_id, valid, metadata)
            .unwrap();
        let signed = key.sign(payload).unwrap();
        decode(&encode(&signed).unwrap().qr_text).unwrap()
    }

    #[tokio::test]
    async fn test_happy_path() {
        let key = issuer();
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_valid(42, true);
        let checker = CrossChecker::new(Verifier::new(key.address()), ledger);

        let verdict = checker.check(&scanned_record(&key, 42, true)).await;

        assert!(verdict.signature_valid(), "{:?}", verdict.signature.error);
        assert_eq!(verdict.ledger_valid_now(), Some(true));
        assert_eq!(verdict.payload.unwrap().metadata.get("name"), Some(&json!("Alice")));
    }

    #[tokio::test]
    async fn test_revoked_after_signing_keeps_both_verdicts() {
        let key = issuer();
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_valid(42, true);
        let record = scanned_record(&key, 42, true);

        ledger.revoke_certificate(42).await.unwrap();
        let checker = CrossChecker::new(Verifier::new(key.address()), ledger);
        let verdict = checker.check(&record).await;

        assert!(verdict.signature_valid());
        assert_eq!(verdict.ledger, LedgerStatus::Invalid);
        assert_eq!(verdict.ledger_valid_now(), Some(false));
    }

    #[tokio::test]
    async fn test_unreachable_ledger_is_unknown() {
        let key = issuer();
        let checker = CrossChecker::new(Verifier::new(key.address()), Arc::new(UnreachableLedger));
        let verdict = checker.check(&scanned_record(&key, 42, true)).await;

        assert!(verdict.signature_valid());
        assert!(matches!(verdict.ledger, LedgerStatus::Unknown { .. }));
        assert_eq!(verdict.ledger_valid_now(), None);
    }

    #[tokio::test]
    async fn test_forged_record_is_rejected_but_ledger_still_reported() {
        let key = issuer();
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_valid(42, true);
        let checker = CrossChecker::new(Verifier::new(key.address()), ledger);

        let mut record = scanned_record(&key, 42, false);
        record.valid = true;
        let verdict = checker.check(&record).await;

        assert!(!verdict.signature_valid());
        assert!(verdict.signature.error.is_some());
        assert_eq!(verdict.ledger_valid_now(), Some(true));
    }

    #[tokio::test]
    async fn test_dropped_metadata_breaks_signature() {
        let key = issuer();
        let checker = CrossChecker::new(Verifier::new(key.address()), Arc::new(InMemoryLedger::new()));

        let mut record = scanned_record(&key, 7, true);
        record.extensions.clear();
        assert!(!checker.check(&record).await.signature_valid());
    }

    #[tokio::test]
    async fn test_shadowing_extension_is_rejected_without_payload() {
        let key = issuer();
        let checker = CrossChecker::new(Verifier::new(key.address()), Arc::new(InMemoryLedger::new()));

        let mut record = scanned_record(&key, 7, true);
        record.extensions.insert("issuer".into(), json!("0x0"));
        let verdict = checker.check(&record).await;

        assert!(!verdict.signature_valid());
        assert!(verdict.payload.is_none());
        assert_eq!(verdict.ledger_valid_now(), Some(false));
    }

    #[tokio::test]
    async fn test_check_is_idempotent() {
        let key = issuer();
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_valid(3, true);
        let checker = CrossChecker::new(Verifier::new(key.address()), ledger);
        let record = scanned_record(&key, 3, true);

        let first = checker.check(&record).await;
        let second = checker.check(&record).await;
        assert_eq!(first.signature, second.signature);
        assert_eq!(first.ledger, second.ledger);
        assert_eq!(first.payload, second.payload);
    }
}
