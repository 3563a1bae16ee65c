// src/models/verdict.rs
//! Verification results.
//!
//! The cryptographic verdict and the live ledger status are kept as two
//! separate values. A proof can carry a genuine signature for a certificate
//! that has since been revoked, and callers must be able to see both.

use crate::error::LedgerError;
use crate::models::attestation::AttestationPayload;
use serde::{Deserialize, Serialize};

/// Outcome of recovering the signer of an attestation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignatureVerdict {
    /// True iff the recovered address equals the expected issuer
    pub valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered_address: Option<String>,

    pub expected_address: String,

    /// Always populated when `valid` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Live answer from the ledger. `Unknown` is distinct from `Invalid`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LedgerStatus {
    Valid,
    Invalid,
    Unknown { reason: String },
}

impl LedgerStatus {
    /// `Some(validity)` when the ledger answered, `None` when it did not.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LedgerStatus::Valid => Some(true),
            LedgerStatus::Invalid => Some(false),
            LedgerStatus::Unknown { .. } => None,
        }
    }
}

impl From<Result<bool, LedgerError>> for LedgerStatus {
    fn from(answer: Result<bool, LedgerError>) -> Self {
        match answer {
            Ok(true) => LedgerStatus::Valid,
            Ok(false) => LedgerStatus::Invalid,
            Err(e) => LedgerStatus::Unknown {
                reason: e.to_string(),
            },
        }
    }
}

/// Signature verdict and ledger status side by side.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CombinedVerdict {
    pub signature: SignatureVerdict,
    pub ledger: LedgerStatus,

    /// Payload reconstructed from the wire record, if it had one
    pub payload: Option<AttestationPayload>,

    /// Unix seconds at which the check ran
    pub checked_at: u64,
}

impl CombinedVerdict {
    pub fn signature_valid(&self) -> bool {
        self.signature.valid
    }

    pub fn ledger_valid_now(&self) -> Option<bool> {
        self.ledger.as_bool()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_ledger_failure_is_unknown_not_invalid() {
        let status = LedgerStatus::from(Err(LedgerError::Timeout(Duration::from_secs(3))));
        assert!(matches!(status, LedgerStatus::Unknown { .. }));
        assert_eq!(status.as_bool(), None);

        assert_eq!(LedgerStatus::from(Ok::<_, LedgerError>(false)).as_bool(), Some(false));
        assert_eq!(LedgerStatus::from(Ok::<_, LedgerError>(true)).as_bool(), Some(true));
    }

    #[test]
    fn test_ledger_status_wire_shape() {
        assert_eq!(serde_json::to_value(LedgerStatus::Valid).unwrap(), json!({"status": "valid"}));
        assert_eq!(
            serde_json::to_value(LedgerStatus::Unknown { reason: "down".into() }).unwrap(),
            json!({"status": "unknown", "reason": "down"})
        );
    }
}
