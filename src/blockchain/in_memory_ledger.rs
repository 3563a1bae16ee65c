// src/blockchain/in_memory_ledger.rs
//! In-process certificate ledger.
//!
//! Mirrors the contract's observable behaviour (sequential token ids,
//! revocation, `isValid`) without a node. Used when no contract address is
//! configured and throughout the tests. State lives only as long as the
//! process.

use crate::blockchain::ledger_client::{CertificateLedger, TxReceipt};
use crate::error::LedgerError;
use crate::utils::crypto::{hash_data, to_prefixed_hex};
use async_trait::async_trait;
use ethers::types::Address;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct LedgerState {
    /// token id -> revoked flag
    certificates: HashMap<u64, bool>,
    last_token_id: u64,
    block_number: u64,
}

impl LedgerState {
    /// Fake transaction receipt for the next "block".
    fn seal(&mut self, label: &str) -> TxReceipt {
        self.block_number += 1;
        let seed = format!("{}:{}", label, self.block_number);
        TxReceipt {
            tx_hash: to_prefixed_hex(&hash_data(seed.as_bytes())),
            block_number: Some(self.block_number),
        }
    }
}

/// Thread-safe in-memory ledger.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces the validity of `token_id`, creating it if needed.
    #[cfg(test)]
    pub fn set_valid(&self, token_id: u64, valid: bool) {
        let mut state = self.lock();
        state.last_token_id = state.last_token_id.max(token_id);
        state.certificates.insert(token_id, !valid);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        // every mutation is a single insert or flag flip, so poisoned state is still whole
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CertificateLedger for InMemoryLedger {
    async fn is_valid(&self, token_id: u64) -> Result<bool, LedgerError> {
        Ok(self
            .lock()
            .certificates
            .get(&token_id)
            .map_or(false, |revoked| !revoked))
    }

    async fn mint_certificate(&self, recipient: Address) -> Result<TxReceipt, LedgerError> {
        let mut state = self.lock();
        state.last_token_id += 1;
        let token_id = state.last_token_id;
        state.certificates.insert(token_id, false);
        Ok(state.seal(&format!("mint:{}:{:?}", token_id, recipient)))
    }

    async fn revoke_certificate(&self, token_id: u64) -> Result<TxReceipt, LedgerError> {
        let mut state = self.lock();
        match state.certificates.get_mut(&token_id) {
            Some(revoked) if !*revoked => *revoked = true,
            Some(_) => {
                return Err(LedgerError::Rejected(format!(
                    "certificate {} already revoked",
                    token_id
                )))
            }
            None => {
                return Err(LedgerError::Rejected(format!(
                    "certificate {} does not exist",
                    token_id
                )))
            }
        }
        Ok(state.seal(&format!("revoke:{}", token_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_token_is_invalid() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.is_valid(7).await, Ok(false));
    }

    #[tokio::test]
    async fn test_mint_then_revoke() {
        let ledger = InMemoryLedger::new();
        let minted = ledger.mint_certificate(Address::repeat_byte(0x11)).await.unwrap();
        assert_eq!(minted.block_number, Some(1));
        assert!(minted.tx_hash.starts_with("0x"));
        assert_eq!(ledger.is_valid(1).await, Ok(true));

        ledger.revoke_certificate(1).await.unwrap();
        assert_eq!(ledger.is_valid(1).await, Ok(false));
        assert!(matches!(ledger.revoke_certificate(1).await, Err(LedgerError::Rejected(_))));
        assert!(matches!(ledger.revoke_certificate(99).await, Err(LedgerError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_mint_continues_after_seeded_ids() {
        let ledger = InMemoryLedger::new();
        ledger.set_valid(42, true);
        ledger.mint_certificate(Address::repeat_byte(0x11)).await.unwrap();
        assert_eq!(ledger.is_valid(43).await, Ok(true));
        assert_eq!(ledger.is_valid(42).await, Ok(true));
    }

    #[tokio::test]
    async fn test_set_valid_toggles() {
        let ledger = InMemoryLedger::new();
        ledger.set_valid(5, true);
        assert_eq!(ledger.is_valid(5).await, Ok(true));
        ledger.set_valid(5, false);
        assert_eq!(ledger.is_valid(5).await, Ok(false));
    }
}
