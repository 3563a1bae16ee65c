// src/config.rs
//! Service configuration.
//!
//! Values come from built-in defaults overlaid with the process environment
//! (after `.env` has been loaded by `main`). Key material is validated here,
//! once, so a running service never holds a key it cannot sign with.
//!
//! ## Environment Variables
//! - `ISSUER_PRIVATE_KEY`: attestation signing key (required)
//! - `CERT_CONTRACT_ADDRESS`: certificate contract; unset runs an in-memory ledger
//! - `RPC_URL`: JSON-RPC endpoint (default: http://127.0.0.1:8545)
//! - `PRIVATE_KEY`: minter wallet for issue/revoke (optional)
//! - `IPFS_URL`: IPFS HTTP API (default: http://localhost:5001)
//! - `PORT`: HTTP port (default: 4000)
//! - `LEDGER_TIMEOUT_SECS`: bound on every ledger call (default: 10)

use crate::error::ConfigError;
use crate::wallet::key_management::{parse_wallet, IssuerKey};
use ::config::{Config, Environment, Source};
use ethers::signers::LocalWallet;
use ethers::types::Address;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_IPFS_URL: &str = "http://localhost:5001";
pub const DEFAULT_PORT: i64 = 4000;
pub const DEFAULT_LEDGER_TIMEOUT_SECS: i64 = 10;

/// Raw settings. Deliberately not `Debug`: it holds private keys.
#[derive(Deserialize, Clone)]
pub struct Settings {
    pub issuer_private_key: String,
    pub cert_contract_address: Option<String>,
    pub rpc_url: String,
    pub private_key: Option<String>,
    pub ipfs_url: String,
    pub port: u16,
    pub ledger_timeout_secs: u64,
}

impl Settings {
    /// Loads settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(Environment::default())
    }

    fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .set_default("rpc_url", DEFAULT_RPC_URL)?
            .set_default("ipfs_url", DEFAULT_IPFS_URL)?
            .set_default("port", DEFAULT_PORT)?
            .set_default("ledger_timeout_secs", DEFAULT_LEDGER_TIMEOUT_SECS)?
            .add_source(source)
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// The attestation signing key. Invalid material is fatal.
    pub fn issuer_key(&self) -> Result<IssuerKey, ConfigError> {
        IssuerKey::from_hex(&self.issuer_private_key).map_err(|source| ConfigError::InvalidKey {
            key: "ISSUER_PRIVATE_KEY",
            source,
        })
    }

    /// Optional wallet used for mint/revoke transactions.
    pub fn minter_wallet(&self) -> Result<Option<LocalWallet>, ConfigError> {
        non_empty(&self.private_key)
            .map(|key| {
                parse_wallet(key).map_err(|source| ConfigError::InvalidKey {
                    key: "PRIVATE_KEY",
                    source,
                })
            })
            .transpose()
    }

    /// Certificate contract address, if a real ledger is configured.
    pub fn contract_address(&self) -> Result<Option<Address>, ConfigError> {
        non_empty(&self.cert_contract_address)
            .map(|value| {
                Address::from_str(value).map_err(|_| ConfigError::InvalidAddress {
                    key: "CERT_CONTRACT_ADDRESS",
                    value: value.to_string(),
                })
            })
            .transpose()
    }

    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_secs(self.ledger_timeout_secs)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
