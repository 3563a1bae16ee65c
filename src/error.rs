// src/error.rs
//! Error types shared across the attestation service.
//!
//! Per-call failures are always returned as values. Only configuration
//! errors (`ConfigError`, `KeyError`) are allowed to stop the process, and
//! only from `main`.

use std::time::Duration;
use thiserror::Error;

/// Input errors raised while building or signing an attestation payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttestationError {
    #[error("invalid token id: {0}")]
    InvalidTokenId(String),

    #[error("metadata key `{0}` collides with a reserved field")]
    ReservedMetadataKey(String),

    #[error("metadata value under `{0}` contains a fractional number")]
    FractionalMetadataValue(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

/// Malformed issuer or minter key material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("private key is not valid hex: {0}")]
    Hex(String),

    #[error("private key must be 32 bytes, got {0}")]
    Length(usize),

    #[error("private key is not a valid secp256k1 scalar")]
    InvalidScalar,
}

/// Failures of the QR wire codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("QR text is not valid JSON: {0}")]
    NotJson(String),

    #[error("QR record must be a JSON object")]
    NotAnObject,

    #[error("QR record is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("QR record field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("unsupported QR record version {0}")]
    UnsupportedVersion(u64),

    #[error("extension key `{0}` collides with a reserved field")]
    ReservedExtensionKey(String),

    #[error("attestation too large for a QR symbol: {0}")]
    TooLarge(String),

    #[error("failed to render QR image: {0}")]
    Render(String),

    #[error("failed to scan QR image: {0}")]
    Scan(String),
}

/// Failures talking to the certificate ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid ledger endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("contract ABI error: {0}")]
    Abi(String),

    #[error("ledger RPC failed: {0}")]
    Rpc(String),

    #[error("ledger did not answer within {0:?}")]
    Timeout(Duration),

    #[error("ledger rejected the request: {0}")]
    Rejected(String),

    #[error("no minter wallet configured; ledger is read-only")]
    ReadOnly,

    #[error("transaction was dropped before a receipt was produced")]
    MissingReceipt,
}

/// Failures of the content-addressed metadata store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid metadata store endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("metadata store request failed: {0}")]
    Backend(String),

    #[error("metadata serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Startup configuration errors. Fatal by contract.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("`{key}` holds invalid key material: {source}")]
    InvalidKey {
        key: &'static str,
        #[source]
        source: KeyError,
    },

    #[error("`{key}` is not a valid address: {value}")]
    InvalidAddress { key: &'static str, value: String },
}
