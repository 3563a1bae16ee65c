// src/utils/crypto.rs
//! Hashing helpers for attestation signing.
//!
//! Uses Keccak-256, the hash Ethereum tooling expects for personal-message
//! signatures and address derivation.

use ethers::types::H256;
use ethers::utils::{hash_message, hex, keccak256};

/// Computes a Keccak-256 hash of the input data.
///
/// # Example
/// ```ignore
/// let hash = hash_data(b"");
/// assert_eq!(hex::encode(hash), "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");
/// ```
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Frames a 32-byte digest per EIP-191 (`"\x19Ethereum Signed Message:\n32" || digest`)
/// and hashes the result. This is the value actually handed to ECDSA.
pub fn personal_message_hash(digest: &[u8; 32]) -> H256 {
    hash_message(digest)
}

/// Renders bytes as `0x`-prefixed lowercase hex.
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_data_matches_known_keccak_vector() {
        assert_eq!(
            to_prefixed_hex(&hash_data(b"")),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_personal_message_hash_is_domain_separated() {
        let digest = hash_data(b"payload");
        assert_ne!(personal_message_hash(&digest).as_bytes(), &digest[..]);
    }
}
