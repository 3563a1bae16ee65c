// src/storage/ipfs_client.rs
//! IPFS storage client for certificate metadata documents.
//!
//! Metadata uploads are content addressed: the returned CID is what a
//! certificate token points at. Nothing stored here takes part in
//! attestation signing.
//!
//! # Security Considerations
//! - All stored data is public by default (IPFS is a public network)
//! - Hashes are content-addressable and permanent

use crate::error::StorageError;
use crate::utils::serialization::serialize;
use async_trait::async_trait;
use bytes::BytesMut;
use futures::TryStreamExt;
use ipfs_api_backend_hyper::{IpfsApi, IpfsClient, TryFromUri};
use log::info;
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;

/// Opaque blob store returning content identifiers.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Stores a JSON document and returns its CID.
    async fn store_json(&self, document: &Value) -> Result<String, StorageError>;

    /// Fetches a JSON document previously stored under `cid`.
    async fn retrieve_json(&self, cid: &str) -> Result<Value, StorageError>;
}

/// IPFS HTTP API client.
#[derive(Clone)]
pub struct IpfsStorage {
    /// Shared IPFS client instance
    client: Arc<IpfsClient>,
}

impl IpfsStorage {
    /// Creates a client for the IPFS HTTP API at `api_url`
    /// (e.g. `http://localhost:5001`).
    ///
    /// No connection is made until the first request.
    pub fn new(api_url: &str) -> Result<Self, StorageError> {
        let client =
            IpfsClient::from_str(api_url).map_err(|e| StorageError::InvalidEndpoint(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Stores raw bytes and returns the CID.
    pub async fn store_data(&self, data: Vec<u8>) -> Result<String, StorageError> {
        let response = self
            .client
            .add(Cursor::new(data))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(response.hash)
    }

    /// Retrieves raw bytes by CID.
    pub async fn retrieve_data(&self, cid: &str) -> Result<Vec<u8>, StorageError> {
        let data = self
            .client
            .cat(cid)
            .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(data.to_vec())
    }
}

#[async_trait]
impl MetadataStore for IpfsStorage {
    async fn store_json(&self, document: &Value) -> Result<String, StorageError> {
        let json = serialize(document)?;
        let cid = self.store_data(json.into_bytes()).await?;
        info!("stored metadata document {}", cid);
        Ok(cid)
    }

    async fn retrieve_json(&self, cid: &str) -> Result<Value, StorageError> {
        let bytes = self.retrieve_data(cid).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        assert!(matches!(IpfsStorage::new("::not a uri::"), Err(StorageError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_a_backend_error() {
        let storage = IpfsStorage::new("http://127.0.0.1:1").unwrap();
        let result = storage.store_json(&json!({"name": "Alice"})).await;
        assert!(matches!(result, Err(StorageError::Backend(_))));

        let result = storage.retrieve_json("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG").await;
        assert!(matches!(result, Err(StorageError::Backend(_))));
    }
}
