//! ImageStore trait definition

use async_trait::async_trait;
use bytes::Bytes;

use super::types::StoreError;

/// Trait for image byte stores (local filesystem or an object store)
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Write bytes under a key, replacing any existing object.
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StoreError>;

    /// Read the bytes stored under a key.
    async fn get(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Remove the object under a key. Deleting a missing object is not an
    /// error: deletion is best-effort and only unexpected failures surface.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_ok()
    }
}
