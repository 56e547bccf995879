//! In-memory storage provider for the `memory` backend and tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use phynix_core::error::AppError;
use phynix_core::result::AppResult;
use phynix_core::traits::storage::{ByteStream, Disposition, StorageProvider};

use super::normalize_key;
use crate::signed::SignedUrlIssuer;

/// Keeps blobs in a map keyed by normalized path.
#[derive(Debug)]
pub struct MemoryStorageProvider {
    blobs: RwLock<HashMap<String, Bytes>>,
    fail_deletes: AtomicBool,
    fail_reads: AtomicBool,
    signer: Arc<SignedUrlIssuer>,
}

impl MemoryStorageProvider {
    /// Create an empty provider.
    pub fn new(signer: Arc<SignedUrlIssuer>) -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            fail_deletes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            signer,
        }
    }

    /// Number of stored blobs.
    pub async fn blob_count(&self) -> usize {
        self.blobs.read().await.len()
    }

    /// Make every delete fail until turned off again.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Make every read fail until turned off again.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn put(&self, path: &str, data: Bytes) -> AppResult<String> {
        let key = normalize_key(path)?;
        self.blobs.write().await.insert(key.clone(), data);
        Ok(key)
    }

    async fn get(&self, key: &str) -> AppResult<ByteStream> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::storage(format!("Failed to read blob: {key}")));
        }
        let data = self
            .blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Blob not found: {key}")))?;
        Ok(Box::pin(futures::stream::iter([Ok::<_, std::io::Error>(data)])))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::storage(format!("Failed to delete blob: {key}")));
        }
        self.blobs.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.blobs.read().await.contains_key(key))
    }

    async fn signed_url(
        &self,
        key: &str,
        file_name: &str,
        disposition: Disposition,
        ttl: Duration,
    ) -> AppResult<String> {
        self.signer.url(key, file_name, disposition, ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_injected_delete_failure() {
        let provider = MemoryStorageProvider::new(Arc::new(SignedUrlIssuer::new("s", "http://x")));
        let key = provider.put("a/b.txt", Bytes::from("b")).await.unwrap();

        provider.set_fail_deletes(true);
        assert!(provider.delete(&key).await.is_err());
        assert_eq!(provider.blob_count().await, 1);

        provider.set_fail_deletes(false);
        provider.delete(&key).await.unwrap();
        assert_eq!(provider.blob_count().await, 0);
    }

    #[tokio::test]
    async fn test_injected_read_failure() {
        let provider = MemoryStorageProvider::new(Arc::new(SignedUrlIssuer::new("s", "http://x")));
        let key = provider.put("a/b.txt", Bytes::from("b")).await.unwrap();

        provider.set_fail_reads(true);
        let err = provider.get(&key).await.err().unwrap();
        assert!(!err.is_not_found());

        provider.set_fail_reads(false);
        assert!(provider.get(&key).await.is_ok());
    }
}
