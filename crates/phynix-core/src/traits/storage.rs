//! Storage provider trait for pluggable blob backends.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// A byte stream type used for reading blob contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// How a signed link asks the client to treat the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// `Content-Disposition: attachment`.
    Attachment,
    /// `Content-Disposition: inline`.
    Inline,
}

/// Trait for blob storage backends.
///
/// The services only ever address blobs by the opaque key returned from
/// [`StorageProvider::put`]. Implementations live in `phynix-storage`.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "memory").
    fn provider_type(&self) -> &str;

    /// Store bytes under the given logical path and return the blob key.
    async fn put(&self, path: &str, data: Bytes) -> AppResult<String>;

    /// Open a blob for streaming reads.
    async fn get(&self, key: &str) -> AppResult<ByteStream>;

    /// Delete a blob. Deleting a missing blob is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether a blob exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Build a time-limited URL for fetching the blob.
    async fn signed_url(
        &self,
        key: &str,
        file_name: &str,
        disposition: Disposition,
        ttl: Duration,
    ) -> AppResult<String>;
}
