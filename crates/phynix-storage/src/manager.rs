//! Storage manager: builds the configured provider and resolves signed links.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use phynix_core::config::{ServerConfig, StorageConfig, StorageProviderKind};
use phynix_core::result::AppResult;
use phynix_core::traits::storage::{ByteStream, StorageProvider};

use crate::providers::{LocalStorageProvider, MemoryStorageProvider};
use crate::signed::{BlobClaims, SignedUrlIssuer};

/// Holds the active blob provider and the link signer.
#[derive(Debug, Clone)]
pub struct StorageManager {
    provider: Arc<dyn StorageProvider>,
    signer: Arc<SignedUrlIssuer>,
    url_ttl: Duration,
}

impl StorageManager {
    /// Wrap an already-built provider.
    pub fn new(provider: Arc<dyn StorageProvider>, signer: Arc<SignedUrlIssuer>, url_ttl: Duration) -> Self {
        Self {
            provider,
            signer,
            url_ttl,
        }
    }

    /// Build the provider selected by configuration.
    pub async fn from_config(storage: &StorageConfig, server: &ServerConfig) -> AppResult<Self> {
        let signer = Arc::new(SignedUrlIssuer::new(
            &storage.url_signing_secret,
            &server.public_base_url,
        ));
        let provider: Arc<dyn StorageProvider> = match storage.provider {
            StorageProviderKind::Local => {
                Arc::new(LocalStorageProvider::new(&storage.local_root, signer.clone()).await?)
            }
            StorageProviderKind::Memory => Arc::new(MemoryStorageProvider::new(signer.clone())),
        };
        info!(provider = provider.provider_type(), "Storage provider ready");

        Ok(Self::new(
            provider,
            signer,
            Duration::from_secs(storage.signed_url_ttl_seconds),
        ))
    }

    /// The active provider.
    pub fn provider(&self) -> Arc<dyn StorageProvider> {
        self.provider.clone()
    }

    /// Lifetime of issued download and preview links.
    pub fn url_ttl(&self) -> Duration {
        self.url_ttl
    }

    /// Verify a blob token and open the blob it names.
    pub async fn open_signed(&self, token: &str) -> AppResult<(BlobClaims, ByteStream)> {
        let claims = self.signer.verify(token)?;
        let stream = self.provider.get(&claims.key).await?;
        Ok((claims, stream))
    }
}
