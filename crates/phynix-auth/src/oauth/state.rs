//! Single-use OAuth state tokens.
//!
//! Each login round trip issues a random opaque token that must come back
//! exactly once before it expires. Expired entries are evicted by a
//! background task that runs between [`OAuthStateStore::start`] and
//! [`OAuthStateStore::shutdown`].

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use phynix_core::config::AuthConfig;
use phynix_core::error::AppError;
use phynix_core::result::AppResult;

/// TTL-bound store of pending OAuth states.
#[derive(Debug)]
pub struct OAuthStateStore {
    entries: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
    eviction_interval: Duration,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl OAuthStateStore {
    /// Create a store whose states live for `ttl`.
    pub fn new(ttl: Duration, eviction_interval: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            eviction_interval,
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Create a store from auth configuration.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            Duration::from_secs(config.oauth_state_ttl_seconds),
            Duration::from_secs(config.oauth_state_eviction_seconds.max(1)),
        )
    }

    /// Issue a fresh state token.
    pub async fn issue(&self) -> String {
        let bytes: [u8; 32] = rand::random();
        let token = bytes.iter().fold(String::with_capacity(64), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        });
        self.entries
            .lock()
            .await
            .insert(token.clone(), Instant::now() + self.ttl);
        token
    }

    /// Consume a state token. Unknown, reused, and expired tokens are rejected.
    pub async fn consume(&self, token: &str) -> AppResult<()> {
        let expires_at = self
            .entries
            .lock()
            .await
            .remove(token)
            .ok_or_else(|| AppError::authentication("Unknown or already used OAuth state"))?;
        if Instant::now() >= expires_at {
            return Err(AppError::authentication("OAuth state has expired"));
        }
        Ok(())
    }

    /// Drop expired entries, returning how many were removed.
    pub async fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        before - entries.len()
    }

    /// Number of pending states.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether no states are pending.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Start the eviction task. Calling it twice keeps the first task.
    pub async fn start(self: &Arc<Self>) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return;
        }
        let store = Arc::clone(self);
        let cancel = self.cancel.clone();
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(store.eviction_interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = store.evict_expired().await;
                        if evicted > 0 {
                            debug!(evicted, "Evicted expired OAuth states");
                        }
                    }
                }
            }
        }));
        info!(interval_secs = self.eviction_interval.as_secs(), "OAuth state eviction started");
    }

    /// Stop the eviction task and wait for it to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
        info!("OAuth state eviction stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_is_single_use() {
        let store = OAuthStateStore::new(Duration::from_secs(60), Duration::from_secs(60));
        let token = store.issue().await;
        assert_eq!(token.len(), 64);
        store.consume(&token).await.unwrap();
        assert!(store.consume(&token).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_state_is_rejected() {
        let store = OAuthStateStore::new(Duration::from_secs(10), Duration::from_secs(60));
        let token = store.issue().await;
        tokio::time::advance(Duration::from_secs(11)).await;
        let err = store.consume(&token).await.unwrap_err();
        assert_eq!(err.message, "OAuth state has expired");
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_eviction() {
        let store = Arc::new(OAuthStateStore::new(
            Duration::from_secs(5),
            Duration::from_secs(1),
        ));
        store.start().await;
        store.issue().await;
        assert_eq!(store.len().await, 1);

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(store.is_empty().await);

        store.shutdown().await;
    }
}
