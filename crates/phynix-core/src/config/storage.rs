//! Blob storage and quota configuration.

use serde::{Deserialize, Serialize};

/// Which blob backend stores file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageProviderKind {
    /// Local filesystem under `local_root`.
    #[default]
    Local,
    /// Process-local map, for development and tests.
    Memory,
}

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Blob backend selection.
    #[serde(default)]
    pub provider: StorageProviderKind,
    /// Root path for local file storage.
    #[serde(default = "default_local_root")]
    pub local_root: String,
    /// Maximum size of a single uploaded file (default 100 MB).
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Quota assigned to new users (default 2 GB).
    #[serde(default = "default_user_quota")]
    pub default_user_quota_bytes: u64,
    /// Lifetime of signed download and preview links.
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_seconds: u64,
    /// HMAC secret for signed blob links.
    #[serde(default = "default_url_signing_secret")]
    pub url_signing_secret: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProviderKind::default(),
            local_root: default_local_root(),
            max_file_size_bytes: default_max_file_size(),
            default_user_quota_bytes: default_user_quota(),
            signed_url_ttl_seconds: default_signed_url_ttl(),
            url_signing_secret: default_url_signing_secret(),
        }
    }
}

fn default_local_root() -> String {
    "./data/storage".to_string()
}

fn default_max_file_size() -> u64 {
    104_857_600 // 100 MB
}

fn default_user_quota() -> u64 {
    2_147_483_648 // 2 GB
}

fn default_signed_url_ttl() -> u64 {
    3600
}

fn default_url_signing_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}
