//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod auth;
pub mod database;
pub mod logging;
pub mod notification;
pub mod storage;
pub mod trash;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::auth::AuthConfig;
pub use self::database::{DatabaseConfig, DatabaseProvider};
pub use self::logging::LoggingConfig;
pub use self::notification::NotificationConfig;
pub use self::storage::{StorageConfig, StorageProviderKind};
pub use self::trash::TrashConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Metadata store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Token and OAuth state settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Blob storage and quota settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Trash retention and auto-purge settings.
    #[serde(default)]
    pub trash: TrashConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Share notification settings.
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `PHYNIX__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PHYNIX")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_limits() {
        let config = AppConfig::default();
        assert_eq!(config.storage.max_file_size_bytes, 104_857_600);
        assert_eq!(config.storage.default_user_quota_bytes, 2_147_483_648);
        assert_eq!(config.trash.retention_days, 30);
        assert_eq!(config.auth.jwt_issuer, "phynixdrive");
        assert_eq!(config.notification.from_email, "noreply@phynixdrive.com");
        assert_eq!(config.database.provider, DatabaseProvider::Postgres);
    }

    #[test]
    fn test_partial_section_falls_back_to_defaults() {
        let raw = r#"{ "server": { "port": 9000 }, "trash": { "retention_days": 7 } }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.trash.retention_days, 7);
        assert!(config.trash.purge_on_start);
    }
}
