//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Token verification and OAuth state configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT verification (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Expected `iss` claim.
    #[serde(default = "default_issuer")]
    pub jwt_issuer: String,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub jwt_access_ttl_minutes: u64,
    /// Lifetime of an issued OAuth state token in seconds.
    #[serde(default = "default_state_ttl")]
    pub oauth_state_ttl_seconds: u64,
    /// How often expired OAuth state tokens are evicted, in seconds.
    #[serde(default = "default_state_eviction")]
    pub oauth_state_eviction_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_issuer: default_issuer(),
            jwt_access_ttl_minutes: default_access_ttl(),
            oauth_state_ttl_seconds: default_state_ttl(),
            oauth_state_eviction_seconds: default_state_eviction(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_issuer() -> String {
    "phynixdrive".to_string()
}

fn default_access_ttl() -> u64 {
    60 * 24
}

fn default_state_ttl() -> u64 {
    600
}

fn default_state_eviction() -> u64 {
    300
}
