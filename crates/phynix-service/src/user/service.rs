//! Maps a verified identity onto a stored user, creating it on first sight.

use std::sync::Arc;

use tracing::info;

use phynix_core::config::StorageConfig;
use phynix_core::error::ErrorKind;
use phynix_core::result::AppResult;
use phynix_database::UserStore;
use phynix_entity::user::{CreateUser, User};

/// Resolves request identities to user rows.
#[derive(Clone)]
pub struct UserService {
    /// User store.
    users: Arc<dyn UserStore>,
    /// Quota given to newly provisioned users.
    default_quota: i64,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService")
            .field("default_quota", &self.default_quota)
            .finish()
    }
}

impl UserService {
    /// Creates a new user service.
    pub fn new(users: Arc<dyn UserStore>, config: &StorageConfig) -> Self {
        Self {
            users,
            default_quota: i64::try_from(config.default_user_quota_bytes).unwrap_or(i64::MAX),
        }
    }

    /// Find the user with this email, provisioning one if it does not exist yet.
    pub async fn resolve_identity(&self, email: &str, name: &str) -> AppResult<User> {
        if let Some(user) = self.users.find_user_by_email(email).await? {
            return Ok(user);
        }

        let created = self
            .users
            .create_user(&CreateUser {
                email: email.to_string(),
                name: name.to_string(),
                max_storage: self.default_quota,
            })
            .await;

        match created {
            Ok(user) => {
                info!(user_id = %user.id, email = %user.email, "User provisioned");
                Ok(user)
            }
            // Lost a race with a concurrent first request for the same email.
            Err(e) if e.kind == ErrorKind::Conflict => self
                .users
                .find_user_by_email(email)
                .await?
                .ok_or(e),
            Err(e) => Err(e),
        }
    }
}
