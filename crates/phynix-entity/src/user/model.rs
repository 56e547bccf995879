//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered account. Identity itself comes from the external provider.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Login email, unique.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Bytes used by non-deleted files.
    pub used_storage: i64,
    /// Quota in bytes.
    pub max_storage: i64,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name to show in listings, falling back to the email.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }

    /// Whether adding `additional` bytes would exceed the quota.
    pub fn would_exceed_quota(&self, additional: i64) -> bool {
        self.used_storage.saturating_add(additional) > self.max_storage
    }
}

/// Data required to register a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Quota in bytes.
    pub max_storage: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(used: i64, max: i64) -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            name: String::new(),
            used_storage: used,
            max_storage: max,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_quota_boundary() {
        let u = user(1_999_999_999, 2_000_000_000);
        assert!(!u.would_exceed_quota(1));
        assert!(u.would_exceed_quota(101));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        assert_eq!(user(0, 1).display_name(), "a@example.com");
    }
}
