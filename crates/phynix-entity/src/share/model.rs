//! Share record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::permission::{ResourceType, ShareRole};

/// Denormalized log entry mirroring a [`Grant`](crate::permission::Grant).
///
/// Email and display names are copied at share time and are never refreshed.
/// They record who the parties were when the share was made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Share {
    /// Unique share identifier.
    pub id: Uuid,
    /// Shared resource.
    pub resource_id: Uuid,
    /// Resource type tag.
    pub resource_type: ResourceType,
    /// Grantee user ID.
    pub shared_with: Uuid,
    /// Granter user ID.
    pub shared_by: Uuid,
    /// Role at the time of the last update.
    pub role: ShareRole,
    /// When the share was created.
    pub shared_at: DateTime<Utc>,
    /// Whether the share is in effect.
    pub is_active: bool,
    /// When the share was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Who revoked the share.
    pub revoked_by: Option<Uuid>,
    /// When the role was last changed.
    pub updated_at: Option<DateTime<Utc>>,
    /// Who last changed the role.
    pub updated_by: Option<Uuid>,
    /// Grantee email at share time.
    pub shared_with_email: String,
    /// Grantee display name at share time.
    pub shared_with_name: String,
    /// Granter email at share time.
    pub shared_by_email: String,
    /// Granter display name at share time.
    pub shared_by_name: String,
}

/// Data required to record a new share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShare {
    /// Shared resource.
    pub resource_id: Uuid,
    /// Resource type tag.
    pub resource_type: ResourceType,
    /// Grantee.
    pub shared_with: Uuid,
    /// Granter.
    pub shared_by: Uuid,
    /// Role.
    pub role: ShareRole,
    /// Grantee email.
    pub shared_with_email: String,
    /// Grantee display name.
    pub shared_with_name: String,
    /// Granter email.
    pub shared_by_email: String,
    /// Granter display name.
    pub shared_by_name: String,
}
