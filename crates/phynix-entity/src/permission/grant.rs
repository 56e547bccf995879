//! Grant entity: the authoritative access record behind a share.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{ResourceType, ShareRole};

/// A (user, resource, role) access record.
///
/// Revocation deactivates the row; at most one active grant exists per
/// (user, resource, resource type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Grant {
    /// Unique grant identifier.
    pub id: Uuid,
    /// The user receiving access.
    pub user_id: Uuid,
    /// The resource being accessed.
    pub resource_id: Uuid,
    /// Resource type tag.
    pub resource_type: ResourceType,
    /// Granted role.
    pub role: ShareRole,
    /// The user who granted access.
    pub granted_by: Uuid,
    /// When access was granted.
    pub granted_at: DateTime<Utc>,
    /// Whether the grant is in effect.
    pub is_active: bool,
    /// When the grant was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Who revoked the grant.
    pub revoked_by: Option<Uuid>,
}

/// Data required to create a grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGrant {
    /// The user receiving access.
    pub user_id: Uuid,
    /// The resource being accessed.
    pub resource_id: Uuid,
    /// Resource type tag.
    pub resource_type: ResourceType,
    /// Granted role.
    pub role: ShareRole,
    /// The granting user.
    pub granted_by: Uuid,
}
