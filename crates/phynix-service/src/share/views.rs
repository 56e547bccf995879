//! Response shapes for share reads.
//!
//! Names of the sharer and sharee come from the share record and reflect the
//! moment of sharing. Resource names are looked up when the view is built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use phynix_entity::permission::{ResourceType, ShareRole};
use phynix_entity::share::Share;

/// One share as seen by the sharer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResponse {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub resource_type: ResourceType,
    pub resource_name: String,
    pub shared_with: Uuid,
    pub shared_with_name: String,
    pub shared_with_email: String,
    pub role: ShareRole,
    pub shared_by: Uuid,
    pub shared_by_name: String,
    pub shared_at: DateTime<Utc>,
    /// Descendant folders that received the same grant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children_affected: Option<u64>,
}

impl ShareResponse {
    pub(crate) fn new(share: &Share, resource_name: String) -> Self {
        Self {
            id: share.id,
            resource_id: share.resource_id,
            resource_type: share.resource_type,
            resource_name,
            shared_with: share.shared_with,
            shared_with_name: share.shared_with_name.clone(),
            shared_with_email: share.shared_with_email.clone(),
            role: share.role,
            shared_by: share.shared_by,
            shared_by_name: share.shared_by_name.clone(),
            shared_at: share.shared_at,
            children_affected: None,
        }
    }
}

/// A resource someone else shared with the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedResource {
    pub share_id: Uuid,
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Size in bytes; absent for folders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub owner_name: String,
    pub shared_by: Uuid,
    pub shared_by_name: String,
    pub role: ShareRole,
    pub shared_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedResourcesResponse {
    pub shared_by_me: Vec<ShareResponse>,
    pub shared_with_me: Vec<SharedResource>,
    pub total: usize,
}

/// One user's access to a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionInfo {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub resource_type: ResourceType,
    pub resource_name: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub role: ShareRole,
    pub granted_by: Uuid,
    pub granted_by_name: String,
    pub granted_at: DateTime<Utc>,
}

impl PermissionInfo {
    pub(crate) fn new(share: &Share, resource_name: &str) -> Self {
        Self {
            id: share.id,
            resource_id: share.resource_id,
            resource_type: share.resource_type,
            resource_name: resource_name.to_string(),
            user_id: share.shared_with,
            user_name: share.shared_with_name.clone(),
            user_email: share.shared_with_email.clone(),
            role: share.role,
            granted_by: share.shared_by,
            granted_by_name: share.shared_by_name.clone(),
            granted_at: share.shared_at,
        }
    }
}

/// A resource a bulk share could not be applied to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkShareError {
    pub resource_id: String,
    pub resource_type: String,
    pub error: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BulkShareSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Per-resource outcome of a bulk share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkShareResponse {
    pub successful: Vec<ShareResponse>,
    pub failed: Vec<BulkShareError>,
    pub summary: BulkShareSummary,
}
