//! Share creation, revocation, role changes and share reads.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use phynix_auth::EffectivePermissionResolver;
use phynix_core::error::{AppError, ErrorKind};
use phynix_core::result::AppResult;
use phynix_database::{FileStore, FolderStore, ShareStore, UserStore};
use phynix_entity::permission::{NewGrant, ResourceType, ShareRole};
use phynix_entity::share::{NewShare, Share};
use phynix_entity::user::User;

use super::views::{
    BulkShareError, BulkShareResponse, BulkShareSummary, PermissionInfo, ShareResponse,
    SharedResource, SharedResourcesResponse,
};
use crate::context::RequestContext;
use crate::notification::{NotificationService, ShareNotice};
use crate::validation::{parse_id, validate_request};

/// Request to share one resource with one user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShareRequest {
    pub resource_id: String,
    /// `file` or `folder`.
    pub resource_type: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    /// `viewer`, `editor` or `admin`.
    pub role: String,
    /// Also grant the role on every descendant folder.
    #[serde(default)]
    pub inherit_to_children: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkShareResource {
    pub resource_id: String,
    pub resource_type: String,
}

/// Request to share several resources with one user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkShareRequest {
    #[validate(length(min = 1, max = 50, message = "must list between 1 and 50 resources"))]
    pub resources: Vec<BulkShareResource>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub inherit_to_children: bool,
}

/// Request to change the role on a share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateShareRequest {
    pub role: String,
}

/// The parts of a file or folder a share view needs.
#[derive(Debug, Clone)]
struct Resource {
    name: String,
    owner_id: Uuid,
    size: Option<i64>,
    created_at: DateTime<Utc>,
}

/// Manages grants and their share records.
#[derive(Clone)]
pub struct ShareService {
    /// User store.
    users: Arc<dyn UserStore>,
    /// Folder store.
    folders: Arc<dyn FolderStore>,
    /// File store.
    files: Arc<dyn FileStore>,
    /// Grant and share store.
    shares: Arc<dyn ShareStore>,
    /// Permission resolver.
    resolver: Arc<EffectivePermissionResolver>,
    /// Notification service.
    notifications: Arc<NotificationService>,
}

impl std::fmt::Debug for ShareService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareService").finish()
    }
}

impl ShareService {
    /// Creates a new share service.
    pub fn new(
        users: Arc<dyn UserStore>,
        folders: Arc<dyn FolderStore>,
        files: Arc<dyn FileStore>,
        shares: Arc<dyn ShareStore>,
        resolver: Arc<EffectivePermissionResolver>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            users,
            folders,
            files,
            shares,
            resolver,
            notifications,
        }
    }

    /// Shares a resource with the user registered under `email`.
    ///
    /// The caller needs admin on the resource. For a folder with
    /// `inherit_to_children`, the same role is granted on every active
    /// descendant folder as best effort; failures there are logged and
    /// left out of `children_affected`.
    pub async fn share(&self, ctx: &RequestContext, mut req: ShareRequest) -> AppResult<ShareResponse> {
        req.email = req.email.trim().to_lowercase();
        validate_request(&req)?;
        let resource_type: ResourceType = req.resource_type.parse()?;
        let resource_id = parse_id(&req.resource_id, resource_type.as_str())?;
        let role: ShareRole = req.role.parse()?;

        let resource = self.load_resource(resource_type, resource_id).await?;
        self.resolver
            .require_permission(ctx.user_id, resource_type, resource_id, ShareRole::Admin)
            .await?;

        let grantee = self
            .users
            .find_user_by_email(&req.email)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User with email {} not found", req.email)))?;
        if grantee.id == ctx.user_id {
            return Err(AppError::validation("You cannot share a resource with yourself"));
        }
        if grantee.id == resource.owner_id {
            return Err(AppError::validation(
                "The owner already has full access to this resource",
            ));
        }

        let share = self
            .grant_access(ctx, &grantee, resource_type, resource_id, role)
            .await?;

        let children_affected = if resource_type == ResourceType::Folder && req.inherit_to_children {
            Some(self.share_descendants(ctx, &grantee, resource_id, role).await)
        } else {
            None
        };

        self.notifications.notify_share(ShareNotice {
            recipient_id: grantee.id,
            resource_id,
            resource_type,
            resource_name: resource.name.clone(),
            sharer_name: ctx.display_name.clone(),
            role,
        });

        info!(
            user_id = %ctx.user_id,
            share_id = %share.id,
            resource_id = %resource_id,
            resource_type = %resource_type,
            shared_with = %grantee.id,
            role = %role,
            children_affected = children_affected.unwrap_or(0),
            "Resource shared"
        );

        let mut response = ShareResponse::new(&share, resource.name);
        response.children_affected = children_affected;
        Ok(response)
    }

    /// Shares several resources with one user, reporting each outcome.
    pub async fn bulk_share(&self, ctx: &RequestContext, mut req: BulkShareRequest) -> AppResult<BulkShareResponse> {
        req.email = req.email.trim().to_lowercase();
        validate_request(&req)?;
        let email = req.email.clone();
        let total = req.resources.len();

        let mut successful = Vec::new();
        let mut failed = Vec::new();
        for resource in req.resources {
            let single = ShareRequest {
                resource_id: resource.resource_id.clone(),
                resource_type: resource.resource_type.clone(),
                email: email.clone(),
                role: req.role.clone(),
                inherit_to_children: req.inherit_to_children,
            };
            match self.share(ctx, single).await {
                Ok(response) => successful.push(response),
                Err(e) => failed.push(BulkShareError {
                    resource_id: resource.resource_id,
                    resource_type: resource.resource_type,
                    error: e.message,
                }),
            }
        }

        let summary = BulkShareSummary {
            total,
            successful: successful.len(),
            failed: failed.len(),
        };
        Ok(BulkShareResponse {
            successful,
            failed,
            summary,
        })
    }

    /// Deactivates a share and its grant.
    pub async fn revoke(&self, ctx: &RequestContext, share_id: Uuid) -> AppResult<()> {
        let share = self.active_share(share_id).await?;
        self.authorize_change(ctx, &share).await?;

        self.shares.revoke_share(share_id, ctx.user_id, Utc::now()).await?;

        info!(
            user_id = %ctx.user_id,
            share_id = %share_id,
            resource_id = %share.resource_id,
            shared_with = %share.shared_with,
            "Share revoked"
        );
        Ok(())
    }

    /// Changes the role on a share and its grant.
    pub async fn update_role(
        &self,
        ctx: &RequestContext,
        share_id: Uuid,
        req: UpdateShareRequest,
    ) -> AppResult<ShareResponse> {
        let role: ShareRole = req.role.parse()?;
        let share = self.active_share(share_id).await?;
        self.authorize_change(ctx, &share).await?;

        let updated = self
            .shares
            .update_share_role(share_id, role, ctx.user_id, Utc::now())
            .await?;

        info!(
            user_id = %ctx.user_id,
            share_id = %share_id,
            old_role = %share.role,
            new_role = %role,
            "Share role updated"
        );

        let name = self
            .describe_resource(updated.resource_type, updated.resource_id)
            .await?
            .map(|r| r.name)
            .unwrap_or_default();
        Ok(ShareResponse::new(&updated, name))
    }

    /// Active shares the caller created.
    pub async fn shared_by_me(
        &self,
        ctx: &RequestContext,
        resource_type: Option<ResourceType>,
    ) -> AppResult<Vec<ShareResponse>> {
        let shares = self.shares.list_shares_by(ctx.user_id, resource_type).await?;
        let mut views = Vec::with_capacity(shares.len());
        for share in shares {
            if let Some(resource) = self.describe_resource(share.resource_type, share.resource_id).await? {
                views.push(ShareResponse::new(&share, resource.name));
            }
        }
        Ok(views)
    }

    /// Active resources shared with the caller.
    pub async fn shared_with_me(
        &self,
        ctx: &RequestContext,
        resource_type: Option<ResourceType>,
    ) -> AppResult<Vec<SharedResource>> {
        let shares = self.shares.list_shares_with(ctx.user_id, resource_type).await?;
        let mut views = Vec::with_capacity(shares.len());
        for share in shares {
            let Some(resource) = self.describe_resource(share.resource_type, share.resource_id).await? else {
                continue;
            };
            let owner_name = self
                .users
                .find_user(resource.owner_id)
                .await?
                .map(|u| u.display_name().to_string())
                .unwrap_or_default();
            views.push(SharedResource {
                share_id: share.id,
                id: share.resource_id,
                name: resource.name,
                resource_type: share.resource_type,
                size: resource.size,
                created_at: resource.created_at,
                owner_name,
                shared_by: share.shared_by,
                shared_by_name: share.shared_by_name,
                role: share.role,
                shared_at: share.shared_at,
            });
        }
        Ok(views)
    }

    /// Both directions of sharing for the caller.
    pub async fn all_shared(&self, ctx: &RequestContext) -> AppResult<SharedResourcesResponse> {
        let shared_by_me = self.shared_by_me(ctx, None).await?;
        let shared_with_me = self.shared_with_me(ctx, None).await?;
        Ok(SharedResourcesResponse {
            total: shared_by_me.len() + shared_with_me.len(),
            shared_by_me,
            shared_with_me,
        })
    }

    /// Everyone holding a share on a resource. Requires admin.
    pub async fn resource_permissions(
        &self,
        ctx: &RequestContext,
        resource_type: ResourceType,
        resource_id: Uuid,
    ) -> AppResult<Vec<PermissionInfo>> {
        self.resolver
            .require_permission(ctx.user_id, resource_type, resource_id, ShareRole::Admin)
            .await?;
        let resource = self.load_resource(resource_type, resource_id).await?;

        Ok(self
            .shares
            .list_resource_shares(resource_id, resource_type)
            .await?
            .iter()
            .map(|share| PermissionInfo::new(share, &resource.name))
            .collect())
    }

    /// One active share, visible to its sharer, its recipient, and resource admins.
    pub async fn share_details(&self, ctx: &RequestContext, share_id: Uuid) -> AppResult<ShareResponse> {
        let share = self.active_share(share_id).await?;

        if ctx.user_id != share.shared_by && ctx.user_id != share.shared_with {
            self.resolver
                .require_permission(ctx.user_id, share.resource_type, share.resource_id, ShareRole::Admin)
                .await?;
        }

        let resource = self.load_resource(share.resource_type, share.resource_id).await?;
        Ok(ShareResponse::new(&share, resource.name))
    }

    /// Insert the share record, then its grant; undo the record if the grant fails.
    async fn grant_access(
        &self,
        ctx: &RequestContext,
        grantee: &User,
        resource_type: ResourceType,
        resource_id: Uuid,
        role: ShareRole,
    ) -> AppResult<Share> {
        if self
            .shares
            .find_active_grant(grantee.id, resource_id, resource_type)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("User already has access to this resource"));
        }

        let share = self
            .shares
            .insert_share(&NewShare {
                resource_id,
                resource_type,
                shared_with: grantee.id,
                shared_by: ctx.user_id,
                role,
                shared_with_email: grantee.email.clone(),
                shared_with_name: grantee.display_name().to_string(),
                shared_by_email: ctx.email.clone(),
                shared_by_name: ctx.display_name.clone(),
            })
            .await?;

        let granted = self
            .shares
            .insert_grant(&NewGrant {
                user_id: grantee.id,
                resource_id,
                resource_type,
                role,
                granted_by: ctx.user_id,
            })
            .await;

        if let Err(e) = granted {
            if let Err(undo) = self.shares.delete_share(share.id).await {
                warn!(share_id = %share.id, error = %undo, "Failed to remove share record after grant failure");
            }
            return Err(e);
        }

        Ok(share)
    }

    /// Grant `role` on every active descendant folder. Returns how many were granted.
    async fn share_descendants(
        &self,
        ctx: &RequestContext,
        grantee: &User,
        root_id: Uuid,
        role: ShareRole,
    ) -> u64 {
        let mut pending = VecDeque::from([root_id]);
        let mut affected = 0;

        while let Some(parent_id) = pending.pop_front() {
            let children = match self.folders.list_child_folders(parent_id).await {
                Ok(children) => children,
                Err(e) => {
                    warn!(folder_id = %parent_id, error = %e, "Failed to list child folders for share propagation");
                    continue;
                }
            };

            for child in children {
                pending.push_back(child.id);
                if child.owner_id == grantee.id {
                    continue;
                }
                match self
                    .grant_access(ctx, grantee, ResourceType::Folder, child.id, role)
                    .await
                {
                    Ok(_) => affected += 1,
                    Err(e) if e.kind == ErrorKind::Conflict => {}
                    Err(e) => {
                        warn!(folder_id = %child.id, error = %e, "Failed to share child folder");
                    }
                }
            }
        }

        affected
    }

    async fn active_share(&self, share_id: Uuid) -> AppResult<Share> {
        self.shares
            .find_share(share_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| AppError::not_found(format!("Share {share_id} not found or already revoked")))
    }

    /// The original sharer or an admin of the resource may change a share,
    /// never one that targets the resource owner.
    async fn authorize_change(&self, ctx: &RequestContext, share: &Share) -> AppResult<()> {
        if ctx.user_id != share.shared_by {
            let perm = self
                .resolver
                .resolve(ctx.user_id, share.resource_type, share.resource_id, ShareRole::Admin)
                .await?;
            if !perm.granted {
                return Err(AppError::authorization(
                    "Only the original sharer or a resource admin can change this share",
                ));
            }
        }

        if let Some(resource) = self.describe_resource(share.resource_type, share.resource_id).await? {
            if resource.owner_id == share.shared_with {
                return Err(AppError::validation("The owner's access cannot be changed"));
            }
        }
        Ok(())
    }

    async fn load_resource(&self, resource_type: ResourceType, resource_id: Uuid) -> AppResult<Resource> {
        self.describe_resource(resource_type, resource_id)
            .await?
            .ok_or_else(|| {
                let kind = match resource_type {
                    ResourceType::File => "File",
                    ResourceType::Folder => "Folder",
                };
                AppError::not_found(format!("{kind} {resource_id} not found"))
            })
    }

    /// The active resource, or `None` when missing or in the trash.
    async fn describe_resource(
        &self,
        resource_type: ResourceType,
        resource_id: Uuid,
    ) -> AppResult<Option<Resource>> {
        Ok(match resource_type {
            ResourceType::Folder => self
                .folders
                .find_folder(resource_id)
                .await?
                .filter(|f| f.is_active())
                .map(|f| Resource {
                    name: f.name,
                    owner_id: f.owner_id,
                    size: None,
                    created_at: f.created_at,
                }),
            ResourceType::File => self
                .files
                .find_file(resource_id)
                .await?
                .filter(|f| f.is_active())
                .map(|f| Resource {
                    name: f.name,
                    owner_id: f.owner_id,
                    size: Some(f.size_bytes),
                    created_at: f.created_at,
                }),
        })
    }
}
