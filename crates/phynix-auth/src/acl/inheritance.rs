//! Folder chain walking.
//!
//! Rules, applied at each folder from the start folder up to the root:
//! - the folder owner holds admin;
//! - otherwise an active direct grant decides, whatever its role;
//! - otherwise continue with the parent.
//!
//! The first match wins. Roles found further up are never merged with a
//! nearer one, so a viewer grant on a subfolder caps a user who holds
//! editor on its parent. A deleted or missing ancestor means the resource
//! is not reachable and resolves to not found.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use phynix_core::error::AppError;
use phynix_core::result::AppResult;
use phynix_database::{FolderStore, ShareStore};
use phynix_entity::folder::Folder;
use phynix_entity::permission::{ResourceType, ShareRole};

use super::resolver::PermissionSource;

/// Walks the parent chain looking for the nearest owner or grant.
#[derive(Clone)]
pub struct AclInheritanceResolver {
    folders: Arc<dyn FolderStore>,
    shares: Arc<dyn ShareStore>,
}

impl std::fmt::Debug for AclInheritanceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AclInheritanceResolver").finish()
    }
}

impl AclInheritanceResolver {
    /// Creates a new inheritance resolver.
    pub fn new(folders: Arc<dyn FolderStore>, shares: Arc<dyn ShareStore>) -> Self {
        Self { folders, shares }
    }

    /// Resolve the role `user_id` holds on `start` through itself or its ancestors.
    ///
    /// `start` counts as inherited when `from_file` is set, since the caller
    /// asked about a file inside it.
    pub async fn resolve_chain(
        &self,
        start: Folder,
        user_id: Uuid,
        from_file: bool,
    ) -> AppResult<Option<(ShareRole, PermissionSource)>> {
        let target = start.id;
        let mut visited = HashSet::new();
        let mut current = Some(start);

        while let Some(folder) = current.take() {
            if folder.is_deleted {
                return Err(AppError::not_found(format!("Folder {} not found", folder.id)));
            }
            if !visited.insert(folder.id) {
                return Ok(None);
            }
            let direct = folder.id == target && !from_file;

            if folder.owner_id == user_id {
                let source = if direct {
                    PermissionSource::Owner
                } else {
                    PermissionSource::InheritedOwner { folder_id: folder.id }
                };
                return Ok(Some((ShareRole::Admin, source)));
            }

            if let Some(grant) = self
                .shares
                .find_active_grant(user_id, folder.id, ResourceType::Folder)
                .await?
            {
                let source = if direct {
                    PermissionSource::DirectGrant
                } else {
                    PermissionSource::InheritedGrant { folder_id: folder.id }
                };
                return Ok(Some((grant.role, source)));
            }

            current = match folder.parent_id {
                Some(parent_id) => Some(
                    self.folders
                        .find_folder(parent_id)
                        .await?
                        .ok_or_else(|| AppError::not_found(format!("Folder {parent_id} not found")))?,
                ),
                None => None,
            };
        }

        Ok(None)
    }
}
