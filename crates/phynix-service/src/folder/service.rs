//! Folder CRUD operations with ACL enforcement.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use phynix_auth::EffectivePermissionResolver;
use phynix_core::error::AppError;
use phynix_core::result::AppResult;
use phynix_database::{FileStore, FolderStore, SubtreeChange};
use phynix_entity::file::File;
use phynix_entity::folder::{CreateFolder, Folder, child_path, validate_name};
use phynix_entity::permission::{ResourceType, ShareRole};

use crate::context::RequestContext;
use crate::validation::{parse_id, validate_request};

/// Manages folder CRUD operations.
#[derive(Clone)]
pub struct FolderService {
    /// Folder store.
    pub(crate) folders: Arc<dyn FolderStore>,
    /// File store.
    pub(crate) files: Arc<dyn FileStore>,
    /// Permission resolver.
    pub(crate) resolver: Arc<EffectivePermissionResolver>,
}

impl std::fmt::Debug for FolderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderService").finish()
    }
}

/// Request to create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFolderRequest {
    /// Folder name.
    #[validate(length(min = 1, max = 255, message = "must be between 1 and 255 characters"))]
    pub name: String,
    /// Parent folder ID (absent or empty for a root folder).
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Request to rename a file or folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RenameRequest {
    /// The new name.
    #[serde(alias = "new_name")]
    #[validate(length(min = 1, max = 255, message = "must be between 1 and 255 characters"))]
    pub name: String,
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(
        folders: Arc<dyn FolderStore>,
        files: Arc<dyn FileStore>,
        resolver: Arc<EffectivePermissionResolver>,
    ) -> Self {
        Self {
            folders,
            files,
            resolver,
        }
    }

    /// Gets a folder the caller can view.
    pub async fn get_folder(&self, ctx: &RequestContext, folder_id: Uuid) -> AppResult<Folder> {
        self.resolver
            .require_permission(ctx.user_id, ResourceType::Folder, folder_id, ShareRole::Viewer)
            .await?;
        self.active_folder(folder_id).await
    }

    /// Creates a new folder, at the root or under a parent the caller can edit.
    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        req: CreateFolderRequest,
    ) -> AppResult<Folder> {
        validate_request(&req)?;
        let name = validate_name(&req.name)?;

        let parent = match req.parent_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(self.writable_parent(ctx, parse_id(raw, "parent folder")?).await?),
            None => None,
        };

        self.create_child(ctx, parent.as_ref(), &name).await
    }

    /// Renames a folder and rewrites the paths of everything beneath it.
    pub async fn rename_folder(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
        req: RenameRequest,
    ) -> AppResult<Folder> {
        validate_request(&req)?;
        let name = validate_name(&req.name)?;

        self.resolver
            .require_permission(ctx.user_id, ResourceType::Folder, folder_id, ShareRole::Editor)
            .await?;
        let folder = self.active_folder(folder_id).await?;
        if folder.name == name {
            return Ok(folder);
        }

        if self
            .folders
            .find_sibling(folder.owner_id, folder.parent_id, &name)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!("Folder '{name}' already exists")));
        }

        let parent_path = folder.path.rsplit_once('/').map(|(prefix, _)| prefix);
        let new_path = child_path(parent_path, &name);
        let renamed = self.folders.rename_folder(folder_id, &name, &new_path).await?;

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            old_path = %folder.path,
            new_path = %renamed.path,
            "Folder renamed"
        );

        Ok(renamed)
    }

    /// Moves a folder and its whole subtree to the trash.
    pub async fn delete_folder(&self, ctx: &RequestContext, folder_id: Uuid) -> AppResult<SubtreeChange> {
        self.resolver
            .require_permission(ctx.user_id, ResourceType::Folder, folder_id, ShareRole::Admin)
            .await?;

        let change = self
            .folders
            .soft_delete_folder_tree(folder_id, Utc::now())
            .await?;

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            folders = change.folders,
            files = change.files,
            "Folder moved to trash"
        );

        Ok(change)
    }

    /// Moves one file of a folder to the trash. Requires editor on the folder.
    pub async fn delete_file_from_folder(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<()> {
        self.resolver
            .require_permission(ctx.user_id, ResourceType::Folder, folder_id, ShareRole::Editor)
            .await?;

        let file = self
            .files
            .find_file(file_id)
            .await?
            .filter(|f| f.is_active() && f.folder_id == Some(folder_id))
            .ok_or_else(|| AppError::not_found("File not found in this folder"))?;

        self.files.soft_delete_file(file.id, Utc::now()).await?;

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            file_id = %file_id,
            "File moved to trash from folder"
        );

        Ok(())
    }

    /// Lists the active files of a folder the caller can view.
    pub async fn list_folder_files(&self, ctx: &RequestContext, folder_id: Uuid) -> AppResult<Vec<File>> {
        self.resolver
            .require_permission(ctx.user_id, ResourceType::Folder, folder_id, ShareRole::Viewer)
            .await?;
        self.files.list_folder_files(folder_id).await
    }

    /// Loads an active parent and checks the caller may create inside it.
    pub(crate) async fn writable_parent(&self, ctx: &RequestContext, parent_id: Uuid) -> AppResult<Folder> {
        let parent = self
            .folders
            .find_folder(parent_id)
            .await?
            .filter(Folder::is_active)
            .ok_or_else(|| AppError::not_found("Parent folder not found"))?;

        self.resolver
            .require_permission(ctx.user_id, ResourceType::Folder, parent_id, ShareRole::Editor)
            .await?;

        Ok(parent)
    }

    /// Inserts a folder owned by the caller. `name` must already be validated.
    pub(crate) async fn create_child(
        &self,
        ctx: &RequestContext,
        parent: Option<&Folder>,
        name: &str,
    ) -> AppResult<Folder> {
        let parent_id = parent.map(|p| p.id);
        if self
            .folders
            .find_sibling(ctx.user_id, parent_id, name)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!("Folder '{name}' already exists")));
        }

        let folder = self
            .folders
            .create_folder(&CreateFolder {
                name: name.to_string(),
                parent_id,
                owner_id: ctx.user_id,
                path: child_path(parent.map(|p| p.path.as_str()), name),
            })
            .await?;

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder.id,
            path = %folder.path,
            "Folder created"
        );

        Ok(folder)
    }

    pub(crate) async fn active_folder(&self, folder_id: Uuid) -> AppResult<Folder> {
        self.folders
            .find_folder(folder_id)
            .await?
            .filter(Folder::is_active)
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))
    }
}
