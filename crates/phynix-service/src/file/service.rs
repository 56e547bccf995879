//! File metadata, signed links, rename, delete and versions.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use phynix_auth::EffectivePermissionResolver;
use phynix_core::config::StorageConfig;
use phynix_core::error::AppError;
use phynix_core::result::AppResult;
use phynix_core::traits::storage::{Disposition, StorageProvider};
use phynix_database::{FileStore, UserStore};
use phynix_entity::file::{File, FileVersion, is_previewable};
use phynix_entity::folder::validate_name;
use phynix_entity::permission::{ResourceType, ShareRole};

use crate::context::RequestContext;
use crate::folder::{FolderService, RenameRequest};
use crate::validation::validate_request;

/// A short-lived link to file content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLink {
    pub url: String,
    pub file_name: String,
    pub disposition: Disposition,
    pub expires_at: DateTime<Utc>,
}

/// Manages files and their content.
#[derive(Clone)]
pub struct FileService {
    /// File store.
    pub(crate) files: Arc<dyn FileStore>,
    /// User store, for quota checks.
    pub(crate) users: Arc<dyn UserStore>,
    /// Folder service, for upload paths and folder listings.
    pub(crate) folders: Arc<FolderService>,
    /// Blob storage.
    pub(crate) storage: Arc<dyn StorageProvider>,
    /// Permission resolver.
    pub(crate) resolver: Arc<EffectivePermissionResolver>,
    /// Largest accepted single file.
    pub(crate) max_file_size: u64,
    /// Lifetime of download and preview links.
    url_ttl: Duration,
}

impl std::fmt::Debug for FileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileService")
            .field("max_file_size", &self.max_file_size)
            .field("url_ttl", &self.url_ttl)
            .finish()
    }
}

impl FileService {
    /// Creates a new file service.
    pub fn new(
        files: Arc<dyn FileStore>,
        users: Arc<dyn UserStore>,
        folders: Arc<FolderService>,
        storage: Arc<dyn StorageProvider>,
        resolver: Arc<EffectivePermissionResolver>,
        config: &StorageConfig,
    ) -> Self {
        Self {
            files,
            users,
            folders,
            storage,
            resolver,
            max_file_size: config.max_file_size_bytes,
            url_ttl: Duration::from_secs(config.signed_url_ttl_seconds),
        }
    }

    /// Lists the caller's root files, or the files of a folder they can view.
    pub async fn list_files(&self, ctx: &RequestContext, folder_id: Option<Uuid>) -> AppResult<Vec<File>> {
        match folder_id {
            Some(folder_id) => self.folders.list_folder_files(ctx, folder_id).await,
            None => self.files.list_root_files(ctx.user_id).await,
        }
    }

    /// Gets file metadata.
    pub async fn get_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<File> {
        self.authorized_file(ctx, file_id, ShareRole::Viewer).await
    }

    /// A link that downloads the file as an attachment.
    pub async fn download_link(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<FileLink> {
        let file = self.authorized_file(ctx, file_id, ShareRole::Viewer).await?;
        self.link(&file, Disposition::Attachment).await
    }

    /// A link that renders the file inline. Only previewable types qualify.
    pub async fn preview_link(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<FileLink> {
        let file = self.authorized_file(ctx, file_id, ShareRole::Viewer).await?;
        if !is_previewable(&file.mime_type) {
            return Err(AppError::validation("File type not previewable"));
        }
        self.link(&file, Disposition::Inline).await
    }

    /// Renames a file within its folder.
    pub async fn rename_file(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        req: RenameRequest,
    ) -> AppResult<File> {
        validate_request(&req)?;
        let name = validate_name(&req.name)?;
        let file = self.authorized_file(ctx, file_id, ShareRole::Editor).await?;
        if file.name == name {
            return Ok(file);
        }

        if self
            .files
            .find_file_by_name(file.owner_id, file.folder_id, &name)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!("File '{name}' already exists")));
        }

        let renamed = self.files.rename_file(file_id, &name).await?;
        info!(user_id = %ctx.user_id, file_id = %file_id, name = %renamed.name, "File renamed");
        Ok(renamed)
    }

    /// Moves a file to the trash. Requires admin.
    pub async fn delete_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<()> {
        let file = self.authorized_file(ctx, file_id, ShareRole::Admin).await?;
        self.files.soft_delete_file(file.id, Utc::now()).await?;
        info!(
            user_id = %ctx.user_id,
            file_id = %file_id,
            size = file.size_bytes,
            "File moved to trash"
        );
        Ok(())
    }

    /// Prior versions of a file, newest first.
    pub async fn list_versions(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<Vec<FileVersion>> {
        self.authorized_file(ctx, file_id, ShareRole::Viewer).await?;
        self.files.list_versions(file_id).await
    }

    async fn authorized_file(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        required: ShareRole,
    ) -> AppResult<File> {
        self.resolver
            .require_permission(ctx.user_id, ResourceType::File, file_id, required)
            .await?;
        self.files
            .find_file(file_id)
            .await?
            .filter(File::is_active)
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
    }

    async fn link(&self, file: &File, disposition: Disposition) -> AppResult<FileLink> {
        let url = self
            .storage
            .signed_url(&file.storage_key, &file.name, disposition, self.url_ttl)
            .await?;
        let ttl = chrono::Duration::from_std(self.url_ttl)
            .map_err(|e| AppError::internal(format!("Invalid link lifetime: {e}")))?;
        Ok(FileLink {
            url,
            file_name: file.name.clone(),
            disposition,
            expires_at: Utc::now() + ttl,
        })
    }
}
