//! Batch upload with quota enforcement and folder paths.

use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use phynix_core::error::AppError;
use phynix_core::result::AppResult;
use phynix_entity::file::{CreateFile, File, mime_from_name};
use phynix_entity::folder::{Folder, validate_name};

use super::service::FileService;
use crate::context::RequestContext;

/// One file in an upload batch.
#[derive(Debug, Clone)]
pub struct UploadItem {
    /// Name the file is stored under.
    pub file_name: String,
    /// Client-side path such as `Photos/2024/a.png`. Its directory part is
    /// created below the target folder.
    pub relative_path: Option<String>,
    /// File content.
    pub data: Bytes,
}

/// An upload batch.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Folder to upload into; the caller's root when absent.
    pub folder_id: Option<Uuid>,
    /// Files to store.
    pub items: Vec<UploadItem>,
}

/// What one stored item left behind, for rollback.
#[derive(Debug)]
struct Stored {
    file_id: Uuid,
    storage_key: String,
    replaced: bool,
}

impl FileService {
    /// Stores a batch of files.
    ///
    /// Size and quota are checked for the whole batch before any blob is
    /// written. If a later item fails, blobs and records created by earlier
    /// items of the same batch are removed again.
    pub async fn upload(&self, ctx: &RequestContext, req: UploadRequest) -> AppResult<Vec<File>> {
        if req.items.is_empty() {
            return Err(AppError::validation("No files to upload"));
        }

        let mut total: i64 = 0;
        for item in &req.items {
            let size = item.data.len() as u64;
            if size > self.max_file_size {
                return Err(AppError::validation(format!(
                    "File {} exceeds maximum size of {}MB",
                    item.file_name,
                    self.max_file_size / (1024 * 1024)
                )));
            }
            total = total.saturating_add(size as i64);
        }

        let user = self
            .users
            .find_user(ctx.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        if user.would_exceed_quota(total) {
            return Err(AppError::validation(format!(
                "Upload would exceed storage limit of {} bytes",
                user.max_storage
            )));
        }

        let base = match req.folder_id {
            Some(folder_id) => Some(self.folders.writable_parent(ctx, folder_id).await?),
            None => None,
        };

        let mut uploaded = Vec::with_capacity(req.items.len());
        let mut stored = Vec::with_capacity(req.items.len());
        for item in req.items {
            match self.store_item(ctx, base.as_ref(), item).await {
                Ok((file, record)) => {
                    uploaded.push(file);
                    stored.push(record);
                }
                Err(e) => {
                    self.roll_back(&stored).await;
                    return Err(e);
                }
            }
        }

        info!(
            user_id = %ctx.user_id,
            files = uploaded.len(),
            bytes = total,
            "Upload completed"
        );

        Ok(uploaded)
    }

    async fn store_item(
        &self,
        ctx: &RequestContext,
        base: Option<&Folder>,
        item: UploadItem,
    ) -> AppResult<(File, Stored)> {
        let name = validate_name(&item.file_name)?;
        let directory = item
            .relative_path
            .as_deref()
            .and_then(|path| path.trim().rsplit_once('/'))
            .map(|(dir, _)| dir)
            .unwrap_or("");
        let folder = self.folders.get_or_create_folder_path(ctx, base, directory).await?;
        let folder_id = folder.as_ref().map(|f| f.id);

        let size = item.data.len() as i64;
        let mime = mime_from_name(&name);
        let key = self
            .storage
            .put(&format!("{}/{}/{}", ctx.user_id, Uuid::now_v7(), name), item.data)
            .await?;

        let recorded = match self.files.find_file_by_name(ctx.user_id, folder_id, &name).await {
            Ok(Some(existing)) => self
                .files
                .replace_file_content(existing.id, &key, size, mime)
                .await
                .map(|file| (file, true)),
            Ok(None) => self
                .files
                .create_file(&CreateFile {
                    name: name.clone(),
                    original_name: item.file_name.clone(),
                    size_bytes: size,
                    mime_type: mime.to_string(),
                    folder_id,
                    owner_id: ctx.user_id,
                    storage_key: key.clone(),
                    relative_path: item.relative_path.clone(),
                })
                .await
                .map(|file| (file, false)),
            Err(e) => Err(e),
        };

        match recorded {
            Ok((file, replaced)) => {
                let record = Stored {
                    file_id: file.id,
                    storage_key: key,
                    replaced,
                };
                Ok((file, record))
            }
            Err(e) => {
                self.discard_blob(&key).await;
                Err(e)
            }
        }
    }

    async fn roll_back(&self, stored: &[Stored]) {
        for record in stored {
            if record.replaced {
                // The previous content is already kept as a version.
                warn!(file_id = %record.file_id, "Upload failed after replacing file content; keeping new version");
                continue;
            }
            let removed = async {
                self.files.soft_delete_file(record.file_id, chrono::Utc::now()).await?;
                self.files.purge_file(record.file_id).await
            }
            .await;
            if let Err(e) = removed {
                warn!(file_id = %record.file_id, error = %e, "Failed to remove file record during upload rollback");
            }
            self.discard_blob(&record.storage_key).await;
        }
    }

    async fn discard_blob(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            warn!(storage_key = %key, error = %e, "Failed to delete uploaded blob");
        }
    }
}
