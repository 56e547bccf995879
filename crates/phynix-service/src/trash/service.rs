//! Trash listing, restore and permanent deletion.
//!
//! Items sit in the trash from soft delete until they are restored, purged by
//! their owner, or swept by [`TrashService::auto_purge_expired`] once their
//! retention period has passed. Blob deletion is best effort; metadata
//! changes for a subtree always commit as one unit.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use phynix_core::config::TrashConfig;
use phynix_core::error::AppError;
use phynix_core::result::AppResult;
use phynix_core::traits::storage::StorageProvider;
use phynix_database::{FileStore, FolderStore, SubtreeChange};
use phynix_entity::file::File;
use phynix_entity::folder::Folder;
use phynix_entity::permission::ResourceType;
use phynix_entity::trash::TrashItem;

use crate::context::RequestContext;
use crate::validation::parse_id;

const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 200;

/// Trash listing parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrashQuery {
    /// `file` or `folder`; both when absent.
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

/// One page of the caller's trash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashListing {
    pub items: Vec<TrashItem>,
    pub total: usize,
    pub limit: u64,
    pub offset: u64,
}

/// An item named in a bulk restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreTarget {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
}

/// Outcome of restoring one item of a bulk restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreResult {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RestoreOutcome {
    pub item_id: Uuid,
    pub item_type: ResourceType,
    pub restored: SubtreeChange,
}

/// Result of a retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReport {
    /// Folders removed, including descendants of swept folders.
    pub folders: u64,
    /// Files removed.
    pub files: u64,
    /// Items that could not be purged and were left for the next sweep.
    pub failures: u64,
}

/// Manages the trash.
#[derive(Clone)]
pub struct TrashService {
    /// Folder store.
    folders: Arc<dyn FolderStore>,
    /// File store.
    files: Arc<dyn FileStore>,
    /// Blob storage.
    storage: Arc<dyn StorageProvider>,
    /// How long items stay in the trash.
    retention: Duration,
}

impl std::fmt::Debug for TrashService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrashService")
            .field("retention", &self.retention)
            .finish()
    }
}

impl TrashService {
    /// Creates a new trash service.
    pub fn new(
        folders: Arc<dyn FolderStore>,
        files: Arc<dyn FileStore>,
        storage: Arc<dyn StorageProvider>,
        config: &TrashConfig,
    ) -> Self {
        Self {
            folders,
            files,
            storage,
            retention: Duration::days(config.retention_days),
        }
    }

    /// Lists the caller's trashed items, most recently deleted first.
    pub async fn list(&self, ctx: &RequestContext, query: TrashQuery) -> AppResult<TrashListing> {
        let filter = query
            .item_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<ResourceType>)
            .transpose()?;
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let mut items = Vec::new();
        if filter != Some(ResourceType::File) {
            for folder in self.folders.list_deleted_folders(Some(ctx.user_id), None).await? {
                items.extend(TrashItem::from_folder(&folder, self.retention));
            }
        }
        if filter != Some(ResourceType::Folder) {
            let mut paths: HashMap<Uuid, Option<String>> = HashMap::new();
            for file in self.files.list_deleted_files(Some(ctx.user_id), None).await? {
                let folder_path = match file.folder_id {
                    Some(folder_id) => match paths.get(&folder_id) {
                        Some(path) => path.clone(),
                        None => {
                            let path = self.folders.find_folder(folder_id).await?.map(|f| f.path);
                            paths.insert(folder_id, path.clone());
                            path
                        }
                    },
                    None => None,
                };
                items.extend(TrashItem::from_file(&file, folder_path.as_deref(), self.retention));
            }
        }

        items.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        let total = items.len();
        let items = items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok(TrashListing {
            items,
            total,
            limit,
            offset,
        })
    }

    /// Restores one trashed item. Its parent folder must be active.
    pub async fn restore(
        &self,
        ctx: &RequestContext,
        item_id: Uuid,
        item_type: ResourceType,
    ) -> AppResult<RestoreOutcome> {
        let restored = match item_type {
            ResourceType::Folder => {
                let folder = self.trashed_folder(ctx, item_id).await?;
                self.require_live_parent(folder.parent_id, item_type).await?;
                self.folders.restore_folder_tree(item_id).await?
            }
            ResourceType::File => {
                let file = self.trashed_file(ctx, item_id).await?;
                self.require_live_parent(file.folder_id, item_type).await?;
                let files = u64::from(self.files.restore_file(item_id).await?);
                SubtreeChange { folders: 0, files }
            }
        };

        info!(
            user_id = %ctx.user_id,
            item_id = %item_id,
            item_type = %item_type,
            folders = restored.folders,
            files = restored.files,
            "Item restored from trash"
        );

        Ok(RestoreOutcome {
            item_id,
            item_type,
            restored,
        })
    }

    /// Restores several items, reporting each outcome.
    pub async fn restore_many(&self, ctx: &RequestContext, targets: Vec<RestoreTarget>) -> Vec<RestoreResult> {
        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            let outcome = match target.item_type.parse::<ResourceType>() {
                Err(_) => Err(AppError::validation("Invalid item type")),
                Ok(item_type) => match parse_id(&target.id, item_type.as_str()) {
                    Ok(id) => self.restore(ctx, id, item_type).await.map(|_| ()),
                    Err(e) => Err(e),
                },
            };
            results.push(RestoreResult {
                id: target.id,
                item_type: target.item_type,
                success: outcome.is_ok(),
                error: outcome.err().map(|e| e.message),
            });
        }
        results
    }

    /// Permanently deletes one trashed item and everything beneath it.
    pub async fn purge(
        &self,
        ctx: &RequestContext,
        item_id: Uuid,
        item_type: ResourceType,
    ) -> AppResult<SubtreeChange> {
        let change = match item_type {
            ResourceType::Folder => {
                self.trashed_folder(ctx, item_id).await?;
                self.purge_folder(item_id).await?
            }
            ResourceType::File => {
                let file = self.trashed_file(ctx, item_id).await?;
                self.purge_file(&file).await?
            }
        };

        info!(
            user_id = %ctx.user_id,
            item_id = %item_id,
            item_type = %item_type,
            folders = change.folders,
            files = change.files,
            "Item purged"
        );

        Ok(change)
    }

    /// Permanently deletes everything in the caller's trash. Returns the
    /// number of folders and files removed.
    pub async fn empty_trash(&self, ctx: &RequestContext) -> AppResult<u64> {
        let mut removed = 0;

        for folder in self.folders.list_deleted_folders(Some(ctx.user_id), None).await? {
            // Nested entries are gone once their trashed ancestor is purged.
            if self.folders.find_folder(folder.id).await?.is_none() {
                continue;
            }
            removed += self.purge_folder(folder.id).await?.total();
        }
        for file in self.files.list_deleted_files(Some(ctx.user_id), None).await? {
            if let Some(file) = self.files.find_file(file.id).await? {
                removed += self.purge_file(&file).await?.total();
            }
        }

        info!(user_id = %ctx.user_id, removed, "Trash emptied");
        Ok(removed)
    }

    /// Purges every item, of any owner, deleted at or before `now` minus retention.
    ///
    /// A failing item is logged and counted; the sweep moves on.
    pub async fn auto_purge_expired(&self, now: DateTime<Utc>) -> AppResult<PurgeReport> {
        let cutoff = now - self.retention;
        let mut report = PurgeReport::default();

        for folder in self.folders.list_deleted_folders(None, Some(cutoff)).await? {
            match self.folders.find_folder(folder.id).await {
                Ok(Some(current)) if current.is_deleted => match self.purge_folder(current.id).await {
                    Ok(change) => {
                        report.folders += change.folders;
                        report.files += change.files;
                    }
                    Err(e) => {
                        report.failures += 1;
                        warn!(folder_id = %folder.id, error = %e, "Failed to purge expired folder");
                    }
                },
                Ok(_) => {}
                Err(e) => {
                    report.failures += 1;
                    warn!(folder_id = %folder.id, error = %e, "Failed to load expired folder");
                }
            }
        }

        for file in self.files.list_deleted_files(None, Some(cutoff)).await? {
            match self.files.find_file(file.id).await {
                Ok(Some(current)) if current.is_deleted => match self.purge_file(&current).await {
                    Ok(change) => report.files += change.files,
                    Err(e) => {
                        report.failures += 1;
                        warn!(file_id = %file.id, error = %e, "Failed to purge expired file");
                    }
                },
                Ok(_) => {}
                Err(e) => {
                    report.failures += 1;
                    warn!(file_id = %file.id, error = %e, "Failed to load expired file");
                }
            }
        }

        info!(
            cutoff = %cutoff,
            folders = report.folders,
            files = report.files,
            failures = report.failures,
            "Expired trash purged"
        );

        Ok(report)
    }

    async fn purge_folder(&self, folder_id: Uuid) -> AppResult<SubtreeChange> {
        let keys: Vec<String> = self
            .folders
            .list_subtree_files(folder_id)
            .await?
            .into_iter()
            .flat_map(|(file, versions)| {
                std::iter::once(file.storage_key).chain(versions.into_iter().map(|v| v.storage_key))
            })
            .collect();
        self.delete_blobs(&keys).await;
        self.folders.purge_folder_tree(folder_id).await
    }

    async fn purge_file(&self, file: &File) -> AppResult<SubtreeChange> {
        let mut keys = vec![file.storage_key.clone()];
        keys.extend(
            self.files
                .list_versions(file.id)
                .await?
                .into_iter()
                .map(|v| v.storage_key),
        );
        self.delete_blobs(&keys).await;
        let removed = self.files.purge_file(file.id).await?;
        Ok(SubtreeChange {
            folders: 0,
            files: u64::from(removed),
        })
    }

    async fn delete_blobs(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.storage.delete(key).await {
                warn!(storage_key = %key, error = %e, "Failed to delete blob during purge");
            }
        }
    }

    async fn trashed_folder(&self, ctx: &RequestContext, folder_id: Uuid) -> AppResult<Folder> {
        self.folders
            .find_folder(folder_id)
            .await?
            .filter(|f| f.is_deleted && f.owner_id == ctx.user_id)
            .ok_or_else(|| AppError::not_found("Item not found in trash"))
    }

    async fn trashed_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<File> {
        self.files
            .find_file(file_id)
            .await?
            .filter(|f| f.is_deleted && f.owner_id == ctx.user_id)
            .ok_or_else(|| AppError::not_found("Item not found in trash"))
    }

    async fn require_live_parent(&self, parent_id: Option<Uuid>, item_type: ResourceType) -> AppResult<()> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };
        match self.folders.find_folder(parent_id).await? {
            Some(parent) if parent.is_active() => Ok(()),
            Some(parent) => Err(AppError::conflict(format!(
                "Cannot restore {item_type}: parent folder '{}' is in the trash. Restore it first",
                parent.name
            ))),
            None => Err(AppError::conflict(format!(
                "Cannot restore {item_type}: parent folder no longer exists"
            ))),
        }
    }
}
