//! Folder listings and path resolution for uploads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use phynix_core::error::ErrorKind;
use phynix_core::result::AppResult;
use phynix_entity::file::File;
use phynix_entity::folder::{Folder, validate_name};
use phynix_entity::permission::{ResourceType, ShareRole};

use super::service::FolderService;
use crate::context::RequestContext;

/// A folder with the caller's capabilities on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderInfo {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub path: String,
    pub can_edit: bool,
    pub can_share: bool,
}

/// A direct subfolder in a contents view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubfolderEntry {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub path: String,
    pub file_count: u64,
    pub created_at: DateTime<Utc>,
}

/// A file in a contents view, with the endpoints that serve it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub mime_type: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub preview_endpoint: String,
    pub download_endpoint: String,
}

impl From<&File> for FileEntry {
    fn from(file: &File) -> Self {
        Self {
            id: file.id,
            name: file.name.clone(),
            resource_type: ResourceType::File,
            mime_type: file.mime_type.clone(),
            size: file.size_bytes,
            created_at: file.created_at,
            preview_endpoint: format!("/api/files/{}/preview", file.id),
            download_endpoint: format!("/api/files/{}/download", file.id),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContentCounts {
    pub subfolders: u64,
    pub files: u64,
}

/// Everything directly inside one folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderContents {
    pub folder: FolderInfo,
    pub subfolders: Vec<SubfolderEntry>,
    pub files: Vec<FileEntry>,
    pub counts: ContentCounts,
}

/// A root folder with the size of its first level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub file_count: u64,
    pub subfolder_count: u64,
}

impl FolderService {
    /// Folder details with its subfolders and files, sorted by name.
    pub async fn folder_contents(&self, ctx: &RequestContext, folder_id: Uuid) -> AppResult<FolderContents> {
        let perm = self
            .resolver
            .require_permission(ctx.user_id, ResourceType::Folder, folder_id, ShareRole::Viewer)
            .await?;
        let folder = self.active_folder(folder_id).await?;
        let role = perm.role.unwrap_or(ShareRole::Viewer);

        let mut children = self.folders.list_child_folders(folder_id).await?;
        children.sort_by(|a, b| a.name.cmp(&b.name));
        let mut subfolders = Vec::with_capacity(children.len());
        for child in children {
            let file_count = self.files.list_folder_files(child.id).await?.len() as u64;
            subfolders.push(SubfolderEntry {
                id: child.id,
                name: child.name,
                resource_type: ResourceType::Folder,
                path: child.path,
                file_count,
                created_at: child.created_at,
            });
        }

        let files: Vec<FileEntry> = self
            .files
            .list_folder_files(folder_id)
            .await?
            .iter()
            .map(FileEntry::from)
            .collect();

        Ok(FolderContents {
            counts: ContentCounts {
                subfolders: subfolders.len() as u64,
                files: files.len() as u64,
            },
            folder: FolderInfo {
                id: folder.id,
                name: folder.name,
                resource_type: ResourceType::Folder,
                path: folder.path,
                can_edit: role.has_at_least(ShareRole::Editor),
                can_share: role.has_at_least(ShareRole::Admin),
            },
            subfolders,
            files,
        })
    }

    /// The caller's root folders with subfolder and file counts.
    pub async fn list_root_folders(&self, ctx: &RequestContext) -> AppResult<Vec<FolderSummary>> {
        let roots = self.folders.list_root_folders(ctx.user_id).await?;
        let mut summaries = Vec::with_capacity(roots.len());
        for folder in roots {
            let file_count = self.files.list_folder_files(folder.id).await?.len() as u64;
            let subfolder_count = self.folders.list_child_folders(folder.id).await?.len() as u64;
            summaries.push(FolderSummary {
                id: folder.id,
                name: folder.name,
                resource_type: ResourceType::Folder,
                path: folder.path,
                created_at: folder.created_at,
                file_count,
                subfolder_count,
            });
        }
        Ok(summaries)
    }

    /// Walk `path` below `base` (or the caller's root), creating missing segments.
    ///
    /// Returns the deepest folder, or `base` itself when `path` has no segments.
    /// The caller must already hold editor on `base`.
    pub async fn get_or_create_folder_path(
        &self,
        ctx: &RequestContext,
        base: Option<&Folder>,
        path: &str,
    ) -> AppResult<Option<Folder>> {
        let mut current = base.cloned();

        for segment in path.trim_matches('/').split('/').filter(|s| !s.is_empty()) {
            let name = validate_name(segment)?;
            let parent_id = current.as_ref().map(|f| f.id);

            let next = match self.folders.find_sibling(ctx.user_id, parent_id, &name).await? {
                Some(existing) => existing,
                None => match self.create_child(ctx, current.as_ref(), &name).await {
                    Ok(created) => created,
                    Err(e) if e.kind == ErrorKind::Conflict => self
                        .folders
                        .find_sibling(ctx.user_id, parent_id, &name)
                        .await?
                        .ok_or(e)?,
                    Err(e) => return Err(e),
                },
            };
            current = Some(next);
        }

        Ok(current)
    }
}
