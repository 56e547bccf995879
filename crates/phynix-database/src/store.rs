//! Store traits the services depend on.
//!
//! Two implementations exist: PostgreSQL repositories in
//! [`crate::repositories`] and the process-local [`crate::MemoryStore`].
//! Every method that touches more than one row commits as one unit; callers
//! never observe a half-applied cascade.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use phynix_core::result::AppResult;
use phynix_core::types::PageRequest;
use phynix_entity::file::{CreateFile, File, FileVersion};
use phynix_entity::folder::{CreateFolder, Folder};
use phynix_entity::notification::{NewNotification, NotificationLog};
use phynix_entity::permission::{Grant, NewGrant, ResourceType, ShareRole};
use phynix_entity::share::{NewShare, Share};
use phynix_entity::user::{CreateUser, User};

use crate::memory::MemoryStore;
use crate::repositories::{
    FileRepository, FolderRepository, NotificationRepository, ShareRepository, UserRepository,
};

/// Rows touched by a subtree cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeChange {
    /// Folders changed, including the subtree root.
    pub folders: u64,
    /// Files changed.
    pub files: u64,
}

impl SubtreeChange {
    /// Total number of items changed.
    pub fn total(&self) -> u64 {
        self.folders + self.files
    }
}

/// User lookup and storage accounting.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Register a user.
    async fn create_user(&self, data: &CreateUser) -> AppResult<User>;

    /// Find a user by ID.
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find a user by email, case-insensitively.
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
}

/// Folder rows and subtree cascades.
#[async_trait]
pub trait FolderStore: Send + Sync + 'static {
    /// Find a folder by ID, active or deleted.
    async fn find_folder(&self, id: Uuid) -> AppResult<Option<Folder>>;

    /// Find an active sibling of the same owner with the given name.
    async fn find_sibling(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<Folder>>;

    /// Active direct children of a folder, by name.
    async fn list_child_folders(&self, parent_id: Uuid) -> AppResult<Vec<Folder>>;

    /// Active root folders of an owner, by name.
    async fn list_root_folders(&self, owner_id: Uuid) -> AppResult<Vec<Folder>>;

    /// Insert a folder. A duplicate active sibling name is a conflict.
    async fn create_folder(&self, data: &CreateFolder) -> AppResult<Folder>;

    /// Rename a folder and rewrite the path of every descendant.
    async fn rename_folder(&self, id: Uuid, new_name: &str, new_path: &str) -> AppResult<Folder>;

    /// Soft-delete a folder, its descendant folders, and their files with one timestamp.
    async fn soft_delete_folder_tree(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<SubtreeChange>;

    /// Restore a folder and every deleted folder and file beneath it.
    async fn restore_folder_tree(&self, id: Uuid) -> AppResult<SubtreeChange>;

    /// Permanently remove a folder subtree with its files, versions, grants and shares.
    async fn purge_folder_tree(&self, id: Uuid) -> AppResult<SubtreeChange>;

    /// Every file in the subtree regardless of state, with its versions.
    async fn list_subtree_files(&self, id: Uuid) -> AppResult<Vec<(File, Vec<FileVersion>)>>;

    /// Deleted folders, optionally limited to one owner and to a deletion cutoff.
    async fn list_deleted_folders(
        &self,
        owner_id: Option<Uuid>,
        deleted_before: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<Folder>>;

    /// Case-insensitive name search over an owner's active folders.
    async fn search_folders(
        &self,
        owner_id: Uuid,
        query: &str,
        page: &PageRequest,
    ) -> AppResult<Vec<Folder>>;
}

/// File rows, versions, and single-file lifecycle.
#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    /// Insert a file and add its size to the owner's used storage.
    async fn create_file(&self, data: &CreateFile) -> AppResult<File>;

    /// Point a file at new content, keeping the previous blob as a version.
    async fn replace_file_content(
        &self,
        id: Uuid,
        storage_key: &str,
        size_bytes: i64,
        mime_type: &str,
    ) -> AppResult<File>;

    /// Find a file by ID, active or deleted.
    async fn find_file(&self, id: Uuid) -> AppResult<Option<File>>;

    /// Find an active file of an owner by name within a folder (or the root).
    async fn find_file_by_name(
        &self,
        owner_id: Uuid,
        folder_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<File>>;

    /// Active files in a folder, by name.
    async fn list_folder_files(&self, folder_id: Uuid) -> AppResult<Vec<File>>;

    /// Active root-level files of an owner, by name.
    async fn list_root_files(&self, owner_id: Uuid) -> AppResult<Vec<File>>;

    /// Rename a file.
    async fn rename_file(&self, id: Uuid, new_name: &str) -> AppResult<File>;

    /// Soft-delete one file and release its size from the owner's usage.
    async fn soft_delete_file(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool>;

    /// Restore one file and charge its size back to the owner.
    async fn restore_file(&self, id: Uuid) -> AppResult<bool>;

    /// Permanently remove a file with its versions, grants and shares.
    async fn purge_file(&self, id: Uuid) -> AppResult<bool>;

    /// Prior versions of a file, newest first.
    async fn list_versions(&self, file_id: Uuid) -> AppResult<Vec<FileVersion>>;

    /// Deleted files, optionally limited to one owner and to a deletion cutoff.
    async fn list_deleted_files(
        &self,
        owner_id: Option<Uuid>,
        deleted_before: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<File>>;

    /// Case-insensitive name search over an owner's active files.
    async fn search_files(
        &self,
        owner_id: Uuid,
        query: &str,
        page: &PageRequest,
    ) -> AppResult<Vec<File>>;

    /// An owner's active files created after `since`, newest first.
    async fn recent_files(
        &self,
        owner_id: Uuid,
        since: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<File>>;
}

/// Grants and their mirrored share records.
#[async_trait]
pub trait ShareStore: Send + Sync + 'static {
    /// The active grant for (user, resource), if any.
    async fn find_active_grant(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> AppResult<Option<Grant>>;

    /// Insert a grant. A second active grant for the same pair is a conflict.
    async fn insert_grant(&self, data: &NewGrant) -> AppResult<Grant>;

    /// Insert a share record. A second active share for the same pair is a conflict.
    async fn insert_share(&self, data: &NewShare) -> AppResult<Share>;

    /// Physically delete a share record that never got its grant.
    async fn delete_share(&self, id: Uuid) -> AppResult<bool>;

    /// Find a share by ID.
    async fn find_share(&self, id: Uuid) -> AppResult<Option<Share>>;

    /// Active shares created by a user, newest first.
    async fn list_shares_by(
        &self,
        shared_by: Uuid,
        resource_type: Option<ResourceType>,
    ) -> AppResult<Vec<Share>>;

    /// Active shares granted to a user, newest first.
    async fn list_shares_with(
        &self,
        shared_with: Uuid,
        resource_type: Option<ResourceType>,
    ) -> AppResult<Vec<Share>>;

    /// Active shares on a resource, newest first.
    async fn list_resource_shares(
        &self,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> AppResult<Vec<Share>>;

    /// Deactivate a share and its grant together.
    async fn revoke_share(&self, id: Uuid, revoked_by: Uuid, at: DateTime<Utc>) -> AppResult<Share>;

    /// Change the role on a share and its grant together.
    async fn update_share_role(
        &self,
        id: Uuid,
        role: ShareRole,
        updated_by: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<Share>;
}

/// In-app notification log.
#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
    /// Record a notification.
    async fn record_notification(&self, data: &NewNotification) -> AppResult<NotificationLog>;

    /// A user's notifications, newest first.
    async fn list_notifications(&self, user_id: Uuid, limit: u64) -> AppResult<Vec<NotificationLog>>;
}

/// The full set of stores handed to the services.
#[derive(Clone)]
pub struct Stores {
    /// Users.
    pub users: Arc<dyn UserStore>,
    /// Folders.
    pub folders: Arc<dyn FolderStore>,
    /// Files.
    pub files: Arc<dyn FileStore>,
    /// Grants and shares.
    pub shares: Arc<dyn ShareStore>,
    /// Notifications.
    pub notifications: Arc<dyn NotificationStore>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish()
    }
}

impl Stores {
    /// Stores backed by PostgreSQL repositories sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            folders: Arc::new(FolderRepository::new(pool.clone())),
            files: Arc::new(FileRepository::new(pool.clone())),
            shares: Arc::new(ShareRepository::new(pool.clone())),
            notifications: Arc::new(NotificationRepository::new(pool)),
        }
    }

    /// Stores backed by one shared in-memory state.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            folders: store.clone(),
            files: store.clone(),
            shares: store.clone(),
            notifications: store,
        }
    }
}
