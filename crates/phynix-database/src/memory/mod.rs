//! Process-local implementation of every store trait.
//!
//! All state lives behind one async mutex. Multi-row operations run against a
//! cloned draft of the state and replace it only when every step succeeded,
//! so a failure part-way through leaves nothing behind. The same uniqueness
//! rules as the PostgreSQL schema are enforced on insert.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use phynix_core::error::AppError;
use phynix_core::result::AppResult;
use phynix_core::types::PageRequest;
use phynix_entity::file::{CreateFile, File, FileVersion};
use phynix_entity::folder::{CreateFolder, Folder, rebase_path};
use phynix_entity::notification::{NewNotification, NotificationLog};
use phynix_entity::permission::{Grant, NewGrant, ResourceType, ShareRole};
use phynix_entity::share::{NewShare, Share};
use phynix_entity::user::{CreateUser, User};

use crate::store::{
    FileStore, FolderStore, NotificationStore, ShareStore, SubtreeChange, UserStore,
};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    folders: HashMap<Uuid, Folder>,
    files: HashMap<Uuid, File>,
    versions: Vec<FileVersion>,
    grants: Vec<Grant>,
    shares: Vec<Share>,
    notifications: Vec<NotificationLog>,
}

#[derive(Debug, Default)]
struct Faults {
    /// Fail the next cascade once it has touched this many rows.
    cascade_after_rows: Option<usize>,
    /// Fail the next grant insert.
    grant_insert: bool,
}

#[derive(Debug, Default)]
struct Inner {
    state: MemoryState,
    faults: Faults,
}

/// In-memory metadata store used by the `memory` database provider and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

/// Row counter for a cascade draft that can be told to fail mid-way.
struct Budget {
    limit: Option<usize>,
    touched: usize,
}

impl Budget {
    fn touch(&mut self) -> AppResult<()> {
        self.touched += 1;
        match self.limit {
            Some(limit) if self.touched > limit => Err(AppError::database(format!(
                "Injected failure after {limit} rows"
            ))),
            _ => Ok(()),
        }
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next subtree cascade fail after touching `rows` rows.
    pub async fn fail_next_cascade_after(&self, rows: usize) {
        self.inner.lock().await.faults.cascade_after_rows = Some(rows);
    }

    /// Make the next grant insert fail with a database error.
    pub async fn fail_next_grant_insert(&self) {
        self.inner.lock().await.faults.grant_insert = true;
    }

    /// Overwrite a user's used storage.
    pub async fn set_used_storage(&self, user_id: Uuid, bytes: i64) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        let user = inner
            .state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;
        user.used_storage = bytes;
        Ok(())
    }
}

impl MemoryState {
    fn subtree_ids(&self, root: Uuid) -> Vec<Uuid> {
        let mut ids = Vec::new();
        if !self.folders.contains_key(&root) {
            return ids;
        }
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            ids.push(id);
            queue.extend(
                self.folders
                    .values()
                    .filter(|f| f.parent_id == Some(id))
                    .map(|f| f.id),
            );
        }
        ids
    }

    fn active_sibling_exists(&self, owner_id: Uuid, parent_id: Option<Uuid>, name: &str, except: Uuid) -> bool {
        self.folders.values().any(|f| {
            f.id != except
                && !f.is_deleted
                && f.owner_id == owner_id
                && f.parent_id == parent_id
                && f.name == name
        })
    }

    /// Charge a positive delta only when it fits the owner's quota.
    fn charge_usage(&mut self, owner_id: Uuid, delta: i64) -> AppResult<()> {
        if let Some(user) = self.users.get(&owner_id) {
            if delta > 0 && user.would_exceed_quota(delta) {
                return Err(AppError::validation(format!(
                    "Upload would exceed storage limit of {} bytes",
                    user.max_storage
                )));
            }
        }
        self.adjust_usage(owner_id, delta);
        Ok(())
    }

    fn adjust_usage(&mut self, owner_id: Uuid, delta: i64) {
        if let Some(user) = self.users.get_mut(&owner_id) {
            user.used_storage = (user.used_storage + delta).max(0);
            user.updated_at = Utc::now();
        }
    }

    fn remove_access_records(&mut self, resource_id: Uuid, resource_type: ResourceType) {
        self.grants
            .retain(|g| !(g.resource_id == resource_id && g.resource_type == resource_type));
        self.shares
            .retain(|s| !(s.resource_id == resource_id && s.resource_type == resource_type));
    }

    fn active_share_mut(&mut self, id: Uuid) -> AppResult<&mut Share> {
        self.shares
            .iter_mut()
            .find(|s| s.id == id && s.is_active)
            .ok_or_else(|| AppError::not_found(format!("Share {id} not found or already revoked")))
    }

    fn grant_for_share_mut(&mut self, share: &Share) -> Option<&mut Grant> {
        self.grants.iter_mut().find(|g| {
            g.is_active
                && g.user_id == share.shared_with
                && g.resource_id == share.resource_id
                && g.resource_type == share.resource_type
        })
    }
}

fn sorted_by_name<T>(mut items: Vec<T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    items.sort_by(|a, b| name(a).cmp(name(b)));
    items
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, data: &CreateUser) -> AppResult<User> {
        let mut inner = self.inner.lock().await;
        let email = data.email.trim().to_lowercase();
        if inner.state.users.values().any(|u| u.email == email) {
            return Err(AppError::conflict(format!(
                "User with email '{}' already exists",
                data.email
            )));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            name: data.name.clone(),
            used_storage: 0,
            max_storage: data.max_storage,
            created_at: now,
            updated_at: now,
        };
        inner.state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.inner.lock().await.state.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.trim().to_lowercase();
        let inner = self.inner.lock().await;
        Ok(inner.state.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl FolderStore for MemoryStore {
    async fn find_folder(&self, id: Uuid) -> AppResult<Option<Folder>> {
        Ok(self.inner.lock().await.state.folders.get(&id).cloned())
    }

    async fn find_sibling(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<Folder>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .state
            .folders
            .values()
            .find(|f| {
                !f.is_deleted && f.owner_id == owner_id && f.parent_id == parent_id && f.name == name
            })
            .cloned())
    }

    async fn list_child_folders(&self, parent_id: Uuid) -> AppResult<Vec<Folder>> {
        let inner = self.inner.lock().await;
        let children = inner
            .state
            .folders
            .values()
            .filter(|f| f.parent_id == Some(parent_id) && !f.is_deleted)
            .cloned()
            .collect();
        Ok(sorted_by_name(children, |f: &Folder| &f.name))
    }

    async fn list_root_folders(&self, owner_id: Uuid) -> AppResult<Vec<Folder>> {
        let inner = self.inner.lock().await;
        let roots = inner
            .state
            .folders
            .values()
            .filter(|f| f.owner_id == owner_id && f.parent_id.is_none() && !f.is_deleted)
            .cloned()
            .collect();
        Ok(sorted_by_name(roots, |f: &Folder| &f.name))
    }

    async fn create_folder(&self, data: &CreateFolder) -> AppResult<Folder> {
        let mut inner = self.inner.lock().await;
        if inner
            .state
            .active_sibling_exists(data.owner_id, data.parent_id, &data.name, Uuid::nil())
        {
            return Err(AppError::conflict(format!("Folder '{}' already exists", data.name)));
        }
        let now = Utc::now();
        let folder = Folder {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            parent_id: data.parent_id,
            owner_id: data.owner_id,
            path: data.path.clone(),
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.state.folders.insert(folder.id, folder.clone());
        Ok(folder)
    }

    async fn rename_folder(&self, id: Uuid, new_name: &str, new_path: &str) -> AppResult<Folder> {
        let mut inner = self.inner.lock().await;
        let state = &mut inner.state;
        let current = state
            .folders
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        if state.active_sibling_exists(current.owner_id, current.parent_id, new_name, id) {
            return Err(AppError::conflict(format!("Folder '{new_name}' already exists")));
        }

        let now = Utc::now();
        for folder_id in state.subtree_ids(id) {
            if let Some(folder) = state.folders.get_mut(&folder_id) {
                if let Some(path) = rebase_path(&folder.path, &current.path, new_path) {
                    folder.path = path;
                    folder.updated_at = now;
                }
            }
        }
        let folder = state
            .folders
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        folder.name = new_name.to_string();
        Ok(folder.clone())
    }

    async fn soft_delete_folder_tree(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<SubtreeChange> {
        let mut inner = self.inner.lock().await;
        let mut budget = Budget {
            limit: inner.faults.cascade_after_rows.take(),
            touched: 0,
        };
        let mut draft = inner.state.clone();
        let ids = draft.subtree_ids(id);
        let mut change = SubtreeChange::default();

        for folder_id in &ids {
            if let Some(folder) = draft.folders.get_mut(folder_id) {
                if !folder.is_deleted {
                    budget.touch()?;
                    folder.is_deleted = true;
                    folder.deleted_at = Some(at);
                    folder.updated_at = at;
                    change.folders += 1;
                }
            }
        }

        let in_tree: HashSet<Uuid> = ids.into_iter().collect();
        let mut released = Vec::new();
        for file in draft.files.values_mut() {
            let inside = file.folder_id.is_some_and(|fid| in_tree.contains(&fid));
            if inside && !file.is_deleted {
                budget.touch()?;
                file.is_deleted = true;
                file.deleted_at = Some(at);
                file.updated_at = at;
                released.push((file.owner_id, file.size_bytes));
                change.files += 1;
            }
        }
        for (owner_id, size) in released {
            draft.adjust_usage(owner_id, -size);
        }

        inner.state = draft;
        Ok(change)
    }

    async fn restore_folder_tree(&self, id: Uuid) -> AppResult<SubtreeChange> {
        let mut inner = self.inner.lock().await;
        let mut budget = Budget {
            limit: inner.faults.cascade_after_rows.take(),
            touched: 0,
        };
        let mut draft = inner.state.clone();
        let ids = draft.subtree_ids(id);
        let mut change = SubtreeChange::default();
        let now = Utc::now();

        for folder_id in &ids {
            let Some(folder) = draft.folders.get(folder_id).cloned() else {
                continue;
            };
            if !folder.is_deleted {
                continue;
            }
            if draft.active_sibling_exists(folder.owner_id, folder.parent_id, &folder.name, folder.id) {
                return Err(AppError::conflict(
                    "A folder with the same name already exists at the restore location",
                ));
            }
            budget.touch()?;
            if let Some(folder) = draft.folders.get_mut(folder_id) {
                folder.is_deleted = false;
                folder.deleted_at = None;
                folder.updated_at = now;
                change.folders += 1;
            }
        }

        let in_tree: HashSet<Uuid> = ids.into_iter().collect();
        let mut charged = Vec::new();
        for file in draft.files.values_mut() {
            let inside = file.folder_id.is_some_and(|fid| in_tree.contains(&fid));
            if inside && file.is_deleted {
                budget.touch()?;
                file.is_deleted = false;
                file.deleted_at = None;
                file.updated_at = now;
                charged.push((file.owner_id, file.size_bytes));
                change.files += 1;
            }
        }
        for (owner_id, size) in charged {
            draft.adjust_usage(owner_id, size);
        }

        inner.state = draft;
        Ok(change)
    }

    async fn purge_folder_tree(&self, id: Uuid) -> AppResult<SubtreeChange> {
        let mut inner = self.inner.lock().await;
        let mut budget = Budget {
            limit: inner.faults.cascade_after_rows.take(),
            touched: 0,
        };
        let mut draft = inner.state.clone();
        let ids = draft.subtree_ids(id);
        let in_tree: HashSet<Uuid> = ids.iter().copied().collect();
        let mut change = SubtreeChange::default();

        let file_ids: Vec<Uuid> = draft
            .files
            .values()
            .filter(|f| f.folder_id.is_some_and(|fid| in_tree.contains(&fid)))
            .map(|f| f.id)
            .collect();

        for file_id in file_ids {
            budget.touch()?;
            draft.versions.retain(|v| v.file_id != file_id);
            draft.remove_access_records(file_id, ResourceType::File);
            draft.files.remove(&file_id);
            change.files += 1;
        }
        for folder_id in ids {
            budget.touch()?;
            draft.remove_access_records(folder_id, ResourceType::Folder);
            draft.folders.remove(&folder_id);
            change.folders += 1;
        }

        inner.state = draft;
        Ok(change)
    }

    async fn list_subtree_files(&self, id: Uuid) -> AppResult<Vec<(File, Vec<FileVersion>)>> {
        let inner = self.inner.lock().await;
        let state = &inner.state;
        let in_tree: HashSet<Uuid> = state.subtree_ids(id).into_iter().collect();
        Ok(state
            .files
            .values()
            .filter(|f| f.folder_id.is_some_and(|fid| in_tree.contains(&fid)))
            .map(|f| {
                let versions = state
                    .versions
                    .iter()
                    .filter(|v| v.file_id == f.id)
                    .cloned()
                    .collect();
                (f.clone(), versions)
            })
            .collect())
    }

    async fn list_deleted_folders(
        &self,
        owner_id: Option<Uuid>,
        deleted_before: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<Folder>> {
        let inner = self.inner.lock().await;
        let mut folders: Vec<Folder> = inner
            .state
            .folders
            .values()
            .filter(|f| f.is_deleted)
            .filter(|f| owner_id.is_none_or(|owner| f.owner_id == owner))
            .filter(|f| match (deleted_before, f.deleted_at) {
                (Some(cutoff), Some(at)) => at <= cutoff,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect();
        folders.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        Ok(folders)
    }

    async fn search_folders(
        &self,
        owner_id: Uuid,
        query: &str,
        page: &PageRequest,
    ) -> AppResult<Vec<Folder>> {
        let needle = query.to_lowercase();
        let inner = self.inner.lock().await;
        let matches = inner
            .state
            .folders
            .values()
            .filter(|f| f.owner_id == owner_id && !f.is_deleted)
            .filter(|f| f.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok(page.apply(sorted_by_name(matches, |f: &Folder| &f.name)))
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn create_file(&self, data: &CreateFile) -> AppResult<File> {
        let mut inner = self.inner.lock().await;
        inner.state.charge_usage(data.owner_id, data.size_bytes)?;
        let now = Utc::now();
        let file = File {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            original_name: data.original_name.clone(),
            size_bytes: data.size_bytes,
            mime_type: data.mime_type.clone(),
            folder_id: data.folder_id,
            owner_id: data.owner_id,
            storage_key: data.storage_key.clone(),
            relative_path: data.relative_path.clone(),
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.state.files.insert(file.id, file.clone());
        Ok(file)
    }

    async fn replace_file_content(
        &self,
        id: Uuid,
        storage_key: &str,
        size_bytes: i64,
        mime_type: &str,
    ) -> AppResult<File> {
        let mut inner = self.inner.lock().await;
        let state = &mut inner.state;
        let current = state
            .files
            .get(&id)
            .filter(|f| !f.is_deleted)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        state.charge_usage(current.owner_id, size_bytes - current.size_bytes)?;

        let now = Utc::now();
        state.versions.push(FileVersion {
            id: Uuid::new_v4(),
            file_id: id,
            storage_key: current.storage_key.clone(),
            size_bytes: current.size_bytes,
            created_at: now,
        });

        let file = state
            .files
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        file.storage_key = storage_key.to_string();
        file.size_bytes = size_bytes;
        file.mime_type = mime_type.to_string();
        file.updated_at = now;
        Ok(file.clone())
    }

    async fn find_file(&self, id: Uuid) -> AppResult<Option<File>> {
        Ok(self.inner.lock().await.state.files.get(&id).cloned())
    }

    async fn find_file_by_name(
        &self,
        owner_id: Uuid,
        folder_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<File>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .state
            .files
            .values()
            .filter(|f| {
                !f.is_deleted && f.owner_id == owner_id && f.folder_id == folder_id && f.name == name
            })
            .max_by_key(|f| f.created_at)
            .cloned())
    }

    async fn list_folder_files(&self, folder_id: Uuid) -> AppResult<Vec<File>> {
        let inner = self.inner.lock().await;
        let files = inner
            .state
            .files
            .values()
            .filter(|f| f.folder_id == Some(folder_id) && !f.is_deleted)
            .cloned()
            .collect();
        Ok(sorted_by_name(files, |f: &File| &f.name))
    }

    async fn list_root_files(&self, owner_id: Uuid) -> AppResult<Vec<File>> {
        let inner = self.inner.lock().await;
        let files = inner
            .state
            .files
            .values()
            .filter(|f| f.owner_id == owner_id && f.folder_id.is_none() && !f.is_deleted)
            .cloned()
            .collect();
        Ok(sorted_by_name(files, |f: &File| &f.name))
    }

    async fn rename_file(&self, id: Uuid, new_name: &str) -> AppResult<File> {
        let mut inner = self.inner.lock().await;
        let file = inner
            .state
            .files
            .get_mut(&id)
            .filter(|f| !f.is_deleted)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        file.name = new_name.to_string();
        file.updated_at = Utc::now();
        Ok(file.clone())
    }

    async fn soft_delete_file(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        let state = &mut inner.state;
        let Some(file) = state.files.get_mut(&id).filter(|f| !f.is_deleted) else {
            return Ok(false);
        };
        file.is_deleted = true;
        file.deleted_at = Some(at);
        file.updated_at = at;
        let (owner_id, size) = (file.owner_id, file.size_bytes);
        state.adjust_usage(owner_id, -size);
        Ok(true)
    }

    async fn restore_file(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        let state = &mut inner.state;
        let Some(file) = state.files.get_mut(&id).filter(|f| f.is_deleted) else {
            return Ok(false);
        };
        file.is_deleted = false;
        file.deleted_at = None;
        file.updated_at = Utc::now();
        let (owner_id, size) = (file.owner_id, file.size_bytes);
        state.adjust_usage(owner_id, size);
        Ok(true)
    }

    async fn purge_file(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        let state = &mut inner.state;
        if state.files.remove(&id).is_none() {
            return Ok(false);
        }
        state.versions.retain(|v| v.file_id != id);
        state.remove_access_records(id, ResourceType::File);
        Ok(true)
    }

    async fn list_versions(&self, file_id: Uuid) -> AppResult<Vec<FileVersion>> {
        let inner = self.inner.lock().await;
        let mut versions: Vec<FileVersion> = inner
            .state
            .versions
            .iter()
            .filter(|v| v.file_id == file_id)
            .cloned()
            .collect();
        versions.reverse();
        Ok(versions)
    }

    async fn list_deleted_files(
        &self,
        owner_id: Option<Uuid>,
        deleted_before: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<File>> {
        let inner = self.inner.lock().await;
        let mut files: Vec<File> = inner
            .state
            .files
            .values()
            .filter(|f| f.is_deleted)
            .filter(|f| owner_id.is_none_or(|owner| f.owner_id == owner))
            .filter(|f| match (deleted_before, f.deleted_at) {
                (Some(cutoff), Some(at)) => at <= cutoff,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect();
        files.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        Ok(files)
    }

    async fn search_files(
        &self,
        owner_id: Uuid,
        query: &str,
        page: &PageRequest,
    ) -> AppResult<Vec<File>> {
        let needle = query.to_lowercase();
        let inner = self.inner.lock().await;
        let matches = inner
            .state
            .files
            .values()
            .filter(|f| f.owner_id == owner_id && !f.is_deleted)
            .filter(|f| f.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok(page.apply(sorted_by_name(matches, |f: &File| &f.name)))
    }

    async fn recent_files(
        &self,
        owner_id: Uuid,
        since: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<File>> {
        let inner = self.inner.lock().await;
        let mut files: Vec<File> = inner
            .state
            .files
            .values()
            .filter(|f| f.owner_id == owner_id && !f.is_deleted && f.created_at >= since)
            .cloned()
            .collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        files.truncate(limit as usize);
        Ok(files)
    }
}

#[async_trait]
impl ShareStore for MemoryStore {
    async fn find_active_grant(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> AppResult<Option<Grant>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .state
            .grants
            .iter()
            .find(|g| {
                g.is_active
                    && g.user_id == user_id
                    && g.resource_id == resource_id
                    && g.resource_type == resource_type
            })
            .cloned())
    }

    async fn insert_grant(&self, data: &NewGrant) -> AppResult<Grant> {
        let mut inner = self.inner.lock().await;
        if std::mem::take(&mut inner.faults.grant_insert) {
            return Err(AppError::database("Injected grant insert failure"));
        }
        let duplicate = inner.state.grants.iter().any(|g| {
            g.is_active
                && g.user_id == data.user_id
                && g.resource_id == data.resource_id
                && g.resource_type == data.resource_type
        });
        if duplicate {
            return Err(AppError::conflict("User already has access to this resource"));
        }
        let grant = Grant {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            resource_id: data.resource_id,
            resource_type: data.resource_type,
            role: data.role,
            granted_by: data.granted_by,
            granted_at: Utc::now(),
            is_active: true,
            revoked_at: None,
            revoked_by: None,
        };
        inner.state.grants.push(grant.clone());
        Ok(grant)
    }

    async fn insert_share(&self, data: &NewShare) -> AppResult<Share> {
        let mut inner = self.inner.lock().await;
        let duplicate = inner.state.shares.iter().any(|s| {
            s.is_active
                && s.shared_with == data.shared_with
                && s.resource_id == data.resource_id
                && s.resource_type == data.resource_type
        });
        if duplicate {
            return Err(AppError::conflict("Resource is already shared with this user"));
        }
        let share = Share {
            id: Uuid::new_v4(),
            resource_id: data.resource_id,
            resource_type: data.resource_type,
            shared_with: data.shared_with,
            shared_by: data.shared_by,
            role: data.role,
            shared_at: Utc::now(),
            is_active: true,
            revoked_at: None,
            revoked_by: None,
            updated_at: None,
            updated_by: None,
            shared_with_email: data.shared_with_email.clone(),
            shared_with_name: data.shared_with_name.clone(),
            shared_by_email: data.shared_by_email.clone(),
            shared_by_name: data.shared_by_name.clone(),
        };
        inner.state.shares.push(share.clone());
        Ok(share)
    }

    async fn delete_share(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.state.shares.len();
        inner.state.shares.retain(|s| s.id != id);
        Ok(inner.state.shares.len() < before)
    }

    async fn find_share(&self, id: Uuid) -> AppResult<Option<Share>> {
        let inner = self.inner.lock().await;
        Ok(inner.state.shares.iter().find(|s| s.id == id).cloned())
    }

    async fn list_shares_by(
        &self,
        shared_by: Uuid,
        resource_type: Option<ResourceType>,
    ) -> AppResult<Vec<Share>> {
        let inner = self.inner.lock().await;
        Ok(newest_first(inner.state.shares.iter().filter(|s| {
            s.is_active
                && s.shared_by == shared_by
                && resource_type.is_none_or(|rt| s.resource_type == rt)
        })))
    }

    async fn list_shares_with(
        &self,
        shared_with: Uuid,
        resource_type: Option<ResourceType>,
    ) -> AppResult<Vec<Share>> {
        let inner = self.inner.lock().await;
        Ok(newest_first(inner.state.shares.iter().filter(|s| {
            s.is_active
                && s.shared_with == shared_with
                && resource_type.is_none_or(|rt| s.resource_type == rt)
        })))
    }

    async fn list_resource_shares(
        &self,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> AppResult<Vec<Share>> {
        let inner = self.inner.lock().await;
        Ok(newest_first(inner.state.shares.iter().filter(|s| {
            s.is_active && s.resource_id == resource_id && s.resource_type == resource_type
        })))
    }

    async fn revoke_share(&self, id: Uuid, revoked_by: Uuid, at: DateTime<Utc>) -> AppResult<Share> {
        let mut inner = self.inner.lock().await;
        let state = &mut inner.state;
        let share = state.active_share_mut(id)?;
        share.is_active = false;
        share.revoked_at = Some(at);
        share.revoked_by = Some(revoked_by);
        let share = share.clone();
        if let Some(grant) = state.grant_for_share_mut(&share) {
            grant.is_active = false;
            grant.revoked_at = Some(at);
            grant.revoked_by = Some(revoked_by);
        }
        Ok(share)
    }

    async fn update_share_role(
        &self,
        id: Uuid,
        role: ShareRole,
        updated_by: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<Share> {
        let mut inner = self.inner.lock().await;
        let state = &mut inner.state;
        let share = state.active_share_mut(id)?;
        share.role = role;
        share.updated_at = Some(at);
        share.updated_by = Some(updated_by);
        let share = share.clone();
        if let Some(grant) = state.grant_for_share_mut(&share) {
            grant.role = role;
        }
        Ok(share)
    }
}

fn newest_first<'a>(shares: impl Iterator<Item = &'a Share>) -> Vec<Share> {
    let mut shares: Vec<Share> = shares.cloned().collect();
    shares.sort_by(|a, b| b.shared_at.cmp(&a.shared_at));
    shares
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn record_notification(&self, data: &NewNotification) -> AppResult<NotificationLog> {
        let mut inner = self.inner.lock().await;
        let log = NotificationLog {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            kind: data.kind,
            title: data.title.clone(),
            message: data.message.clone(),
            item_id: data.item_id,
            item_type: data.item_type,
            is_read: false,
            created_at: Utc::now(),
        };
        inner.state.notifications.push(log.clone());
        Ok(log)
    }

    async fn list_notifications(&self, user_id: Uuid, limit: u64) -> AppResult<Vec<NotificationLog>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .state
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use phynix_core::error::ErrorKind;
    use phynix_entity::folder::child_path;

    use super::*;

    async fn user(store: &MemoryStore, email: &str) -> User {
        store
            .create_user(&CreateUser {
                email: email.into(),
                name: String::new(),
                max_storage: 1_000_000,
            })
            .await
            .unwrap()
    }

    async fn folder(store: &MemoryStore, owner: Uuid, parent: Option<&Folder>, name: &str) -> Folder {
        store
            .create_folder(&CreateFolder {
                name: name.into(),
                parent_id: parent.map(|p| p.id),
                owner_id: owner,
                path: child_path(parent.map(|p| p.path.as_str()), name),
            })
            .await
            .unwrap()
    }

    async fn file(store: &MemoryStore, owner: Uuid, folder: &Folder, name: &str, size: i64) -> File {
        store
            .create_file(&CreateFile {
                name: name.into(),
                original_name: name.into(),
                size_bytes: size,
                mime_type: "text/plain".into(),
                folder_id: Some(folder.id),
                owner_id: owner,
                storage_key: format!("{owner}/{name}"),
                relative_path: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_file_writes_charge_quota_under_lock() {
        let store = MemoryStore::new();
        let owner = store
            .create_user(&CreateUser {
                email: "a@example.com".into(),
                name: String::new(),
                max_storage: 1_000,
            })
            .await
            .unwrap();
        let docs = folder(&store, owner.id, None, "Docs").await;
        let kept = file(&store, owner.id, &docs, "a.txt", 600).await;

        let over = CreateFile {
            name: "b.txt".into(),
            original_name: "b.txt".into(),
            size_bytes: 600,
            mime_type: "text/plain".into(),
            folder_id: Some(docs.id),
            owner_id: owner.id,
            storage_key: "k/b".into(),
            relative_path: None,
        };
        let err = store.create_file(&over).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(store.list_folder_files(docs.id).await.unwrap().len(), 1);

        let err = store
            .replace_file_content(kept.id, "k/a2", 1_001, "text/plain")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(store.list_versions(kept.id).await.unwrap().is_empty());
        assert_eq!(store.find_user(owner.id).await.unwrap().unwrap().used_storage, 600);

        // Shrinking always fits.
        store
            .replace_file_content(kept.id, "k/a3", 100, "text/plain")
            .await
            .unwrap();
        assert_eq!(store.find_user(owner.id).await.unwrap().unwrap().used_storage, 100);
    }

    #[tokio::test]
    async fn test_cascade_fault_leaves_no_changes() {
        let store = MemoryStore::new();
        let owner = user(&store, "a@example.com").await;
        let docs = folder(&store, owner.id, None, "Docs").await;
        let sub = folder(&store, owner.id, Some(&docs), "Sub").await;
        let report = file(&store, owner.id, &sub, "report.txt", 400).await;

        store.fail_next_cascade_after(2).await;
        let err = store
            .soft_delete_folder_tree(docs.id, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);

        assert!(store.find_folder(docs.id).await.unwrap().unwrap().is_active());
        assert!(store.find_folder(sub.id).await.unwrap().unwrap().is_active());
        assert!(store.find_file(report.id).await.unwrap().unwrap().is_active());
        assert_eq!(store.find_user(owner.id).await.unwrap().unwrap().used_storage, 400);

        let change = store.soft_delete_folder_tree(docs.id, Utc::now()).await.unwrap();
        assert_eq!(change, SubtreeChange { folders: 2, files: 1 });
    }

    #[tokio::test]
    async fn test_delete_and_restore_move_used_storage() {
        let store = MemoryStore::new();
        let owner = user(&store, "a@example.com").await;
        let docs = folder(&store, owner.id, None, "Docs").await;
        file(&store, owner.id, &docs, "a.txt", 100).await;
        file(&store, owner.id, &docs, "b.txt", 50).await;

        store.soft_delete_folder_tree(docs.id, Utc::now()).await.unwrap();
        assert_eq!(store.find_user(owner.id).await.unwrap().unwrap().used_storage, 0);

        let change = store.restore_folder_tree(docs.id).await.unwrap();
        assert_eq!(change.total(), 3);
        assert_eq!(store.find_user(owner.id).await.unwrap().unwrap().used_storage, 150);
    }

    #[tokio::test]
    async fn test_rename_rebases_descendants_only() {
        let store = MemoryStore::new();
        let owner = user(&store, "a@example.com").await;
        let a = folder(&store, owner.id, None, "A").await;
        let b = folder(&store, owner.id, Some(&a), "B").await;
        let c = folder(&store, owner.id, Some(&b), "C").await;
        let bc = folder(&store, owner.id, Some(&a), "BC").await;

        store.rename_folder(b.id, "X", "A/X").await.unwrap();

        assert_eq!(store.find_folder(b.id).await.unwrap().unwrap().path, "A/X");
        assert_eq!(store.find_folder(c.id).await.unwrap().unwrap().path, "A/X/C");
        assert_eq!(store.find_folder(bc.id).await.unwrap().unwrap().path, "A/BC");
    }

    #[tokio::test]
    async fn test_duplicate_sibling_is_conflict() {
        let store = MemoryStore::new();
        let owner = user(&store, "a@example.com").await;
        let docs = folder(&store, owner.id, None, "Docs").await;
        let err = store
            .create_folder(&CreateFolder {
                name: "Docs".into(),
                parent_id: None,
                owner_id: owner.id,
                path: "Docs".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        store.soft_delete_folder_tree(docs.id, Utc::now()).await.unwrap();
        let replacement = folder(&store, owner.id, None, "Docs").await;
        let err = store.restore_folder_tree(docs.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(store.find_folder(docs.id).await.unwrap().unwrap().is_deleted);
        assert!(store.find_folder(replacement.id).await.unwrap().unwrap().is_active());
    }

    #[tokio::test]
    async fn test_one_active_grant_per_pair() {
        let store = MemoryStore::new();
        let owner = user(&store, "a@example.com").await;
        let other = user(&store, "b@example.com").await;
        let docs = folder(&store, owner.id, None, "Docs").await;
        let grant = NewGrant {
            user_id: other.id,
            resource_id: docs.id,
            resource_type: ResourceType::Folder,
            role: ShareRole::Viewer,
            granted_by: owner.id,
        };
        store.insert_grant(&grant).await.unwrap();
        let err = store.insert_grant(&grant).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_revoke_deactivates_share_and_grant() {
        let store = MemoryStore::new();
        let owner = user(&store, "a@example.com").await;
        let other = user(&store, "b@example.com").await;
        let docs = folder(&store, owner.id, None, "Docs").await;
        store
            .insert_grant(&NewGrant {
                user_id: other.id,
                resource_id: docs.id,
                resource_type: ResourceType::Folder,
                role: ShareRole::Editor,
                granted_by: owner.id,
            })
            .await
            .unwrap();
        let share = store
            .insert_share(&NewShare {
                resource_id: docs.id,
                resource_type: ResourceType::Folder,
                shared_with: other.id,
                shared_by: owner.id,
                role: ShareRole::Editor,
                shared_with_email: other.email.clone(),
                shared_with_name: other.email.clone(),
                shared_by_email: owner.email.clone(),
                shared_by_name: owner.email.clone(),
            })
            .await
            .unwrap();

        let updated = store
            .update_share_role(share.id, ShareRole::Viewer, owner.id, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.role, ShareRole::Viewer);
        let grant = store
            .find_active_grant(other.id, docs.id, ResourceType::Folder)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(grant.role, ShareRole::Viewer);

        store.revoke_share(share.id, owner.id, Utc::now()).await.unwrap();
        assert!(
            store
                .find_active_grant(other.id, docs.id, ResourceType::Folder)
                .await
                .unwrap()
                .is_none()
        );
        let err = store
            .revoke_share(share.id, owner.id, Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_deleted_cutoff_is_inclusive() {
        let store = MemoryStore::new();
        let owner = user(&store, "a@example.com").await;
        let docs = folder(&store, owner.id, None, "Docs").await;
        let at = Utc::now() - Duration::days(10);
        store.soft_delete_folder_tree(docs.id, at).await.unwrap();

        assert_eq!(store.list_deleted_folders(None, Some(at)).await.unwrap().len(), 1);
        let earlier = at - Duration::seconds(1);
        assert!(store.list_deleted_folders(None, Some(earlier)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_removes_versions_and_access() {
        let store = MemoryStore::new();
        let owner = user(&store, "a@example.com").await;
        let other = user(&store, "b@example.com").await;
        let docs = folder(&store, owner.id, None, "Docs").await;
        let report = file(&store, owner.id, &docs, "r.txt", 10).await;
        store
            .replace_file_content(report.id, "k2", 20, "text/plain")
            .await
            .unwrap();
        store
            .insert_grant(&NewGrant {
                user_id: other.id,
                resource_id: report.id,
                resource_type: ResourceType::File,
                role: ShareRole::Viewer,
                granted_by: owner.id,
            })
            .await
            .unwrap();

        store.soft_delete_folder_tree(docs.id, Utc::now()).await.unwrap();
        let change = store.purge_folder_tree(docs.id).await.unwrap();
        assert_eq!(change, SubtreeChange { folders: 1, files: 1 });
        assert!(store.list_versions(report.id).await.unwrap().is_empty());
        assert!(
            store
                .find_active_grant(other.id, report.id, ResourceType::File)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(store.find_user(owner.id).await.unwrap().unwrap().used_storage, 0);
    }
}
