//! Effective permission resolver.
//!
//! Resolution order for files:
//! 1. File owner: full access.
//! 2. File inside a folder: the folder chain decides, see [`super::inheritance`].
//! 3. Root file: a direct grant on the file.
//! 4. Denied.
//!
//! A soft-deleted or missing target is reported as not found rather than
//! denied, so callers can tell the two apart.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use phynix_core::error::AppError;
use phynix_core::result::AppResult;
use phynix_database::{FileStore, FolderStore, ShareStore};
use phynix_entity::permission::{ResourceType, ShareRole};

use super::inheritance::AclInheritanceResolver;

/// Result of resolving effective permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermission {
    /// Whether access is granted.
    pub granted: bool,
    /// The role the user holds, if any.
    pub role: Option<ShareRole>,
    /// Where the role came from.
    pub source: PermissionSource,
}

/// Where a permission was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PermissionSource {
    /// User owns the resource.
    Owner,
    /// User owns an enclosing folder.
    InheritedOwner {
        /// The owned folder.
        folder_id: Uuid,
    },
    /// Grant on the resource itself.
    DirectGrant,
    /// Grant on an enclosing folder.
    InheritedGrant {
        /// The folder carrying the grant.
        folder_id: Uuid,
    },
    /// No applicable permission found.
    Denied,
}

/// Resolves a user's role on a file or folder.
#[derive(Clone)]
pub struct EffectivePermissionResolver {
    files: Arc<dyn FileStore>,
    folders: Arc<dyn FolderStore>,
    shares: Arc<dyn ShareStore>,
    inheritance: AclInheritanceResolver,
}

impl std::fmt::Debug for EffectivePermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectivePermissionResolver").finish()
    }
}

impl EffectivePermissionResolver {
    /// Creates a new effective permission resolver.
    pub fn new(
        files: Arc<dyn FileStore>,
        folders: Arc<dyn FolderStore>,
        shares: Arc<dyn ShareStore>,
    ) -> Self {
        let inheritance = AclInheritanceResolver::new(folders.clone(), shares.clone());
        Self {
            files,
            folders,
            shares,
            inheritance,
        }
    }

    /// Whether the user holds at least `required` on the resource.
    ///
    /// `resource_id` is the raw identifier from the caller; a malformed value
    /// is a validation error.
    pub async fn has_permission(
        &self,
        user_id: Uuid,
        resource_id: &str,
        resource_type: ResourceType,
        required: ShareRole,
    ) -> AppResult<bool> {
        let resource_id = Uuid::parse_str(resource_id.trim())
            .map_err(|_| AppError::validation(format!("Invalid {resource_type} ID: {resource_id}")))?;
        Ok(self
            .resolve(user_id, resource_type, resource_id, required)
            .await?
            .granted)
    }

    /// Resolve the user's effective permission on a resource.
    pub async fn resolve(
        &self,
        user_id: Uuid,
        resource_type: ResourceType,
        resource_id: Uuid,
        required: ShareRole,
    ) -> AppResult<EffectivePermission> {
        let found = match resource_type {
            ResourceType::File => self.resolve_file(user_id, resource_id).await?,
            ResourceType::Folder => {
                let folder = self
                    .folders
                    .find_folder(resource_id)
                    .await?
                    .filter(|f| f.is_active())
                    .ok_or_else(|| AppError::not_found(format!("Folder {resource_id} not found")))?;
                self.inheritance.resolve_chain(folder, user_id, false).await?
            }
        };

        Ok(match found {
            Some((role, source)) => EffectivePermission {
                granted: role.has_at_least(required),
                role: Some(role),
                source,
            },
            None => EffectivePermission {
                granted: false,
                role: None,
                source: PermissionSource::Denied,
            },
        })
    }

    async fn resolve_file(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<Option<(ShareRole, PermissionSource)>> {
        let file = self
            .files
            .find_file(file_id)
            .await?
            .filter(|f| f.is_active())
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;

        if file.owner_id == user_id {
            return Ok(Some((ShareRole::Admin, PermissionSource::Owner)));
        }

        // A file inside a folder follows the folder chain only; file grants
        // decide for root files.
        match file.folder_id {
            Some(folder_id) => {
                let folder = self
                    .folders
                    .find_folder(folder_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;
                self.inheritance.resolve_chain(folder, user_id, true).await
            }
            None => Ok(self
                .shares
                .find_active_grant(user_id, file_id, ResourceType::File)
                .await?
                .map(|grant| (grant.role, PermissionSource::DirectGrant))),
        }
    }

    /// Fail with an authorization error unless the user holds at least `required`.
    pub async fn require_permission(
        &self,
        user_id: Uuid,
        resource_type: ResourceType,
        resource_id: Uuid,
        required: ShareRole,
    ) -> AppResult<EffectivePermission> {
        let result = self
            .resolve(user_id, resource_type, resource_id, required)
            .await?;

        if !result.granted {
            return Err(AppError::authorization(format!(
                "You need {required} access to this {resource_type}"
            )));
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use phynix_core::error::ErrorKind;
    use phynix_database::{MemoryStore, Stores};
    use phynix_entity::file::CreateFile;
    use phynix_entity::folder::{CreateFolder, Folder, child_path};
    use phynix_entity::permission::NewGrant;
    use phynix_entity::user::CreateUser;

    use super::*;

    struct Fixture {
        stores: Stores,
        resolver: EffectivePermissionResolver,
    }

    fn fixture() -> Fixture {
        let stores = Stores::memory(Arc::new(MemoryStore::new()));
        let resolver = EffectivePermissionResolver::new(
            stores.files.clone(),
            stores.folders.clone(),
            stores.shares.clone(),
        );
        Fixture { stores, resolver }
    }

    impl Fixture {
        async fn user(&self, email: &str) -> Uuid {
            self.stores
                .users
                .create_user(&CreateUser {
                    email: email.into(),
                    name: String::new(),
                    max_storage: 1_000,
                })
                .await
                .unwrap()
                .id
        }

        async fn folder(&self, owner: Uuid, parent: Option<&Folder>, name: &str) -> Folder {
            self.stores
                .folders
                .create_folder(&CreateFolder {
                    name: name.into(),
                    parent_id: parent.map(|p| p.id),
                    owner_id: owner,
                    path: child_path(parent.map(|p| p.path.as_str()), name),
                })
                .await
                .unwrap()
        }

        async fn file(&self, owner: Uuid, folder: Option<&Folder>) -> Uuid {
            self.stores
                .files
                .create_file(&CreateFile {
                    name: "a.txt".into(),
                    original_name: "a.txt".into(),
                    size_bytes: 1,
                    mime_type: "text/plain".into(),
                    folder_id: folder.map(|f| f.id),
                    owner_id: owner,
                    storage_key: "k".into(),
                    relative_path: None,
                })
                .await
                .unwrap()
                .id
        }

        async fn grant(&self, user: Uuid, id: Uuid, rt: ResourceType, role: ShareRole, by: Uuid) {
            self.stores
                .shares
                .insert_grant(&NewGrant {
                    user_id: user,
                    resource_id: id,
                    resource_type: rt,
                    role,
                    granted_by: by,
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_owner_has_admin_without_grants() {
        let fx = fixture();
        let owner = fx.user("a@x.io").await;
        let docs = fx.folder(owner, None, "Docs").await;

        let perm = fx
            .resolver
            .resolve(owner, ResourceType::Folder, docs.id, ShareRole::Admin)
            .await
            .unwrap();
        assert!(perm.granted);
        assert_eq!(perm.source, PermissionSource::Owner);
    }

    #[tokio::test]
    async fn test_grant_inherits_through_ancestors() {
        let fx = fixture();
        let owner = fx.user("a@x.io").await;
        let reader = fx.user("b@x.io").await;
        let docs = fx.folder(owner, None, "Docs").await;
        let sub = fx.folder(owner, Some(&docs), "Sub").await;
        let deep = fx.folder(owner, Some(&sub), "Deep").await;
        let file = fx.file(owner, Some(&deep)).await;
        fx.grant(reader, docs.id, ResourceType::Folder, ShareRole::Editor, owner)
            .await;

        let perm = fx
            .resolver
            .resolve(reader, ResourceType::Folder, deep.id, ShareRole::Editor)
            .await
            .unwrap();
        assert!(perm.granted);
        assert_eq!(perm.source, PermissionSource::InheritedGrant { folder_id: docs.id });

        assert!(
            fx.resolver
                .has_permission(reader, &file.to_string(), ResourceType::File, ShareRole::Editor)
                .await
                .unwrap()
        );
        assert!(
            !fx.resolver
                .has_permission(reader, &file.to_string(), ResourceType::File, ShareRole::Admin)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_nearest_grant_wins_over_ancestor() {
        let fx = fixture();
        let owner = fx.user("a@x.io").await;
        let user = fx.user("b@x.io").await;
        let docs = fx.folder(owner, None, "Docs").await;
        let sub = fx.folder(owner, Some(&docs), "Sub").await;
        fx.grant(user, docs.id, ResourceType::Folder, ShareRole::Editor, owner)
            .await;
        fx.grant(user, sub.id, ResourceType::Folder, ShareRole::Viewer, owner)
            .await;

        let perm = fx
            .resolver
            .resolve(user, ResourceType::Folder, sub.id, ShareRole::Editor)
            .await
            .unwrap();
        assert!(!perm.granted);
        assert_eq!(perm.role, Some(ShareRole::Viewer));
        assert_eq!(perm.source, PermissionSource::DirectGrant);
    }

    #[tokio::test]
    async fn test_root_file_without_grant_is_denied() {
        let fx = fixture();
        let owner = fx.user("a@x.io").await;
        let other = fx.user("b@x.io").await;
        let file = fx.file(owner, None).await;

        let perm = fx
            .resolver
            .resolve(other, ResourceType::File, file, ShareRole::Viewer)
            .await
            .unwrap();
        assert!(!perm.granted);
        assert_eq!(perm.source, PermissionSource::Denied);

        let err = fx
            .resolver
            .require_permission(other, ResourceType::File, file, ShareRole::Viewer)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_deleted_target_is_not_found() {
        let fx = fixture();
        let owner = fx.user("a@x.io").await;
        let docs = fx.folder(owner, None, "Docs").await;
        fx.stores
            .folders
            .soft_delete_folder_tree(docs.id, Utc::now())
            .await
            .unwrap();

        let err = fx
            .resolver
            .resolve(owner, ResourceType::Folder, docs.id, ShareRole::Viewer)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_file_in_folder_follows_folder_chain_over_file_grant() {
        let fx = fixture();
        let alice = fx.user("a@x.io").await;
        let bob = fx.user("b@x.io").await;
        let docs = fx.folder(alice, None, "Docs").await;
        let file = fx.file(alice, Some(&docs)).await;
        fx.grant(bob, docs.id, ResourceType::Folder, ShareRole::Editor, alice)
            .await;
        fx.grant(bob, file, ResourceType::File, ShareRole::Viewer, alice)
            .await;

        assert!(
            fx.resolver
                .has_permission(bob, &file.to_string(), ResourceType::File, ShareRole::Editor)
                .await
                .unwrap()
        );
        let perm = fx
            .resolver
            .resolve(bob, ResourceType::File, file, ShareRole::Editor)
            .await
            .unwrap();
        assert_eq!(perm.role, Some(ShareRole::Editor));
        assert_eq!(perm.source, PermissionSource::InheritedGrant { folder_id: docs.id });
    }

    #[tokio::test]
    async fn test_file_grant_ignored_inside_unreachable_folder() {
        let fx = fixture();
        let alice = fx.user("a@x.io").await;
        let bob = fx.user("b@x.io").await;
        let private = fx.folder(alice, None, "Private").await;
        let file = fx.file(alice, Some(&private)).await;
        fx.grant(bob, file, ResourceType::File, ShareRole::Editor, alice)
            .await;

        let perm = fx
            .resolver
            .resolve(bob, ResourceType::File, file, ShareRole::Viewer)
            .await
            .unwrap();
        assert!(!perm.granted);
        assert_eq!(perm.source, PermissionSource::Denied);
    }

    #[tokio::test]
    async fn test_root_file_uses_direct_grant() {
        let fx = fixture();
        let alice = fx.user("a@x.io").await;
        let bob = fx.user("b@x.io").await;
        let file = fx.file(alice, None).await;
        fx.grant(bob, file, ResourceType::File, ShareRole::Viewer, alice)
            .await;

        let perm = fx
            .resolver
            .resolve(bob, ResourceType::File, file, ShareRole::Viewer)
            .await
            .unwrap();
        assert!(perm.granted);
        assert_eq!(perm.source, PermissionSource::DirectGrant);
    }

    #[tokio::test]
    async fn test_deleted_ancestor_is_not_found() {
        let fx = fixture();
        let alice = fx.user("a@x.io").await;
        let bob = fx.user("b@x.io").await;
        let docs = fx.folder(alice, None, "Docs").await;
        let sub = fx.folder(alice, Some(&docs), "Sub").await;
        fx.grant(bob, docs.id, ResourceType::Folder, ShareRole::Editor, alice)
            .await;
        fx.stores
            .folders
            .soft_delete_folder_tree(docs.id, Utc::now())
            .await
            .unwrap();

        // `sub` was loaded before the delete, so the walk only meets the
        // deleted state on the parent.
        let chain = AclInheritanceResolver::new(fx.stores.folders.clone(), fx.stores.shares.clone());
        let err = chain.resolve_chain(sub, bob, false).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_missing_ancestor_is_not_found() {
        let fx = fixture();
        let alice = fx.user("a@x.io").await;
        let bob = fx.user("b@x.io").await;
        let orphan = fx
            .stores
            .folders
            .create_folder(&CreateFolder {
                name: "Orphan".into(),
                parent_id: Some(Uuid::new_v4()),
                owner_id: alice,
                path: "/Gone/Orphan".into(),
            })
            .await
            .unwrap();

        let err = fx
            .resolver
            .resolve(bob, ResourceType::Folder, orphan.id, ShareRole::Viewer)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        // The owner never needs the chain.
        let perm = fx
            .resolver
            .resolve(alice, ResourceType::Folder, orphan.id, ShareRole::Viewer)
            .await
            .unwrap();
        assert!(perm.granted);
    }

    #[tokio::test]
    async fn test_malformed_id_is_validation_error() {
        let fx = fixture();
        let owner = fx.user("a@x.io").await;
        let err = fx
            .resolver
            .has_permission(owner, "not-a-uuid", ResourceType::Folder, ShareRole::Viewer)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
