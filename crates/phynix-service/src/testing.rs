//! In-memory service wiring for unit tests.

use std::sync::Arc;

use bytes::Bytes;
use uuid::Uuid;

use phynix_auth::EffectivePermissionResolver;
use phynix_core::config::{NotificationConfig, StorageConfig, TrashConfig};
use phynix_database::{MemoryStore, Stores};
use phynix_entity::file::File;
use phynix_entity::folder::Folder;
use phynix_entity::permission::ResourceType;
use phynix_entity::user::CreateUser;
use phynix_storage::{MemoryStorageProvider, SignedUrlIssuer};

use crate::context::RequestContext;
use crate::file::{FileService, UploadItem, UploadRequest};
use crate::folder::{CreateFolderRequest, FolderExport, FolderService};
use crate::notification::NotificationService;
use crate::search::SearchService;
use crate::share::{ShareRequest, ShareResponse, ShareService};
use crate::trash::TrashService;

pub(crate) struct Harness {
    pub store: Arc<MemoryStore>,
    pub stores: Stores,
    pub blobs: Arc<MemoryStorageProvider>,
    pub resolver: Arc<EffectivePermissionResolver>,
    pub folders: Arc<FolderService>,
    pub files: FileService,
    pub shares: ShareService,
    pub trash: TrashService,
    pub notifications: Arc<NotificationService>,
    pub export: FolderExport,
    pub search: SearchService,
    quota: i64,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_quota(1024 * 1024 * 1024)
    }

    pub fn with_quota(quota: i64) -> Self {
        let store = Arc::new(MemoryStore::new());
        let stores = Stores::memory(store.clone());
        let signer = Arc::new(SignedUrlIssuer::new("test-signing-secret", "http://localhost:8080"));
        let blobs = Arc::new(MemoryStorageProvider::new(signer));
        let resolver = Arc::new(EffectivePermissionResolver::new(
            stores.files.clone(),
            stores.folders.clone(),
            stores.shares.clone(),
        ));
        let folders = Arc::new(FolderService::new(
            stores.folders.clone(),
            stores.files.clone(),
            resolver.clone(),
        ));
        let files = FileService::new(
            stores.files.clone(),
            stores.users.clone(),
            folders.clone(),
            blobs.clone(),
            resolver.clone(),
            &StorageConfig::default(),
        );
        let notifications = Arc::new(NotificationService::new(
            stores.notifications.clone(),
            &NotificationConfig::default(),
        ));
        let shares = ShareService::new(
            stores.users.clone(),
            stores.folders.clone(),
            stores.files.clone(),
            stores.shares.clone(),
            resolver.clone(),
            notifications.clone(),
        );
        let trash = TrashService::new(
            stores.folders.clone(),
            stores.files.clone(),
            blobs.clone(),
            &TrashConfig::default(),
        );
        let export = FolderExport::new(
            stores.folders.clone(),
            stores.files.clone(),
            blobs.clone(),
            resolver.clone(),
        );
        let search = SearchService::new(stores.folders.clone(), stores.files.clone());

        Self {
            store,
            stores,
            blobs,
            resolver,
            folders,
            files,
            shares,
            trash,
            notifications,
            export,
            search,
            quota,
        }
    }

    pub async fn user(&self, email: &str) -> RequestContext {
        let user = self
            .stores
            .users
            .create_user(&CreateUser {
                email: email.to_string(),
                name: String::new(),
                max_storage: self.quota,
            })
            .await
            .unwrap();
        RequestContext::from_user(&user)
    }

    pub async fn folder(&self, ctx: &RequestContext, name: &str) -> Folder {
        self.folders
            .create_folder(
                ctx,
                CreateFolderRequest {
                    name: name.to_string(),
                    parent_id: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn share(
        &self,
        ctx: &RequestContext,
        resource_id: Uuid,
        resource_type: ResourceType,
        email: &str,
        role: &str,
    ) -> ShareResponse {
        self.shares
            .share(
                ctx,
                ShareRequest {
                    resource_id: resource_id.to_string(),
                    resource_type: resource_type.to_string(),
                    email: email.to_string(),
                    role: role.to_string(),
                    inherit_to_children: false,
                },
            )
            .await
            .unwrap()
    }

    pub async fn upload(&self, ctx: &RequestContext, folder_id: Option<Uuid>, name: &str, data: &[u8]) -> File {
        self.files
            .upload(
                ctx,
                UploadRequest {
                    folder_id,
                    items: vec![UploadItem {
                        file_name: name.to_string(),
                        relative_path: None,
                        data: Bytes::copy_from_slice(data),
                    }],
                },
            )
            .await
            .unwrap()
            .remove(0)
    }

    pub async fn used_storage(&self, ctx: &RequestContext) -> i64 {
        self.stores
            .users
            .find_user(ctx.user_id)
            .await
            .unwrap()
            .unwrap()
            .used_storage
    }
}
