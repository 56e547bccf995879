//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use phynix_auth::{EffectivePermissionResolver, JwtDecoder, OAuthStateStore};
use phynix_core::config::AppConfig;
use phynix_database::Stores;
use phynix_service::{
    FileService, FolderExport, FolderService, NotificationService, SearchService, ShareService,
    TrashService, UserService,
};
use phynix_storage::StorageManager;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Process start, for uptime reporting
    pub started_at: Instant,

    // ── Infrastructure ───────────────────────────────────────
    /// Blob storage and signed link verification
    pub storage: Arc<StorageManager>,

    // ── Auth ─────────────────────────────────────────────────
    /// JWT token decoder and validator
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Single-use OAuth state tokens
    pub oauth_states: Arc<OAuthStateStore>,
    /// Effective permission resolver
    pub permission_resolver: Arc<EffectivePermissionResolver>,

    // ── Services ─────────────────────────────────────────────
    /// Identity provisioning
    pub user_service: Arc<UserService>,
    /// Folder tree
    pub folder_service: Arc<FolderService>,
    /// Zip export
    pub folder_export: Arc<FolderExport>,
    /// Files and uploads
    pub file_service: Arc<FileService>,
    /// Sharing
    pub share_service: Arc<ShareService>,
    /// Trash lifecycle
    pub trash_service: Arc<TrashService>,
    /// Name search
    pub search_service: Arc<SearchService>,
    /// Share notifications
    pub notification_service: Arc<NotificationService>,
}

impl AppState {
    /// Wire every service over the given stores and blob storage.
    pub fn new(
        config: AppConfig,
        stores: &Stores,
        storage: Arc<StorageManager>,
        oauth_states: Arc<OAuthStateStore>,
    ) -> Self {
        let provider = storage.provider();

        let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth));
        let permission_resolver = Arc::new(EffectivePermissionResolver::new(
            Arc::clone(&stores.files),
            Arc::clone(&stores.folders),
            Arc::clone(&stores.shares),
        ));

        let user_service = Arc::new(UserService::new(Arc::clone(&stores.users), &config.storage));
        let folder_service = Arc::new(FolderService::new(
            Arc::clone(&stores.folders),
            Arc::clone(&stores.files),
            Arc::clone(&permission_resolver),
        ));
        let folder_export = Arc::new(FolderExport::new(
            Arc::clone(&stores.folders),
            Arc::clone(&stores.files),
            Arc::clone(&provider),
            Arc::clone(&permission_resolver),
        ));
        let file_service = Arc::new(FileService::new(
            Arc::clone(&stores.files),
            Arc::clone(&stores.users),
            Arc::clone(&folder_service),
            Arc::clone(&provider),
            Arc::clone(&permission_resolver),
            &config.storage,
        ));
        let notification_service = Arc::new(NotificationService::new(
            Arc::clone(&stores.notifications),
            &config.notification,
        ));
        let share_service = Arc::new(ShareService::new(
            Arc::clone(&stores.users),
            Arc::clone(&stores.folders),
            Arc::clone(&stores.files),
            Arc::clone(&stores.shares),
            Arc::clone(&permission_resolver),
            Arc::clone(&notification_service),
        ));
        let trash_service = Arc::new(TrashService::new(
            Arc::clone(&stores.folders),
            Arc::clone(&stores.files),
            Arc::clone(&provider),
            &config.trash,
        ));
        let search_service = Arc::new(SearchService::new(
            Arc::clone(&stores.folders),
            Arc::clone(&stores.files),
        ));

        Self {
            config: Arc::new(config),
            started_at: Instant::now(),
            storage,
            jwt_decoder,
            oauth_states,
            permission_resolver,
            user_service,
            folder_service,
            folder_export,
            file_service,
            share_service,
            trash_service,
            search_service,
            notification_service,
        }
    }
}
