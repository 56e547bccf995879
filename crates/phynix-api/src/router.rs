//! Route definitions for the PhynixDrive HTTP API.
//!
//! All routes are organized by domain and mounted under `/api`.

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
};
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.config.server.max_request_body_bytes).unwrap_or(usize::MAX);
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    let api_routes = Router::new()
        .merge(auth_routes())
        .merge(folder_routes())
        .merge(file_routes())
        .merge(share_routes())
        .merge(trash_routes())
        .merge(search_routes())
        .merge(notification_routes())
        .merge(blob_routes())
        .merge(health_routes());

    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(request_logging))
        .with_state(state)
}

/// OAuth state issue and validation
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/state", post(handlers::auth::issue_state))
        .route("/auth/state/validate", post(handlers::auth::validate_state))
}

/// Folder tree, export and folder-level sharing
fn folder_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/folders",
            post(handlers::folder::create_folder).get(handlers::folder::list_root_folders),
        )
        .route(
            "/folders/{id}",
            get(handlers::folder::get_folder).delete(handlers::folder::delete_folder),
        )
        .route("/folders/{id}/rename", patch(handlers::folder::rename_folder))
        .route("/folders/{id}/download", get(handlers::folder::download_folder))
        .route("/folders/{id}/share", post(handlers::folder::share_folder))
        .route("/folders/{id}/permissions", get(handlers::folder::folder_permissions))
        .route("/folders/{id}/files", get(handlers::folder::list_folder_files))
        .route(
            "/folders/{id}/files/{file_id}",
            delete(handlers::folder::delete_file_from_folder),
        )
}

/// File upload, metadata, links and versions
fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files", get(handlers::file::list_files))
        .route("/files/upload", post(handlers::file::upload_files))
        .route(
            "/files/{id}",
            get(handlers::file::get_file).delete(handlers::file::delete_file),
        )
        .route("/files/{id}/rename", patch(handlers::file::rename_file))
        .route("/files/{id}/download", get(handlers::file::download_file))
        .route("/files/{id}/preview", get(handlers::file::preview_file))
        .route("/files/{id}/versions", get(handlers::file::list_versions))
        .route("/files/{id}/permissions", get(handlers::file::file_permissions))
}

/// Share grants
fn share_routes() -> Router<AppState> {
    Router::new()
        .route("/share", post(handlers::share::create_share))
        .route("/share/bulk", post(handlers::share::bulk_share))
        .route("/share/by-me", get(handlers::share::shared_by_me))
        .route("/share/with-me", get(handlers::share::shared_with_me))
        .route("/share/all", get(handlers::share::all_shared))
        .route(
            "/share/resource/{type}/{id}/permissions",
            get(handlers::share::resource_permissions),
        )
        .route("/share/details/{share_id}", get(handlers::share::share_details))
        .route("/share/{share_id}/revoke", delete(handlers::share::revoke_share))
        .route("/share/{share_id}/update", put(handlers::share::update_share))
}

/// Trash listing, restore and purge
fn trash_routes() -> Router<AppState> {
    Router::new()
        .route("/trash", get(handlers::trash::list_trash))
        .route("/trash/restore-multiple", post(handlers::trash::restore_multiple))
        .route("/trash/purge-all", delete(handlers::trash::purge_all))
        .route("/trash/{id}/restore", patch(handlers::trash::restore_item))
        .route("/trash/{id}/purge", delete(handlers::trash::purge_item))
}

fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(handlers::search::search))
        .route("/search/recent", get(handlers::search::recent_files))
}

fn notification_routes() -> Router<AppState> {
    Router::new().route("/notifications", get(handlers::notification::list_notifications))
}

/// Signed blob delivery (the token is the credential)
fn blob_routes() -> Router<AppState> {
    Router::new().route("/blobs/{token}", get(handlers::blob::serve_blob))
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
