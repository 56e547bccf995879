//! Folder handlers.

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use phynix_core::error::AppError;
use phynix_database::SubtreeChange;
use phynix_entity::file::File;
use phynix_entity::folder::Folder;
use phynix_entity::permission::ResourceType;
use phynix_service::folder::{CreateFolderRequest, FolderContents, FolderSummary, RenameRequest};
use phynix_service::share::{PermissionInfo, ShareRequest, ShareResponse};

use super::content_disposition;
use crate::dto::ApiResponse;
use crate::error::ApiError;
use crate::extractors::{AuthUser, parse_uuid};
use crate::state::AppState;

/// Body of `POST /api/folders/{id}/share`.
#[derive(Debug, Deserialize)]
pub struct ShareFolderBody {
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub inherit_to_children: bool,
}

/// POST /api/folders
pub async fn create_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Folder>>), ApiError> {
    let folder = state.folder_service.create_folder(&auth, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(folder))))
}

/// GET /api/folders
pub async fn list_root_folders(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<FolderSummary>>>, ApiError> {
    let folders = state.folder_service.list_root_folders(&auth).await?;
    Ok(Json(ApiResponse::ok(folders)))
}

/// GET /api/folders/{id}
pub async fn get_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FolderContents>>, ApiError> {
    let contents = state.folder_service.folder_contents(&auth, parse_uuid(&id)?).await?;
    Ok(Json(ApiResponse::ok(contents)))
}

/// PATCH /api/folders/{id}/rename
pub async fn rename_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<ApiResponse<Folder>>, ApiError> {
    let folder = state.folder_service.rename_folder(&auth, parse_uuid(&id)?, req).await?;
    Ok(Json(ApiResponse::ok(folder)))
}

/// DELETE /api/folders/{id}
pub async fn delete_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SubtreeChange>>, ApiError> {
    let change = state.folder_service.delete_folder(&auth, parse_uuid(&id)?).await?;
    Ok(Json(ApiResponse::with_message("Folder moved to trash", change)))
}

/// GET /api/folders/{id}/download
///
/// Streams a zip of the folder. Once the body has started, failures can only
/// cut the stream short.
pub async fn download_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let download = state
        .folder_export
        .export(&auth, parse_uuid(&id)?, CancellationToken::new())
        .await?;

    let disposition = content_disposition("attachment", &download.file_name);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(download.stream))
        .map_err(|e| ApiError(AppError::internal(format!("Response build failed: {e}"))))
}

/// POST /api/folders/{id}/share
pub async fn share_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<ShareFolderBody>,
) -> Result<impl IntoResponse, ApiError> {
    let req = ShareRequest {
        resource_id: parse_uuid(&id)?.to_string(),
        resource_type: ResourceType::Folder.to_string(),
        email: body.email,
        role: body.role,
        inherit_to_children: body.inherit_to_children,
    };
    let share: ShareResponse = state.share_service.share(&auth, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(share))))
}

/// GET /api/folders/{id}/permissions
pub async fn folder_permissions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<PermissionInfo>>>, ApiError> {
    let permissions = state
        .share_service
        .resource_permissions(&auth, ResourceType::Folder, parse_uuid(&id)?)
        .await?;
    Ok(Json(ApiResponse::ok(permissions)))
}

/// GET /api/folders/{id}/files
pub async fn list_folder_files(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<File>>>, ApiError> {
    let files = state.folder_service.list_folder_files(&auth, parse_uuid(&id)?).await?;
    Ok(Json(ApiResponse::ok(files)))
}

/// DELETE /api/folders/{id}/files/{file_id}
pub async fn delete_file_from_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, file_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .folder_service
        .delete_file_from_folder(&auth, parse_uuid(&id)?, parse_uuid(&file_id)?)
        .await?;
    Ok(Json(ApiResponse::with_message("File moved to trash", ())))
}
