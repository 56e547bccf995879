//! File handlers.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use phynix_core::error::AppError;
use phynix_entity::file::{File, FileVersion};
use phynix_entity::permission::ResourceType;
use phynix_service::folder::RenameRequest;
use phynix_service::share::PermissionInfo;
use phynix_service::{FileLink, UploadItem, UploadRequest};

use crate::dto::ApiResponse;
use crate::error::ApiError;
use crate::extractors::{AuthUser, parse_uuid};
use crate::state::AppState;

/// `?folder_id=` for file listings.
#[derive(Debug, Default, Deserialize)]
pub struct FileListQuery {
    #[serde(default)]
    pub folder_id: Option<String>,
}

/// POST /api/files/upload
///
/// Multipart fields: `folder_id` (optional), one `files` part per file and,
/// optionally, one `relative_paths` part per file in the same order.
pub async fn upload_files(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Vec<File>>>), ApiError> {
    let mut folder_id = None;
    let mut items: Vec<UploadItem> = Vec::new();
    let mut relative_paths: Vec<String> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "folder_id" => {
                let raw = read_text(field).await?;
                if !raw.trim().is_empty() {
                    folder_id = Some(parse_uuid(raw.trim())?);
                }
            }
            "relative_paths" | "relative_path" => relative_paths.push(read_text(field).await?),
            "files" | "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::validation("File part is missing a file name"))?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Failed to read {file_name}: {e}")))?;
                items.push(UploadItem {
                    file_name,
                    relative_path: None,
                    data,
                });
            }
            other => tracing::debug!(field = %other, "Ignoring unknown multipart field"),
        }
    }

    for (item, path) in items.iter_mut().zip(relative_paths) {
        let path = path.trim();
        if !path.is_empty() {
            item.relative_path = Some(path.to_string());
        }
    }

    let files = state
        .file_service
        .upload(&auth, UploadRequest { folder_id, items })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(files))))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart field: {e}")))
}

/// GET /api/files?folder_id=...
pub async fn list_files(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<FileListQuery>,
) -> Result<Json<ApiResponse<Vec<File>>>, ApiError> {
    let folder_id = query
        .folder_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_uuid)
        .transpose()?;
    let files = state.file_service.list_files(&auth, folder_id).await?;
    Ok(Json(ApiResponse::ok(files)))
}

/// GET /api/files/{id}
pub async fn get_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<File>>, ApiError> {
    let file = state.file_service.get_file(&auth, parse_uuid(&id)?).await?;
    Ok(Json(ApiResponse::ok(file)))
}

/// DELETE /api/files/{id}
pub async fn delete_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.file_service.delete_file(&auth, parse_uuid(&id)?).await?;
    Ok(Json(ApiResponse::with_message("File moved to trash", ())))
}

/// PATCH /api/files/{id}/rename
pub async fn rename_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<ApiResponse<File>>, ApiError> {
    let file = state.file_service.rename_file(&auth, parse_uuid(&id)?, req).await?;
    Ok(Json(ApiResponse::ok(file)))
}

/// GET /api/files/{id}/download
pub async fn download_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FileLink>>, ApiError> {
    let link = state.file_service.download_link(&auth, parse_uuid(&id)?).await?;
    Ok(Json(ApiResponse::ok(link)))
}

/// GET /api/files/{id}/preview
pub async fn preview_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FileLink>>, ApiError> {
    let link = state.file_service.preview_link(&auth, parse_uuid(&id)?).await?;
    Ok(Json(ApiResponse::ok(link)))
}

/// GET /api/files/{id}/versions
pub async fn list_versions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<FileVersion>>>, ApiError> {
    let versions = state.file_service.list_versions(&auth, parse_uuid(&id)?).await?;
    Ok(Json(ApiResponse::ok(versions)))
}

/// GET /api/files/{id}/permissions
pub async fn file_permissions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<PermissionInfo>>>, ApiError> {
    let permissions = state
        .share_service
        .resource_permissions(&auth, ResourceType::File, parse_uuid(&id)?)
        .await?;
    Ok(Json(ApiResponse::ok(permissions)))
}
