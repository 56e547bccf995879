//! Trash handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use phynix_core::error::AppError;
use phynix_database::SubtreeChange;
use phynix_service::trash::{RestoreOutcome, RestoreResult, RestoreTarget, TrashListing, TrashQuery};

use crate::dto::{ApiResponse, TypeQuery};
use crate::error::ApiError;
use crate::extractors::{AuthUser, parse_uuid};
use crate::state::AppState;

/// Body of `POST /api/trash/restore-multiple`.
#[derive(Debug, Deserialize)]
pub struct RestoreManyBody {
    pub items: Vec<RestoreTarget>,
}

/// Result of `POST /api/trash/restore-multiple`.
#[derive(Debug, Serialize)]
pub struct RestoreManyResponse {
    pub results: Vec<RestoreResult>,
    pub restored: usize,
    pub failed: usize,
}

/// Result of `DELETE /api/trash/purge-all`.
#[derive(Debug, Serialize)]
pub struct PurgeAllResponse {
    pub deleted_count: u64,
}

/// GET /api/trash?type=&limit=&offset=
pub async fn list_trash(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TrashQuery>,
) -> Result<Json<ApiResponse<TrashListing>>, ApiError> {
    let listing = state.trash_service.list(&auth, query).await?;
    Ok(Json(ApiResponse::ok(listing)))
}

/// PATCH /api/trash/{id}/restore?type=file|folder
pub async fn restore_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<TypeQuery>,
) -> Result<Json<ApiResponse<RestoreOutcome>>, ApiError> {
    let outcome = state
        .trash_service
        .restore(&auth, parse_uuid(&id)?, query.required()?)
        .await?;
    Ok(Json(ApiResponse::with_message("Item restored", outcome)))
}

/// DELETE /api/trash/{id}/purge?type=file|folder
pub async fn purge_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<TypeQuery>,
) -> Result<Json<ApiResponse<SubtreeChange>>, ApiError> {
    let change = state
        .trash_service
        .purge(&auth, parse_uuid(&id)?, query.required()?)
        .await?;
    Ok(Json(ApiResponse::with_message("Item permanently deleted", change)))
}

/// POST /api/trash/restore-multiple
pub async fn restore_multiple(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<RestoreManyBody>,
) -> Result<Json<ApiResponse<RestoreManyResponse>>, ApiError> {
    if body.items.is_empty() {
        return Err(AppError::validation("No items to restore").into());
    }
    let results = state.trash_service.restore_many(&auth, body.items).await;
    let restored = results.iter().filter(|r| r.success).count();
    let failed = results.len() - restored;
    Ok(Json(ApiResponse::ok(RestoreManyResponse {
        results,
        restored,
        failed,
    })))
}

/// DELETE /api/trash/purge-all
pub async fn purge_all(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<PurgeAllResponse>>, ApiError> {
    let deleted_count = state.trash_service.empty_trash(&auth).await?;
    Ok(Json(ApiResponse::with_message(
        "Trash emptied",
        PurgeAllResponse { deleted_count },
    )))
}
