//! Share handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use phynix_entity::permission::ResourceType;
use phynix_service::share::{
    BulkShareRequest, BulkShareResponse, PermissionInfo, ShareRequest, ShareResponse, SharedResource,
    SharedResourcesResponse, UpdateShareRequest,
};

use crate::dto::{ApiResponse, TypeQuery};
use crate::error::ApiError;
use crate::extractors::{AuthUser, parse_uuid};
use crate::state::AppState;

/// POST /api/share
pub async fn create_share(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ShareRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ShareResponse>>), ApiError> {
    let share = state.share_service.share(&auth, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(share))))
}

/// POST /api/share/bulk
///
/// 201 when every item succeeded, 400 when none did, 200 otherwise.
pub async fn bulk_share(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<BulkShareRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BulkShareResponse>>), ApiError> {
    let result = state.share_service.bulk_share(&auth, req).await?;
    let status = if result.summary.failed == 0 {
        StatusCode::CREATED
    } else if result.summary.successful == 0 {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ApiResponse::ok(result))))
}

/// GET /api/share/by-me?type=...
pub async fn shared_by_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TypeQuery>,
) -> Result<Json<ApiResponse<Vec<ShareResponse>>>, ApiError> {
    let shares = state.share_service.shared_by_me(&auth, query.filter()?).await?;
    Ok(Json(ApiResponse::ok(shares)))
}

/// GET /api/share/with-me?type=...
pub async fn shared_with_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TypeQuery>,
) -> Result<Json<ApiResponse<Vec<SharedResource>>>, ApiError> {
    let shares = state.share_service.shared_with_me(&auth, query.filter()?).await?;
    Ok(Json(ApiResponse::ok(shares)))
}

/// GET /api/share/all
pub async fn all_shared(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<SharedResourcesResponse>>, ApiError> {
    let shares = state.share_service.all_shared(&auth).await?;
    Ok(Json(ApiResponse::ok(shares)))
}

/// GET /api/share/resource/{type}/{id}/permissions
pub async fn resource_permissions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((resource_type, id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Vec<PermissionInfo>>>, ApiError> {
    let resource_type: ResourceType = resource_type.parse()?;
    let permissions = state
        .share_service
        .resource_permissions(&auth, resource_type, parse_uuid(&id)?)
        .await?;
    Ok(Json(ApiResponse::ok(permissions)))
}

/// GET /api/share/details/{share_id}
pub async fn share_details(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(share_id): Path<String>,
) -> Result<Json<ApiResponse<ShareResponse>>, ApiError> {
    let share = state.share_service.share_details(&auth, parse_uuid(&share_id)?).await?;
    Ok(Json(ApiResponse::ok(share)))
}

/// DELETE /api/share/{share_id}/revoke
pub async fn revoke_share(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(share_id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.share_service.revoke(&auth, parse_uuid(&share_id)?).await?;
    Ok(Json(ApiResponse::with_message("Share revoked", ())))
}

/// PUT /api/share/{share_id}/update
pub async fn update_share(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(share_id): Path<String>,
    Json(req): Json<UpdateShareRequest>,
) -> Result<Json<ApiResponse<ShareResponse>>, ApiError> {
    let share = state
        .share_service
        .update_role(&auth, parse_uuid(&share_id)?, req)
        .await?;
    Ok(Json(ApiResponse::ok(share)))
}
