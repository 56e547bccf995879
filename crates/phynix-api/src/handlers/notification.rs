//! Notification handlers.

use axum::Json;
use axum::extract::{Query, State};

use phynix_entity::notification::NotificationLog;

use crate::dto::{ApiResponse, LimitQuery};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/notifications?limit=
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<NotificationLog>>>, ApiError> {
    let logs = state.notification_service.list_notifications(&auth, query.limit).await?;
    Ok(Json(ApiResponse::ok(logs)))
}
