//! Health check handler.

use axum::Json;
use axum::extract::State;

use crate::dto::ApiResponse;
use crate::dto::response::HealthResponse;
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        database: format!("{:?}", state.config.database.provider).to_lowercase(),
        storage: state.storage.provider().provider_type().to_string(),
    }))
}
