//! OAuth state handlers. These run before the caller has a token.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::dto::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// A freshly issued OAuth state.
#[derive(Debug, Serialize, Deserialize)]
pub struct StateToken {
    pub state: String,
    pub expires_in: u64,
}

/// Body of `POST /api/auth/state/validate`.
#[derive(Debug, Deserialize)]
pub struct ValidateStateBody {
    pub state: String,
}

/// POST /api/auth/state
pub async fn issue_state(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<StateToken>>) {
    let token = state.oauth_states.issue().await;
    let body = StateToken {
        state: token,
        expires_in: state.config.auth.oauth_state_ttl_seconds,
    };
    (StatusCode::CREATED, Json(ApiResponse::ok(body)))
}

/// POST /api/auth/state/validate
///
/// Consumes the state; a second validation of the same value fails.
pub async fn validate_state(
    State(state): State<AppState>,
    Json(body): Json<ValidateStateBody>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.oauth_states.consume(body.state.trim()).await?;
    Ok(Json(ApiResponse::with_message("State is valid", ())))
}
