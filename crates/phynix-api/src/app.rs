//! Application builder.

use axum::Router;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application: routes, middleware and state.
pub fn build_app(state: AppState) -> Router {
    tracing::debug!(
        database = ?state.config.database.provider,
        storage = %state.storage.provider().provider_type(),
        "Building HTTP application"
    );
    build_router(state)
}
