//! Search handlers.

use axum::Json;
use axum::extract::{Query, State};

use phynix_entity::file::File;
use phynix_service::search::{SearchQuery, SearchResults};

use crate::dto::{ApiResponse, RecentQuery};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/search?q=&page=&page_size=
pub async fn search(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResults>>, ApiError> {
    let results = state.search_service.search(&auth, query).await?;
    Ok(Json(ApiResponse::ok(results)))
}

/// GET /api/search/recent?days=&limit=
pub async fn recent_files(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RecentQuery>,
) -> Result<Json<ApiResponse<Vec<File>>>, ApiError> {
    let files = state.search_service.recent(&auth, query.days, query.limit).await?;
    Ok(Json(ApiResponse::ok(files)))
}
