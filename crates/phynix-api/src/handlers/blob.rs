//! Signed blob delivery.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;

use phynix_core::error::AppError;
use phynix_core::traits::storage::Disposition;
use phynix_entity::file::mime_from_name;

use super::content_disposition;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/blobs/{token}
///
/// The token is the only credential: it names the blob, the file name to
/// present and whether to render inline.
pub async fn serve_blob(State(state): State<AppState>, Path(token): Path<String>) -> Result<Response, ApiError> {
    let (claims, stream) = state.storage.open_signed(&token).await?;

    let kind = match claims.disposition {
        Disposition::Attachment => "attachment",
        Disposition::Inline => "inline",
    };
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_from_name(&claims.name))
        .header(header::CONTENT_DISPOSITION, content_disposition(kind, &claims.name))
        .header(header::CACHE_CONTROL, "private, no-store")
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError(AppError::internal(format!("Response build failed: {e}"))))
}
