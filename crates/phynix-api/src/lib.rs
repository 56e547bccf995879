//! # phynix-api
//!
//! HTTP API layer for PhynixDrive built on Axum.
//!
//! Provides the REST endpoints, the bearer-token extractor, the middleware
//! stack (tracing, CORS, compression, body limit, timeout) and the mapping
//! from domain errors to HTTP responses.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::{ApiError, ApiErrorResponse};
pub use state::AppState;
