//! Storage provider implementations.

pub mod local;
pub mod memory;

pub use local::LocalStorageProvider;
pub use memory::MemoryStorageProvider;

use phynix_core::error::AppError;
use phynix_core::result::AppResult;

/// Normalize a logical blob path into a key, rejecting traversal segments.
pub(crate) fn normalize_key(path: &str) -> AppResult<String> {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.is_empty() {
        return Err(AppError::validation("Blob path cannot be empty"));
    }
    if segments.iter().any(|s| *s == ".." || s.contains('\\')) {
        return Err(AppError::validation(format!("Invalid blob path: {path}")));
    }
    Ok(segments.join("/"))
}
