//! Materialized path helpers.
//!
//! Paths are written only through folder create and rename. Both go through
//! these functions so the `/`-joined format stays uniform.

use phynix_core::AppError;

/// Maximum folder name length in characters.
pub const MAX_NAME_LEN: usize = 255;

/// Validate and normalize a folder or file name.
pub fn validate_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "Name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(AppError::validation("Name cannot contain path separators"));
    }
    if trimmed == "." || trimmed == ".." {
        return Err(AppError::validation("Name cannot be '.' or '..'"));
    }
    Ok(trimmed.to_string())
}

/// Path of a child named `name` under a parent with `parent_path`.
///
/// Root folders have a path equal to their name, without a leading slash.
pub fn child_path(parent_path: Option<&str>, name: &str) -> String {
    match parent_path {
        Some(parent) if !parent.is_empty() => format!("{parent}/{name}"),
        _ => name.to_string(),
    }
}

/// Rewrite `path` from under `old_prefix` to under `new_prefix`.
///
/// Returns `None` when `path` is not `old_prefix` itself or a descendant of it.
pub fn rebase_path(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if path == old_prefix {
        return Some(new_prefix.to_string());
    }
    path.strip_prefix(old_prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(|rest| format!("{new_prefix}/{rest}"))
}
