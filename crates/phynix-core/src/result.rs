//! Convenience result type alias for PhynixDrive.

use crate::error::AppError;

/// A specialized `Result` type for PhynixDrive operations.
pub type AppResult<T> = Result<T, AppError>;
