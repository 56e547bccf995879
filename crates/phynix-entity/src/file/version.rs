//! File version model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A prior revision of a file, stored as its own blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FileVersion {
    /// Unique version identifier.
    pub id: Uuid,
    /// The file this version belongs to.
    pub file_id: Uuid,
    /// Blob key of this revision.
    #[serde(skip_serializing)]
    pub storage_key: String,
    /// Size in bytes.
    pub size_bytes: i64,
    /// When this version was recorded.
    pub created_at: DateTime<Utc>,
}
