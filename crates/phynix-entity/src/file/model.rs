//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A stored file's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Name as uploaded.
    pub original_name: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME type.
    pub mime_type: String,
    /// Containing folder (null for root-level files).
    pub folder_id: Option<Uuid>,
    /// The file owner.
    pub owner_id: Uuid,
    /// Opaque blob key in the storage backend.
    #[serde(skip_serializing)]
    pub storage_key: String,
    /// Relative path supplied at upload time, if any.
    pub relative_path: Option<String>,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// When the file was moved to trash.
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the file was created.
    pub created_at: DateTime<Utc>,
    /// When the file was last updated.
    pub updated_at: DateTime<Utc>,
}

impl File {
    /// Whether the file is live (not in trash).
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}

/// Data required to record an uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    /// Display name.
    pub name: String,
    /// Name as uploaded.
    pub original_name: String,
    /// Size in bytes.
    pub size_bytes: i64,
    /// MIME type.
    pub mime_type: String,
    /// Containing folder.
    pub folder_id: Option<Uuid>,
    /// Owner.
    pub owner_id: Uuid,
    /// Blob key returned by the storage provider.
    pub storage_key: String,
    /// Relative path supplied at upload time.
    pub relative_path: Option<String>,
}
