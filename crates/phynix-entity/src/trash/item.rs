//! Trash item projection.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::file::File;
use crate::folder::Folder;
use crate::permission::ResourceType;

/// A soft-deleted folder or file as shown in the trash.
///
/// Never stored; `auto_purge_at` is always derived from `deleted_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashItem {
    /// ID of the deleted folder or file.
    pub item_id: Uuid,
    /// Whether this is a file or folder.
    pub item_type: ResourceType,
    /// Name at deletion time.
    pub name: String,
    /// Folder path (folders) or containing folder path plus name (files).
    pub original_path: String,
    /// Owner.
    pub owner_id: Uuid,
    /// Size in bytes (0 for folders).
    pub size: i64,
    /// When the item was deleted.
    pub deleted_at: DateTime<Utc>,
    /// When the item becomes eligible for automatic purge.
    pub auto_purge_at: DateTime<Utc>,
}

impl TrashItem {
    /// Project a deleted folder. Returns `None` for active folders.
    pub fn from_folder(folder: &Folder, retention: Duration) -> Option<Self> {
        let deleted_at = folder.deleted_at.filter(|_| folder.is_deleted)?;
        Some(Self {
            item_id: folder.id,
            item_type: ResourceType::Folder,
            name: folder.name.clone(),
            original_path: folder.path.clone(),
            owner_id: folder.owner_id,
            size: 0,
            deleted_at,
            auto_purge_at: deleted_at + retention,
        })
    }

    /// Project a deleted file. Returns `None` for active files.
    pub fn from_file(file: &File, folder_path: Option<&str>, retention: Duration) -> Option<Self> {
        let deleted_at = file.deleted_at.filter(|_| file.is_deleted)?;
        let original_path = match folder_path {
            Some(path) => format!("{path}/{}", file.name),
            None => file.name.clone(),
        };
        Some(Self {
            item_id: file.id,
            item_type: ResourceType::File,
            name: file.name.clone(),
            original_path,
            owner_id: file.owner_id,
            size: file.size_bytes,
            deleted_at,
            auto_purge_at: deleted_at + retention,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purge_deadline_is_derived() {
        let now = Utc::now();
        let folder = Folder {
            id: Uuid::new_v4(),
            name: "Docs".into(),
            parent_id: None,
            owner_id: Uuid::new_v4(),
            path: "Docs".into(),
            is_deleted: true,
            deleted_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        let item = TrashItem::from_folder(&folder, Duration::days(30)).unwrap();
        assert_eq!(item.auto_purge_at, now + Duration::days(30));
        assert_eq!(item.original_path, "Docs");

        let live = Folder {
            is_deleted: false,
            deleted_at: None,
            ..folder
        };
        assert!(TrashItem::from_folder(&live, Duration::days(30)).is_none());
    }
}
