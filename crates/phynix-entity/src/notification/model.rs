//! Notification log model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::permission::ResourceType;

/// What triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A file was shared with the recipient.
    FileShared,
    /// A folder was shared with the recipient.
    FolderShared,
}

impl NotificationKind {
    /// Kind for a share of the given resource type.
    pub fn for_share(resource_type: ResourceType) -> Self {
        match resource_type {
            ResourceType::File => Self::FileShared,
            ResourceType::Folder => Self::FolderShared,
        }
    }
}

/// A delivered in-app notification.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationLog {
    /// Unique identifier.
    pub id: Uuid,
    /// Recipient.
    pub user_id: Uuid,
    /// Trigger kind.
    pub kind: NotificationKind,
    /// Subject line.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Related resource.
    pub item_id: Uuid,
    /// Related resource type.
    pub item_type: ResourceType,
    /// Read flag.
    pub is_read: bool,
    /// When it was recorded.
    pub created_at: DateTime<Utc>,
}

/// Data required to record a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    /// Recipient.
    pub user_id: Uuid,
    /// Trigger kind.
    pub kind: NotificationKind,
    /// Subject line.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Related resource.
    pub item_id: Uuid,
    /// Related resource type.
    pub item_type: ResourceType,
}
