//! Fire-and-forget share notifications backed by the notification log.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use phynix_core::config::NotificationConfig;
use phynix_core::result::AppResult;
use phynix_database::NotificationStore;
use phynix_entity::notification::{NewNotification, NotificationKind, NotificationLog};
use phynix_entity::permission::{ResourceType, ShareRole};

use crate::context::RequestContext;

/// Upper bound on notifications returned by one listing.
const MAX_LIST_LIMIT: u64 = 100;

/// What a share notification is about.
#[derive(Debug, Clone)]
pub struct ShareNotice {
    /// User receiving access.
    pub recipient_id: Uuid,
    /// Shared resource.
    pub resource_id: Uuid,
    /// Resource kind.
    pub resource_type: ResourceType,
    /// Resource name at share time.
    pub resource_name: String,
    /// Name of the sharing user.
    pub sharer_name: String,
    /// Role granted.
    pub role: ShareRole,
}

/// Records and lists user notifications.
#[derive(Clone)]
pub struct NotificationService {
    /// Notification store.
    store: Arc<dyn NotificationStore>,
    /// Whether delivery is enabled at all.
    enabled: bool,
    /// Sender address stamped on outgoing messages.
    from_email: String,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("enabled", &self.enabled)
            .field("from_email", &self.from_email)
            .finish()
    }
}

impl NotificationService {
    /// Creates a new notification service.
    pub fn new(store: Arc<dyn NotificationStore>, config: &NotificationConfig) -> Self {
        Self {
            store,
            enabled: config.enabled,
            from_email: config.from_email.clone(),
        }
    }

    /// Notify a user that something was shared with them.
    ///
    /// Delivery runs on a background task; failures are logged and never
    /// reach the caller. Returns the task handle, or `None` when disabled.
    pub fn notify_share(&self, notice: ShareNotice) -> Option<JoinHandle<()>> {
        if !self.enabled {
            return None;
        }

        let kind = NotificationKind::for_share(notice.resource_type);
        let title = match notice.resource_type {
            ResourceType::File => format!("File shared with you: {}", notice.resource_name),
            ResourceType::Folder => format!("Folder shared with you: {}", notice.resource_name),
        };
        let message = format!(
            "{} shared \"{}\" with you as {}",
            notice.sharer_name, notice.resource_name, notice.role
        );
        let data = NewNotification {
            user_id: notice.recipient_id,
            kind,
            title,
            message,
            item_id: notice.resource_id,
            item_type: notice.resource_type,
        };

        let store = self.store.clone();
        let from = self.from_email.clone();
        Some(tokio::spawn(async move {
            match store.record_notification(&data).await {
                Ok(log) => info!(
                    notification_id = %log.id,
                    user_id = %log.user_id,
                    from = %from,
                    "Share notification recorded"
                ),
                Err(e) => warn!(
                    user_id = %data.user_id,
                    item_id = %data.item_id,
                    error = %e,
                    "Failed to deliver share notification"
                ),
            }
        }))
    }

    /// Lists the current user's notifications, newest first.
    pub async fn list_notifications(
        &self,
        ctx: &RequestContext,
        limit: Option<u64>,
    ) -> AppResult<Vec<NotificationLog>> {
        let limit = limit.unwrap_or(50).clamp(1, MAX_LIST_LIMIT);
        self.store.list_notifications(ctx.user_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use phynix_database::{MemoryStore, Stores};

    use super::*;

    fn notice(recipient: Uuid) -> ShareNotice {
        ShareNotice {
            recipient_id: recipient,
            resource_id: Uuid::new_v4(),
            resource_type: ResourceType::Folder,
            resource_name: "Docs".into(),
            sharer_name: "Alice".into(),
            role: ShareRole::Editor,
        }
    }

    #[tokio::test]
    async fn test_share_notice_is_recorded() {
        let stores = Stores::memory(Arc::new(MemoryStore::new()));
        let service = NotificationService::new(stores.notifications.clone(), &NotificationConfig::default());
        let recipient = Uuid::new_v4();

        service.notify_share(notice(recipient)).unwrap().await.unwrap();

        let ctx = RequestContext::new(recipient, "b@x.io", "Bob");
        let logs = service.list_notifications(&ctx, None).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].title, "Folder shared with you: Docs");
        assert_eq!(logs[0].kind, NotificationKind::FolderShared);
    }

    #[tokio::test]
    async fn test_disabled_sends_nothing() {
        let stores = Stores::memory(Arc::new(MemoryStore::new()));
        let config = NotificationConfig {
            enabled: false,
            ..NotificationConfig::default()
        };
        let service = NotificationService::new(stores.notifications.clone(), &config);
        assert!(service.notify_share(notice(Uuid::new_v4())).is_none());
    }
}
