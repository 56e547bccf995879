//! Notification log repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use phynix_core::error::{AppError, ErrorKind};
use phynix_core::result::AppResult;
use phynix_entity::notification::{NewNotification, NotificationLog};

use crate::store::NotificationStore;

/// Repository for in-app notification logs.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn record_notification(&self, data: &NewNotification) -> AppResult<NotificationLog> {
        sqlx::query_as::<_, NotificationLog>(
            "INSERT INTO notification_logs (id, user_id, kind, title, message, item_id, item_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.user_id)
        .bind(data.kind)
        .bind(&data.title)
        .bind(&data.message)
        .bind(data.item_id)
        .bind(data.item_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record notification", e))
    }

    async fn list_notifications(&self, user_id: Uuid, limit: u64) -> AppResult<Vec<NotificationLog>> {
        sqlx::query_as::<_, NotificationLog>(
            "SELECT * FROM notification_logs WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list notifications", e))
    }
}
