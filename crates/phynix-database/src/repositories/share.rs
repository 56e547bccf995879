//! Grant and share repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use phynix_core::error::{AppError, ErrorKind};
use phynix_core::result::AppResult;
use phynix_entity::permission::{Grant, NewGrant, ResourceType, ShareRole};
use phynix_entity::share::{NewShare, Share};

use crate::store::ShareStore;

use super::is_unique_violation;

/// Repository for grants and their share records.
#[derive(Debug, Clone)]
pub struct ShareRepository {
    pool: PgPool,
}

impl ShareRepository {
    /// Create a new share repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_active_share(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
    ) -> AppResult<Share> {
        sqlx::query_as::<_, Share>("SELECT * FROM shares WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err("Failed to lock share"))?
            .filter(|s| s.is_active)
            .ok_or_else(|| AppError::not_found(format!("Share {id} not found or already revoked")))
    }
}

fn db_err(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

#[async_trait]
impl ShareStore for ShareRepository {
    async fn find_active_grant(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> AppResult<Option<Grant>> {
        sqlx::query_as::<_, Grant>(
            "SELECT * FROM grants \
             WHERE user_id = $1 AND resource_id = $2 AND resource_type = $3 AND is_active",
        )
        .bind(user_id)
        .bind(resource_id)
        .bind(resource_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find grant"))
    }

    async fn insert_grant(&self, data: &NewGrant) -> AppResult<Grant> {
        sqlx::query_as::<_, Grant>(
            "INSERT INTO grants (id, user_id, resource_id, resource_type, role, granted_by) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.user_id)
        .bind(data.resource_id)
        .bind(data.resource_type)
        .bind(data.role)
        .bind(data.granted_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "grants_active_unique") {
                AppError::conflict("User already has access to this resource")
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to create grant", e)
            }
        })
    }

    async fn insert_share(&self, data: &NewShare) -> AppResult<Share> {
        sqlx::query_as::<_, Share>(
            "INSERT INTO shares \
             (id, resource_id, resource_type, shared_with, shared_by, role, \
              shared_with_email, shared_with_name, shared_by_email, shared_by_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.resource_id)
        .bind(data.resource_type)
        .bind(data.shared_with)
        .bind(data.shared_by)
        .bind(data.role)
        .bind(&data.shared_with_email)
        .bind(&data.shared_with_name)
        .bind(&data.shared_by_email)
        .bind(&data.shared_by_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "shares_active_unique") {
                AppError::conflict("Resource is already shared with this user")
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to create share", e)
            }
        })
    }

    async fn delete_share(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM shares WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to delete share"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_share(&self, id: Uuid) -> AppResult<Option<Share>> {
        sqlx::query_as::<_, Share>("SELECT * FROM shares WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find share"))
    }

    async fn list_shares_by(
        &self,
        shared_by: Uuid,
        resource_type: Option<ResourceType>,
    ) -> AppResult<Vec<Share>> {
        sqlx::query_as::<_, Share>(
            "SELECT * FROM shares \
             WHERE shared_by = $1 AND is_active \
               AND ($2::resource_type IS NULL OR resource_type = $2) \
             ORDER BY shared_at DESC",
        )
        .bind(shared_by)
        .bind(resource_type)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list shares by user"))
    }

    async fn list_shares_with(
        &self,
        shared_with: Uuid,
        resource_type: Option<ResourceType>,
    ) -> AppResult<Vec<Share>> {
        sqlx::query_as::<_, Share>(
            "SELECT * FROM shares \
             WHERE shared_with = $1 AND is_active \
               AND ($2::resource_type IS NULL OR resource_type = $2) \
             ORDER BY shared_at DESC",
        )
        .bind(shared_with)
        .bind(resource_type)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list shares with user"))
    }

    async fn list_resource_shares(
        &self,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> AppResult<Vec<Share>> {
        sqlx::query_as::<_, Share>(
            "SELECT * FROM shares \
             WHERE resource_id = $1 AND resource_type = $2 AND is_active \
             ORDER BY shared_at DESC",
        )
        .bind(resource_id)
        .bind(resource_type)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list resource shares"))
    }

    async fn revoke_share(&self, id: Uuid, revoked_by: Uuid, at: DateTime<Utc>) -> AppResult<Share> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        let share = Self::lock_active_share(&mut tx, id).await?;

        let revoked = sqlx::query_as::<_, Share>(
            "UPDATE shares SET is_active = FALSE, revoked_at = $2, revoked_by = $3 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(at)
        .bind(revoked_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err("Failed to revoke share"))?;

        sqlx::query(
            "UPDATE grants SET is_active = FALSE, revoked_at = $4, revoked_by = $5 \
             WHERE user_id = $1 AND resource_id = $2 AND resource_type = $3 AND is_active",
        )
        .bind(share.shared_with)
        .bind(share.resource_id)
        .bind(share.resource_type)
        .bind(at)
        .bind(revoked_by)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to revoke grant"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit share revoke"))?;
        Ok(revoked)
    }

    async fn update_share_role(
        &self,
        id: Uuid,
        role: ShareRole,
        updated_by: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<Share> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        let share = Self::lock_active_share(&mut tx, id).await?;

        let updated = sqlx::query_as::<_, Share>(
            "UPDATE shares SET role = $2, updated_at = $3, updated_by = $4 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(role)
        .bind(at)
        .bind(updated_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err("Failed to update share role"))?;

        sqlx::query(
            "UPDATE grants SET role = $4 \
             WHERE user_id = $1 AND resource_id = $2 AND resource_type = $3 AND is_active",
        )
        .bind(share.shared_with)
        .bind(share.resource_id)
        .bind(share.resource_type)
        .bind(role)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to update grant role"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit share update"))?;
        Ok(updated)
    }
}
