//! File repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use phynix_core::error::{AppError, ErrorKind};
use phynix_core::result::AppResult;
use phynix_core::types::PageRequest;
use phynix_entity::file::{CreateFile, File, FileVersion};

use crate::store::FileStore;

use super::{apply_usage_deltas, charge_usage, like_pattern};

/// Repository for file metadata, versions, and single-file lifecycle.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    /// Create a new file repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<sqlx::Transaction<'static, sqlx::Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e))
    }
}

fn db_err(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

#[async_trait]
impl FileStore for FileRepository {
    async fn create_file(&self, data: &CreateFile) -> AppResult<File> {
        let mut tx = self.begin().await?;

        let file = sqlx::query_as::<_, File>(
            "INSERT INTO files \
             (id, name, original_name, size_bytes, mime_type, folder_id, owner_id, storage_key, relative_path) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.original_name)
        .bind(data.size_bytes)
        .bind(&data.mime_type)
        .bind(data.folder_id)
        .bind(data.owner_id)
        .bind(&data.storage_key)
        .bind(&data.relative_path)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err("Failed to create file"))?;

        charge_usage(&mut tx, file.owner_id, file.size_bytes).await?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit file creation"))?;
        Ok(file)
    }

    async fn replace_file_content(
        &self,
        id: Uuid,
        storage_key: &str,
        size_bytes: i64,
        mime_type: &str,
    ) -> AppResult<File> {
        let mut tx = self.begin().await?;

        let current = sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE id = $1 AND NOT is_deleted FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err("Failed to lock file"))?
        .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;

        sqlx::query(
            "INSERT INTO file_versions (id, file_id, storage_key, size_bytes) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(&current.storage_key)
        .bind(current.size_bytes)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to record file version"))?;

        let updated = sqlx::query_as::<_, File>(
            "UPDATE files SET storage_key = $2, size_bytes = $3, mime_type = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(storage_key)
        .bind(size_bytes)
        .bind(mime_type)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err("Failed to replace file content"))?;

        charge_usage(&mut tx, current.owner_id, size_bytes - current.size_bytes).await?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit file replacement"))?;
        Ok(updated)
    }

    async fn find_file(&self, id: Uuid) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find file"))
    }

    async fn find_file_by_name(
        &self,
        owner_id: Uuid,
        folder_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE owner_id = $1 AND folder_id IS NOT DISTINCT FROM $2 AND name = $3 \
               AND NOT is_deleted \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(owner_id)
        .bind(folder_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find file by name"))
    }

    async fn list_folder_files(&self, folder_id: Uuid) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE folder_id = $1 AND NOT is_deleted ORDER BY name ASC",
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list folder files"))
    }

    async fn list_root_files(&self, owner_id: Uuid) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE owner_id = $1 AND folder_id IS NULL AND NOT is_deleted ORDER BY name ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list root files"))
    }

    async fn rename_file(&self, id: Uuid, new_name: &str) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET name = $2, updated_at = NOW() \
             WHERE id = $1 AND NOT is_deleted RETURNING *",
        )
        .bind(id)
        .bind(new_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to rename file"))?
        .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    async fn soft_delete_file(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let mut tx = self.begin().await?;

        let row: Option<(Uuid, i64)> = sqlx::query_as(
            "UPDATE files SET is_deleted = TRUE, deleted_at = $2, updated_at = $2 \
             WHERE id = $1 AND NOT is_deleted RETURNING owner_id, size_bytes",
        )
        .bind(id)
        .bind(at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err("Failed to soft-delete file"))?;

        let Some(row) = row else {
            return Ok(false);
        };
        apply_usage_deltas(&mut tx, &[row], -1).await?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit file delete"))?;
        Ok(true)
    }

    async fn restore_file(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.begin().await?;

        let row: Option<(Uuid, i64)> = sqlx::query_as(
            "UPDATE files SET is_deleted = FALSE, deleted_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND is_deleted RETURNING owner_id, size_bytes",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err("Failed to restore file"))?;

        let Some(row) = row else {
            return Ok(false);
        };
        apply_usage_deltas(&mut tx, &[row], 1).await?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit file restore"))?;
        Ok(true)
    }

    async fn purge_file(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.begin().await?;

        sqlx::query("DELETE FROM file_versions WHERE file_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to purge file versions"))?;

        for table in ["grants", "shares"] {
            sqlx::query(&format!(
                "DELETE FROM {table} WHERE resource_type = 'file' AND resource_id = $1"
            ))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to purge access records"))?;
        }

        let removed = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to purge file"))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(db_err("Failed to commit file purge"))?;
        Ok(removed > 0)
    }

    async fn list_versions(&self, file_id: Uuid) -> AppResult<Vec<FileVersion>> {
        sqlx::query_as::<_, FileVersion>(
            "SELECT * FROM file_versions WHERE file_id = $1 ORDER BY created_at DESC",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list file versions"))
    }

    async fn list_deleted_files(
        &self,
        owner_id: Option<Uuid>,
        deleted_before: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE is_deleted \
               AND ($1::uuid IS NULL OR owner_id = $1) \
               AND ($2::timestamptz IS NULL OR deleted_at <= $2) \
             ORDER BY deleted_at DESC",
        )
        .bind(owner_id)
        .bind(deleted_before)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list deleted files"))
    }

    async fn search_files(
        &self,
        owner_id: Uuid,
        query: &str,
        page: &PageRequest,
    ) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE owner_id = $1 AND NOT is_deleted AND name ILIKE $2 \
             ORDER BY name ASC LIMIT $3 OFFSET $4",
        )
        .bind(owner_id)
        .bind(like_pattern(query))
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to search files"))
    }

    async fn recent_files(
        &self,
        owner_id: Uuid,
        since: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE owner_id = $1 AND NOT is_deleted AND created_at >= $2 \
             ORDER BY created_at DESC LIMIT $3",
        )
        .bind(owner_id)
        .bind(since)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list recent files"))
    }
}
