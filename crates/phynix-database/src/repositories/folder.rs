//! Folder repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use phynix_core::error::{AppError, ErrorKind};
use phynix_core::result::AppResult;
use phynix_core::types::PageRequest;
use phynix_entity::file::{File, FileVersion};
use phynix_entity::folder::{CreateFolder, Folder};

use crate::store::{FolderStore, SubtreeChange};

use super::{SUBTREE_IDS, apply_usage_deltas, is_unique_violation, like_pattern};

const SIBLING_INDEX: &str = "folders_active_sibling_unique";

/// Repository for folder CRUD and subtree cascades.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    /// Create a new folder repository.
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
impl FolderStore for FolderRepository {
    async fn find_folder(&self, id: Uuid) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find folder"))
    }

    async fn find_sibling(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 AND name = $3 \
               AND NOT is_deleted",
        )
        .bind(owner_id)
        .bind(parent_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find sibling folder"))
    }

    async fn list_child_folders(&self, parent_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE parent_id = $1 AND NOT is_deleted ORDER BY name ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list child folders"))
    }

    async fn list_root_folders(&self, owner_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE owner_id = $1 AND parent_id IS NULL AND NOT is_deleted ORDER BY name ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list root folders"))
    }

    async fn create_folder(&self, data: &CreateFolder) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (id, name, parent_id, owner_id, path) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(data.parent_id)
        .bind(data.owner_id)
        .bind(&data.path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, SIBLING_INDEX) {
                AppError::conflict(format!("Folder '{}' already exists", data.name))
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to create folder", e)
            }
        })
    }

    async fn rename_folder(&self, id: Uuid, new_name: &str, new_path: &str) -> AppResult<Folder> {
        let mut tx = self.begin().await?;

        let current = sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("Failed to lock folder"))?
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;

        let renamed = sqlx::query_as::<_, Folder>(
            "UPDATE folders SET name = $2, path = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(new_name)
        .bind(new_path)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, SIBLING_INDEX) {
                AppError::conflict(format!("Folder '{new_name}' already exists"))
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to rename folder", e)
            }
        })?;

        let ids: Vec<Uuid> = sqlx::query_scalar::<_, Uuid>(SUBTREE_IDS)
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err("Failed to collect folder subtree"))?;

        // Descendant paths start with "<old path>/"; SUBSTRING is 1-based.
        let suffix_start = current.path.chars().count() as i32 + 1;
        sqlx::query(
            "UPDATE folders SET path = $2 || SUBSTRING(path FROM $3), updated_at = NOW() \
             WHERE id = ANY($1) AND id <> $4",
        )
        .bind(&ids)
        .bind(new_path)
        .bind(suffix_start)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to rewrite descendant paths"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit folder rename"))?;
        Ok(renamed)
    }

    async fn soft_delete_folder_tree(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<SubtreeChange> {
        let mut tx = self.begin().await?;

        let ids: Vec<Uuid> = sqlx::query_scalar::<_, Uuid>(SUBTREE_IDS)
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err("Failed to collect folder subtree"))?;

        let folders = sqlx::query(
            "UPDATE folders SET is_deleted = TRUE, deleted_at = $2, updated_at = $2 \
             WHERE id = ANY($1) AND NOT is_deleted",
        )
        .bind(&ids)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to soft-delete folders"))?
        .rows_affected();

        let files: Vec<(Uuid, i64)> = sqlx::query_as(
            "UPDATE files SET is_deleted = TRUE, deleted_at = $2, updated_at = $2 \
             WHERE folder_id = ANY($1) AND NOT is_deleted RETURNING owner_id, size_bytes",
        )
        .bind(&ids)
        .bind(at)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err("Failed to soft-delete files"))?;

        apply_usage_deltas(&mut tx, &files, -1).await?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit folder delete"))?;

        Ok(SubtreeChange {
            folders,
            files: files.len() as u64,
        })
    }

    async fn restore_folder_tree(&self, id: Uuid) -> AppResult<SubtreeChange> {
        let mut tx = self.begin().await?;

        let ids: Vec<Uuid> = sqlx::query_scalar::<_, Uuid>(SUBTREE_IDS)
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err("Failed to collect folder subtree"))?;

        let folders = sqlx::query(
            "UPDATE folders SET is_deleted = FALSE, deleted_at = NULL, updated_at = NOW() \
             WHERE id = ANY($1) AND is_deleted",
        )
        .bind(&ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, SIBLING_INDEX) {
                AppError::conflict("A folder with the same name already exists at the restore location")
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to restore folders", e)
            }
        })?
        .rows_affected();

        let files: Vec<(Uuid, i64)> = sqlx::query_as(
            "UPDATE files SET is_deleted = FALSE, deleted_at = NULL, updated_at = NOW() \
             WHERE folder_id = ANY($1) AND is_deleted RETURNING owner_id, size_bytes",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err("Failed to restore files"))?;

        apply_usage_deltas(&mut tx, &files, 1).await?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit folder restore"))?;

        Ok(SubtreeChange {
            folders,
            files: files.len() as u64,
        })
    }

    async fn purge_folder_tree(&self, id: Uuid) -> AppResult<SubtreeChange> {
        let mut tx = self.begin().await?;

        let ids: Vec<Uuid> = sqlx::query_scalar::<_, Uuid>(SUBTREE_IDS)
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err("Failed to collect folder subtree"))?;

        let file_ids: Vec<Uuid> =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM files WHERE folder_id = ANY($1)")
                .bind(&ids)
                .fetch_all(&mut *tx)
                .await
                .map_err(db_err("Failed to collect subtree files"))?;

        sqlx::query("DELETE FROM file_versions WHERE file_id = ANY($1)")
            .bind(&file_ids)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to purge file versions"))?;

        for table in ["grants", "shares"] {
            sqlx::query(&format!(
                "DELETE FROM {table} \
                 WHERE (resource_type = 'file' AND resource_id = ANY($1)) \
                    OR (resource_type = 'folder' AND resource_id = ANY($2))"
            ))
            .bind(&file_ids)
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to purge access records"))?;
        }

        let files = sqlx::query("DELETE FROM files WHERE id = ANY($1)")
            .bind(&file_ids)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to purge files"))?
            .rows_affected();

        let folders = sqlx::query("DELETE FROM folders WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to purge folders"))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(db_err("Failed to commit folder purge"))?;

        Ok(SubtreeChange { folders, files })
    }

    async fn list_subtree_files(&self, id: Uuid) -> AppResult<Vec<(File, Vec<FileVersion>)>> {
        let ids: Vec<Uuid> = sqlx::query_scalar::<_, Uuid>(SUBTREE_IDS)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to collect folder subtree"))?;

        let files = sqlx::query_as::<_, File>("SELECT * FROM files WHERE folder_id = ANY($1)")
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list subtree files"))?;

        let file_ids: Vec<Uuid> = files.iter().map(|f| f.id).collect();
        let versions = sqlx::query_as::<_, FileVersion>(
            "SELECT * FROM file_versions WHERE file_id = ANY($1)",
        )
        .bind(&file_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list subtree versions"))?;

        let mut by_file: HashMap<Uuid, Vec<FileVersion>> = HashMap::new();
        for version in versions {
            by_file.entry(version.file_id).or_default().push(version);
        }

        Ok(files
            .into_iter()
            .map(|file| {
                let versions = by_file.remove(&file.id).unwrap_or_default();
                (file, versions)
            })
            .collect())
    }

    async fn list_deleted_folders(
        &self,
        owner_id: Option<Uuid>,
        deleted_before: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE is_deleted \
               AND ($1::uuid IS NULL OR owner_id = $1) \
               AND ($2::timestamptz IS NULL OR deleted_at <= $2) \
             ORDER BY deleted_at DESC",
        )
        .bind(owner_id)
        .bind(deleted_before)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list deleted folders"))
    }

    async fn search_folders(
        &self,
        owner_id: Uuid,
        query: &str,
        page: &PageRequest,
    ) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE owner_id = $1 AND NOT is_deleted AND name ILIKE $2 \
             ORDER BY name ASC LIMIT $3 OFFSET $4",
        )
        .bind(owner_id)
        .bind(like_pattern(query))
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to search folders"))
    }
}
