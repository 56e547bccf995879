//! PostgreSQL implementations of the store traits.

pub mod file;
pub mod folder;
pub mod notification;
pub mod share;
pub mod user;

pub use file::FileRepository;
pub use folder::FolderRepository;
pub use notification::NotificationRepository;
pub use share::ShareRepository;
pub use user::UserRepository;

use std::collections::HashMap;

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use phynix_core::error::{AppError, ErrorKind};
use phynix_core::result::AppResult;

/// Recursive CTE selecting the IDs of folder `$1` and all its descendants.
pub(crate) const SUBTREE_IDS: &str = "WITH RECURSIVE tree AS ( \
        SELECT id FROM folders WHERE id = $1 \
        UNION ALL \
        SELECT f.id FROM folders f INNER JOIN tree t ON f.parent_id = t.id \
     ) SELECT id FROM tree";

/// Apply per-owner used-storage deltas inside an open transaction.
pub(crate) async fn apply_usage_deltas(
    tx: &mut Transaction<'_, Postgres>,
    rows: &[(Uuid, i64)],
    sign: i64,
) -> AppResult<()> {
    let mut per_owner: HashMap<Uuid, i64> = HashMap::new();
    for (owner_id, size) in rows {
        *per_owner.entry(*owner_id).or_default() += size * sign;
    }

    for (owner_id, delta) in per_owner {
        sqlx::query(
            "UPDATE users SET used_storage = GREATEST(used_storage + $2, 0), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(owner_id)
        .bind(delta)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update used storage", e)
        })?;
    }
    Ok(())
}

/// Charge `delta` bytes to a user's quota inside `tx`.
///
/// A positive delta only applies when it fits under `max_storage`; the check
/// and the write are one statement, so concurrent uploads cannot both pass.
/// Zero or negative deltas always apply.
pub(crate) async fn charge_usage(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
    delta: i64,
) -> AppResult<()> {
    if delta <= 0 {
        return apply_usage_deltas(tx, &[(owner_id, delta)], 1).await;
    }

    let charged = sqlx::query(
        "UPDATE users SET used_storage = used_storage + $2, updated_at = NOW() \
         WHERE id = $1 AND used_storage + $2 <= max_storage",
    )
    .bind(owner_id)
    .bind(delta)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update used storage", e))?;

    if charged.rows_affected() == 0 {
        return Err(AppError::validation("Upload would exceed storage limit"));
    }
    Ok(())
}

/// Whether a sqlx error is a violation of the named unique index.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.constraint() == Some(constraint))
}

/// `ILIKE` pattern matching `query` anywhere, with wildcards escaped.
pub(crate) fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
