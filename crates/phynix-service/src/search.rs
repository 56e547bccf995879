//! Name search and recent files.

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use phynix_core::error::AppError;
use phynix_core::result::AppResult;
use phynix_core::types::PageRequest;
use phynix_database::{FileStore, FolderStore};
use phynix_entity::file::File;
use phynix_entity::folder::Folder;

use crate::context::RequestContext;

const DEFAULT_RECENT_DAYS: i64 = 7;
const MAX_RECENT_DAYS: i64 = 90;
const DEFAULT_RECENT_LIMIT: u64 = 20;
const MAX_RECENT_LIMIT: u64 = 100;

/// Search parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u64>,
}

/// Matches for one query, split by resource type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub folders: Vec<Folder>,
    pub files: Vec<File>,
}

/// Searches the caller's own active files and folders.
#[derive(Clone)]
pub struct SearchService {
    folders: Arc<dyn FolderStore>,
    files: Arc<dyn FileStore>,
}

impl std::fmt::Debug for SearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService").finish()
    }
}

impl SearchService {
    pub fn new(folders: Arc<dyn FolderStore>, files: Arc<dyn FileStore>) -> Self {
        Self { folders, files }
    }

    /// Case-insensitive substring match on names.
    pub async fn search(&self, ctx: &RequestContext, query: SearchQuery) -> AppResult<SearchResults> {
        let q = query.q.trim();
        if q.is_empty() {
            return Err(AppError::validation("Search query is required"));
        }
        let defaults = PageRequest::default();
        let page = PageRequest::new(
            query.page.unwrap_or(defaults.page),
            query.page_size.unwrap_or(defaults.page_size),
        );

        let folders = self.folders.search_folders(ctx.user_id, q, &page).await?;
        let files = self.files.search_files(ctx.user_id, q, &page).await?;

        Ok(SearchResults {
            query: q.to_string(),
            folders,
            files,
        })
    }

    /// Files the caller uploaded in the last `days` days, newest first.
    pub async fn recent(
        &self,
        ctx: &RequestContext,
        days: Option<i64>,
        limit: Option<u64>,
    ) -> AppResult<Vec<File>> {
        let days = days.unwrap_or(DEFAULT_RECENT_DAYS).clamp(1, MAX_RECENT_DAYS);
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, MAX_RECENT_LIMIT);
        let since = ctx.request_time - Duration::days(days);
        self.files.recent_files(ctx.user_id, since, limit).await
    }
}

#[cfg(test)]
mod tests {
    use phynix_core::error::ErrorKind;

    use super::*;
    use crate::testing::Harness;

    fn query(q: &str) -> SearchQuery {
        SearchQuery {
            q: q.into(),
            ..SearchQuery::default()
        }
    }

    #[tokio::test]
    async fn test_search_is_owner_scoped_and_skips_trash() {
        let h = Harness::new();
        let alice = h.user("alice@x.io").await;
        let bob = h.user("bob@x.io").await;
        h.folder(&alice, "Reports").await;
        h.upload(&alice, None, "report-q1.pdf", b"1").await;
        let gone = h.upload(&alice, None, "REPORT-old.pdf", b"2").await;
        h.files.delete_file(&alice, gone.id).await.unwrap();
        h.upload(&bob, None, "report-bob.pdf", b"3").await;

        let results = h.search.search(&alice, query("  report ")).await.unwrap();
        assert_eq!(results.query, "report");
        assert_eq!(results.folders.len(), 1);
        assert_eq!(results.files.len(), 1);
        assert_eq!(results.files[0].name, "report-q1.pdf");

        let err = h.search.search(&alice, query("   ")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_recent_lists_new_uploads() {
        let h = Harness::new();
        let alice = h.user("alice@x.io").await;
        h.upload(&alice, None, "a.txt", b"a").await;
        h.upload(&alice, None, "b.txt", b"b").await;

        let recent = h.search.recent(&alice, Some(0), Some(1)).await.unwrap();
        assert_eq!(recent.len(), 1);

        let recent = h.search.recent(&alice, None, None).await.unwrap();
        assert_eq!(recent.len(), 2);
    }
}
