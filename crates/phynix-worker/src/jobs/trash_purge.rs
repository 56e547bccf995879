//! Retention sweep over the trash.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use phynix_core::result::AppResult;
use phynix_service::TrashService;

use super::ScheduledJob;

/// Permanently deletes trashed items whose retention has run out.
#[derive(Debug)]
pub struct TrashPurgeJob {
    trash: TrashService,
    /// Held for the duration of a sweep so runs never overlap.
    running: Mutex<()>,
}

impl TrashPurgeJob {
    pub fn new(trash: TrashService) -> Self {
        Self {
            trash,
            running: Mutex::new(()),
        }
    }
}

#[async_trait]
impl ScheduledJob for TrashPurgeJob {
    fn name(&self) -> &str {
        "trash_purge"
    }

    async fn run(&self) -> AppResult<Value> {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("Previous trash purge still running, skipping");
            return Ok(serde_json::json!({ "task": "trash_purge", "skipped": true }));
        };

        let report = self.trash.auto_purge_expired(Utc::now()).await?;
        Ok(serde_json::json!({
            "task": "trash_purge",
            "folders_removed": report.folders,
            "files_removed": report.files,
            "failures": report.failures,
        }))
    }
}
