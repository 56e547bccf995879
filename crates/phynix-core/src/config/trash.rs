//! Trash retention configuration.

use serde::{Deserialize, Serialize};

/// Trash retention and auto-purge schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashConfig {
    /// Days a soft-deleted item stays recoverable.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// Cron expression (with seconds) for the auto-purge sweep.
    #[serde(default = "default_purge_cron")]
    pub purge_cron: String,
    /// Run one sweep immediately at startup.
    #[serde(default = "default_true")]
    pub purge_on_start: bool,
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            purge_cron: default_purge_cron(),
            purge_on_start: true,
        }
    }
}

fn default_retention_days() -> i64 {
    30
}

fn default_purge_cron() -> String {
    "0 0 * * * *".to_string()
}

fn default_true() -> bool {
    true
}
