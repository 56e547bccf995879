//! Scheduled job implementations.

pub mod trash_purge;

pub use trash_purge::TrashPurgeJob;

use async_trait::async_trait;
use serde_json::Value;

use phynix_core::result::AppResult;

/// A unit of periodic work.
#[async_trait]
pub trait ScheduledJob: Send + Sync + std::fmt::Debug {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Run once, returning a summary of the work done.
    async fn run(&self) -> AppResult<Value>;
}
