//! Scheduled background jobs for PhynixDrive.
//!
//! Jobs run on a cron schedule, independent of request traffic, against the
//! same stores the API uses.

pub mod jobs;
pub mod scheduler;

pub use jobs::{ScheduledJob, TrashPurgeJob};
pub use scheduler::{CronScheduler, run_logged};
