//! Cron scheduler for periodic jobs.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use phynix_core::error::AppError;
use phynix_core::result::AppResult;

use crate::jobs::ScheduledJob;

/// Runs [`ScheduledJob`]s on cron expressions (six fields, with seconds).
pub struct CronScheduler {
    scheduler: JobScheduler,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new() -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;
        Ok(Self { scheduler })
    }

    /// Register a job to run on `cron`.
    pub async fn register(&self, cron: &str, job: Arc<dyn ScheduledJob>) -> AppResult<()> {
        let name = job.name().to_string();
        let task = Arc::clone(&job);
        let cron_job = CronJob::new_async(cron, move |_uuid, _lock| {
            let task = Arc::clone(&task);
            Box::pin(async move {
                run_logged(task.as_ref()).await;
            })
        })
        .map_err(|e| AppError::configuration(format!("Invalid schedule '{cron}' for {name}: {e}")))?;

        self.scheduler
            .add(cron_job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {name} schedule: {e}")))?;

        tracing::info!(job = %name, schedule = %cron, "Registered scheduled job");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}

/// Run a job once, logging the outcome instead of returning it.
pub async fn run_logged(job: &dyn ScheduledJob) {
    let started = std::time::Instant::now();
    match job.run().await {
        Ok(summary) => tracing::info!(
            job = %job.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            summary = %summary,
            "Scheduled job finished"
        ),
        Err(e) => tracing::error!(job = %job.name(), error = %e, "Scheduled job failed"),
    }
}
