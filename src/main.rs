//! PhynixDrive server
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use phynix_api::{AppState, build_app};
use phynix_auth::OAuthStateStore;
use phynix_core::config::{AppConfig, DatabaseProvider};
use phynix_core::error::AppError;
use phynix_database::{DatabasePool, MemoryStore, Stores};
use phynix_storage::StorageManager;
use phynix_worker::{CronScheduler, TrashPurgeJob, run_logged};

#[tokio::main]
async fn main() {
    let env = std::env::var("PHYNIX_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting PhynixDrive v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Metadata store ───────────────────────────────────
    let (stores, pool) = match config.database.provider {
        DatabaseProvider::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = DatabasePool::connect(&config.database).await?;

            tracing::info!("Running database migrations...");
            phynix_database::migration::run_migrations(pool.pool()).await?;
            tracing::info!("Database migrations complete");

            (Stores::postgres(pool.pool().clone()), Some(pool))
        }
        DatabaseProvider::Memory => {
            tracing::warn!("Using the in-memory metadata store; data is lost on exit");
            (Stores::memory(Arc::new(MemoryStore::new())), None)
        }
    };

    // ── Step 2: Blob storage ─────────────────────────────────────
    let storage = Arc::new(StorageManager::from_config(&config.storage, &config.server).await?);
    tracing::info!(
        provider = %storage.provider().provider_type(),
        "Storage provider initialized"
    );

    // ── Step 3: OAuth state store ────────────────────────────────
    let oauth_states = Arc::new(OAuthStateStore::from_config(&config.auth));
    oauth_states.start().await;

    // ── Step 4: Services ─────────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let worker_enabled = config.worker.enabled;
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let trash_config = config.trash.clone();
    let state = AppState::new(config, &stores, storage, Arc::clone(&oauth_states));

    // ── Step 5: Background jobs ──────────────────────────────────
    let mut scheduler = if worker_enabled {
        let job = Arc::new(TrashPurgeJob::new(state.trash_service.as_ref().clone()));
        if trash_config.purge_on_start {
            run_logged(job.as_ref()).await;
        }
        let scheduler = CronScheduler::new().await?;
        scheduler.register(&trash_config.purge_cron, job).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Background worker disabled");
        None
    };

    // ── Step 6: HTTP server ──────────────────────────────────────
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!("PhynixDrive listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")));

    // ── Step 7: Shutdown ─────────────────────────────────────────
    tracing::info!("Shutting down...");
    let cleanup = async {
        if let Some(scheduler) = scheduler.as_mut() {
            if let Err(e) = scheduler.shutdown().await {
                tracing::warn!(error = %e, "Scheduler did not shut down cleanly");
            }
        }
        oauth_states.shutdown().await;
        if let Some(pool) = pool {
            pool.close().await;
        }
    };
    if tokio::time::timeout(grace, cleanup).await.is_err() {
        tracing::warn!(grace_seconds = grace.as_secs(), "Shutdown grace period elapsed");
    }

    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C; shutting down");
    }
}
