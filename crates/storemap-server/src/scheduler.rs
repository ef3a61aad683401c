//! Background job scheduler.
//!
//! Registers the recurring remote sync when `STOREMAP_SYNC_CRON` is set.

use std::sync::Arc;

use storemap_core::{AppConfig, ChainScope};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::ServerSync;

/// Builds and starts the background job scheduler.
///
/// The returned handle must be kept alive for the lifetime of the process;
/// dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is rejected, or the scheduler fails to start.
pub async fn build_scheduler(
    store_sync: Arc<ServerSync>,
    config: &AppConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    match config.sync_cron.as_deref() {
        Some(cron) => register_sync_job(&scheduler, store_sync, cron).await?,
        None => tracing::info!("STOREMAP_SYNC_CRON not set; scheduled sync disabled"),
    }

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the full remote sync on `cron` (six-field, seconds first).
async fn register_sync_job(
    scheduler: &JobScheduler,
    store_sync: Arc<ServerSync>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let store_sync = Arc::clone(&store_sync);

        Box::pin(async move {
            tracing::info!("scheduler: starting store sync");
            run_sync_job(&store_sync).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: store sync registered");
    Ok(())
}

async fn run_sync_job(store_sync: &ServerSync) {
    match store_sync.get_stores(&ChainScope::All, true).await {
        Ok(snapshot) => {
            let reconcile = snapshot.reconcile.unwrap_or_default();
            tracing::info!(
                total = snapshot.stats.total,
                missing_coordinates = snapshot.stats.missing_coordinates,
                added = reconcile.added,
                removed = reconcile.removed,
                updated = reconcile.updated,
                update_failures = reconcile.update_failures,
                backfilled = snapshot.backfill.updated,
                "scheduler: store sync complete"
            );
        }
        Err(e) => tracing::error!(error = %e, "scheduler: store sync failed"),
    }
}
