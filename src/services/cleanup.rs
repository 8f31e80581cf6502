//! Cleanup service for purging superseded pre-rendered reports.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::ReportShape;
use crate::services::storage::ArtifactStore;

/// Configuration for the cleanup service.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Batch reports generated longer ago than this are purged
    pub retention_hours: u64,
    /// How often to run cleanup (in seconds)
    pub interval_secs: u64,
}

/// Counts from one cleanup cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    pub deleted: usize,
    /// Expired reports kept because they are the newest of their shape.
    pub kept: usize,
    pub errors: usize,
}

/// Start the cleanup background task.
pub fn start_cleanup_task(pool: DbPool, storage: Arc<dyn ArtifactStore>, config: CleanupConfig) {
    tokio::spawn(async move {
        info!(
            "Starting cleanup service (retention: {} hours, interval: {} seconds)",
            config.retention_hours, config.interval_secs
        );

        let mut ticker = interval(Duration::from_secs(config.interval_secs.max(1)));

        loop {
            ticker.tick().await;

            let cutoff = Utc::now() - chrono::Duration::hours(config.retention_hours as i64);
            match run_cleanup(&pool, storage.as_ref(), cutoff).await {
                Ok(summary) if summary.deleted > 0 || summary.errors > 0 => info!(
                    "Report cleanup: {} deleted, {} kept, {} errors",
                    summary.deleted, summary.kept, summary.errors
                ),
                Ok(_) => {}
                Err(e) => error!("Cleanup task error: {}", e),
            }
        }
    });
}

/// Delete batch reports generated before `cutoff`, except the newest
/// generated report of each shape.
pub async fn run_cleanup(
    pool: &DbPool,
    storage: &dyn ArtifactStore,
    cutoff: DateTime<Utc>,
) -> AppResult<CleanupSummary> {
    let expired = pool.batch_reports_generated_before(cutoff).await?;
    let mut summary = CleanupSummary::default();

    for report in expired {
        if let Some(shape) = ReportShape::of(&report) {
            let newest = pool.latest_generated_for_shape(&shape).await?;
            if newest.is_some_and(|n| n.id == report.id) {
                summary.kept += 1;
                continue;
            }
        }

        if let Some(ref key) = report.file_key
            && let Err(e) = storage.delete(key).await
        {
            warn!(report_id = %report.id, "Failed to delete report artifact: {}", e);
            summary.errors += 1;
            continue;
        }

        pool.delete_report(report.id).await?;
        summary.deleted += 1;
    }

    Ok(summary)
}
