//! Nightly sweep building a warm cache of common report shapes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

use crate::config::ReportSettings;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{FileType, ReportShape, ReportType};
use crate::services::directory::HolderDirectory;
use crate::services::ordering::ORDERING_TOKENS;
use crate::services::queue::{Job, JobQueue};
use crate::services::render::RenderRequest;
use crate::services::reports::{ReportRequest, create_report};

/// Companies with fewer shareholders are not worth pre-rendering.
pub const MIN_SHAREHOLDERS: u64 = 2;

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub companies: usize,
    /// Reports created and queued.
    pub created: usize,
    /// Shapes skipped because a report is still pending within its ETA.
    pub skipped: usize,
}

/// Creates and queues one report per company, report type, ordering token
/// and file type.
pub struct Prerenderer {
    pool: DbPool,
    directory: Arc<dyn HolderDirectory>,
    queue: Arc<dyn JobQueue>,
    settings: ReportSettings,
}

impl Prerenderer {
    pub fn new(
        pool: DbPool,
        directory: Arc<dyn HolderDirectory>,
        queue: Arc<dyn JobQueue>,
        settings: ReportSettings,
    ) -> Self {
        Self {
            pool,
            directory,
            queue,
            settings,
        }
    }

    /// Run one sweep.
    pub async fn run_sweep(&self) -> AppResult<SweepSummary> {
        let now = Utc::now();
        let companies = self.directory.sweep_candidates(MIN_SHAREHOLDERS).await?;
        let mut summary = SweepSummary {
            companies: companies.len(),
            ..Default::default()
        };

        for company in companies {
            for report_type in ReportType::PRERENDERED {
                for token in ORDERING_TOKENS {
                    for file_type in FileType::ALL {
                        let shape = ReportShape::new(company.id, report_type, token, file_type);

                        if self.is_pending(&shape, now).await? {
                            debug!(company_id = %company.id, "Skipping pending {:?}", shape);
                            summary.skipped += 1;
                            continue;
                        }

                        let report = create_report(
                            &self.pool,
                            &self.settings,
                            ReportRequest {
                                company_id: company.id,
                                report_type,
                                file_type,
                                order_by: token.to_string(),
                                user_id: None,
                                report_at: Some(now),
                            },
                        )
                        .await?;

                        self.queue.enqueue(Job::Render(RenderRequest {
                            report_id: report.id,
                            notify: false,
                            track_downloads: false,
                        }))?;
                        summary.created += 1;
                    }
                }
            }
        }

        Ok(summary)
    }

    /// Whether the newest report of `shape` is still pending within its ETA.
    async fn is_pending(&self, shape: &ReportShape, now: chrono::DateTime<Utc>) -> AppResult<bool> {
        let latest = self.pool.latest_report_for_shape(shape, None).await?;
        Ok(latest.is_some_and(|r| r.generated_at.is_none() && r.eta > now))
    }
}

/// Start the pre-render scheduler.
///
/// Every `interval_secs` a [`Job::Prerender`] is queued. The first sweep runs
/// one interval after startup.
pub fn start_prerender_task(queue: Arc<dyn JobQueue>, interval_secs: u64) {
    tokio::spawn(async move {
        info!("Starting pre-render scheduler (interval: {} seconds)", interval_secs);

        let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if let Err(e) = queue.enqueue(Job::Prerender) {
                error!("Pre-render scheduler stopping: {}", e);
                break;
            }
        }
    });
}
