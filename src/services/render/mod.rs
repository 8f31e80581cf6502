//! Render pipeline: turn a pending report into a stored artifact.
//!
//! Stages: resolve context, project rows, serialize, persist the artifact,
//! stamp generation metrics, notify, and download-tracking bookkeeping.

pub mod pdf;
pub mod registry;
pub mod rows;
pub mod xlsx;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::ReportSettings;
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::{FileType, ReportShape, ReportType};
use crate::services::directory::HolderDirectory;
use crate::services::notifier::{Notifier, REPORT_READY_TEMPLATE, report_ready_variables};
use crate::services::ordering::{OrderSpec, OrderingError};
use crate::services::reports::report_filename;
use crate::services::storage::{ArtifactStore, report_key};

use registry::RenderContext;
use rows::{Locale, Projection};

/// Why a render did not produce an artifact.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Report {0} not found")]
    ReportNotFound(Uuid),

    #[error("Company {0} not found")]
    CompanyNotFound(Uuid),

    #[error("Report {0} has an unknown report or file type")]
    InvalidReport(Uuid),

    #[error("Reports of type {report_type} cannot be created as {}", .file_type.as_str())]
    Unsupported {
        report_type: ReportType,
        file_type: FileType,
    },

    #[error(transparent)]
    Ordering(#[from] OrderingError),

    #[error("Template error: {0}")]
    Template(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("XLSX error: {0}")]
    Xlsx(String),

    #[error("Render task failed: {0}")]
    Task(String),

    #[error(transparent)]
    App(#[from] AppError),
}

/// One render job's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    pub report_id: Uuid,
    /// Send the "report ready" notification to the requesting user.
    pub notify: bool,
    /// Leave `downloaded_at` for the first real download to stamp.
    pub track_downloads: bool,
}

/// Result of a successful render.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub report_id: Uuid,
    pub file_key: String,
    pub file_name: String,
    pub generation_time: i64,
}

/// Runs the pipeline against shared collaborators.
pub struct Renderer {
    pool: DbPool,
    directory: Arc<dyn HolderDirectory>,
    storage: Arc<dyn ArtifactStore>,
    notifier: Arc<dyn Notifier>,
    settings: ReportSettings,
    site_url: String,
}

impl Renderer {
    pub fn new(
        pool: DbPool,
        directory: Arc<dyn HolderDirectory>,
        storage: Arc<dyn ArtifactStore>,
        notifier: Arc<dyn Notifier>,
        settings: ReportSettings,
        site_url: String,
    ) -> Self {
        Self {
            pool,
            directory,
            storage,
            notifier,
            settings,
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URL of a report's download endpoint.
    pub fn download_url(&self, report_id: Uuid) -> String {
        format!("{}/api/v1/reports/{}/download", self.site_url, report_id)
    }

    /// Render a report. Re-running overwrites the artifact and metrics.
    pub async fn render(&self, request: RenderRequest) -> Result<RenderOutcome, RenderError> {
        let started = Instant::now();
        let report_id = request.report_id;

        // 1. Resolve context
        let report = self
            .pool
            .get_report_by_id(report_id)
            .await?
            .ok_or(RenderError::ReportNotFound(report_id))?;
        let shape = ReportShape::of(&report).ok_or(RenderError::InvalidReport(report_id))?;
        let render = registry::lookup(shape.report_type, shape.file_type)?;
        let order = OrderSpec::parse(&report.order_by)?;

        let user = match report.user_id {
            Some(user_id) => self.pool.get_user(user_id).await?,
            None => None,
        };
        let locale = Locale::from_language(user.as_ref().and_then(|u| u.language.as_deref()));

        let mut snapshot = self
            .directory
            .snapshot(report.company_id, report.report_at, order.field_order())
            .await?
            .ok_or(RenderError::CompanyNotFound(report.company_id))?;

        snapshot.shareholders = order.apply_presorted(std::mem::take(&mut snapshot.shareholders))?;
        snapshot.option_holders =
            order.apply_presorted(std::mem::take(&mut snapshot.option_holders))?;

        // 2-3. Project rows and serialize off the async workers
        let holder_count = snapshot.shareholders.len() + snapshot.option_holders.len();
        let projection = Projection {
            locale,
            show_percent: holder_count <= self.settings.percent_holder_limit,
            show_tracked: snapshot.has_tracked_securities(),
        };
        let company_name = snapshot.company.name.clone();
        let context = RenderContext {
            snapshot,
            projection,
        };
        let bytes = tokio::task::spawn_blocking(move || render(&context))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))??;

        // 4. Persist artifact
        let file_name = report_filename(&company_name, &report, shape.file_type);
        let file_key = report_key(report.company_id, report.id, &file_name);
        self.storage
            .save(&file_key, bytes, shape.file_type.content_type())
            .await?;
        self.pool
            .set_report_artifact(report.id, &file_key, &file_name)
            .await?;

        // 5. Summarize
        let generated_at = Utc::now();
        let generation_time = (generated_at - report.created_at).num_seconds().max(0);
        self.pool
            .mark_report_generated(report.id, generated_at, generation_time)
            .await?;

        // 6. Notify
        if request.notify {
            match user {
                Some(ref user) => {
                    let variables = report_ready_variables(
                        shape.report_type.as_str(),
                        &company_name,
                        &self.download_url(report.id),
                    );
                    if let Err(e) = self
                        .notifier
                        .send(&user.email, REPORT_READY_TEMPLATE, &variables)
                        .await
                    {
                        warn!(report_id = %report.id, "Failed to send report notification: {}", e);
                    }
                }
                None => {
                    warn!(report_id = %report.id, "Notification requested for a report without a user");
                }
            }
        }

        // 7. Download-tracking bookkeeping
        if !request.track_downloads {
            self.pool
                .mark_report_downloaded(report.id, generated_at)
                .await?;
        }

        info!(
            report_id = %report.id,
            company_id = %report.company_id,
            "Rendered {} ({} holders, {} s since request, {} ms render)",
            file_name,
            holder_count,
            generation_time,
            started.elapsed().as_millis()
        );

        Ok(RenderOutcome {
            report_id: report.id,
            file_key,
            file_name,
            generation_time,
        })
    }

    /// [`render`](Self::render), logging the failure instead of returning it.
    pub async fn render_logged(&self, request: RenderRequest) -> Option<RenderOutcome> {
        match self.render(request).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(report_id = %request.report_id, "Report rendering failed: {}", e);
                None
            }
        }
    }
}
