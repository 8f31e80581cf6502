//! Report descriptors: creation with an ETA, and artifact naming.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::ReportSettings;
use crate::db::DbPool;
use crate::db::reports::NewReport;
use crate::entity::report;
use crate::error::AppResult;
use crate::models::{FileType, ReportShape, ReportType};
use crate::services::eta;
use crate::services::ordering::OrderSpec;

/// Parameters of a report to create.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub company_id: Uuid,
    pub report_type: ReportType,
    pub file_type: FileType,
    pub order_by: String,
    /// `None` for reports created by the pre-render sweep.
    pub user_id: Option<Uuid>,
    pub report_at: Option<DateTime<Utc>>,
}

impl ReportRequest {
    pub fn shape(&self) -> ReportShape {
        ReportShape::new(
            self.company_id,
            self.report_type,
            self.order_by.clone(),
            self.file_type,
        )
    }
}

/// Create a pending report. The ETA is computed before the row is written.
pub async fn create_report(
    pool: &DbPool,
    settings: &ReportSettings,
    request: ReportRequest,
) -> AppResult<report::Model> {
    OrderSpec::parse(&request.order_by)?;

    let id = Uuid::now_v7();
    let now = Utc::now();
    let shape = request.shape();
    let eta = eta::estimate(pool, &shape, id, now, settings.default_eta_secs).await?;

    let report = pool
        .insert_report(NewReport {
            id,
            shape,
            user_id: request.user_id,
            eta,
            report_at: request.report_at.unwrap_or(now),
            created_at: now,
        })
        .await?;

    info!(
        report_id = %report.id,
        company_id = %report.company_id,
        "Created {} {} report ordered by {} (eta {})",
        report.report_type,
        report.file_type,
        report.order_by,
        report.eta
    );

    Ok(report)
}

/// `<company slug>_<report id>_<report type>.<extension>`.
pub fn report_filename(company_name: &str, report: &report::Model, file_type: FileType) -> String {
    format!(
        "{}_{}_{}.{}",
        slugify(company_name),
        report.id,
        report.report_type,
        file_type.extension()
    )
}

/// Lowercase ASCII slug; runs of other characters become a single `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        let replacement = match c {
            'ä' => Some("a"),
            'ö' => Some("o"),
            'ü' => Some("u"),
            'ß' => Some("ss"),
            'é' | 'è' | 'ê' => Some("e"),
            _ => None,
        };

        if let Some(ascii) = replacement {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push_str(ascii);
        } else if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}
