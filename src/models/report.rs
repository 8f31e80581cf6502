//! Report domain models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::report;

/// Output format of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum FileType {
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "XLS")]
    Xls,
}

impl FileType {
    pub const ALL: [FileType; 2] = [FileType::Pdf, FileType::Xls];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Xls => "XLS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PDF" => Some(Self::Pdf),
            "XLS" => Some(Self::Xls),
            _ => None,
        }
    }

    /// Extension of the stored artifact. XLS reports are written as OOXML.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xls => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Xls => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

/// Kind of statutory report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Captable,
    AssemblyParticipation,
    VestedShares,
}

impl ReportType {
    /// Report types covered by the nightly pre-render sweep.
    pub const PRERENDERED: [ReportType; 2] =
        [ReportType::Captable, ReportType::AssemblyParticipation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Captable => "captable",
            Self::AssemblyParticipation => "assembly_participation",
            Self::VestedShares => "vested_shares",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "captable" => Some(Self::Captable),
            "assembly_participation" => Some(Self::AssemblyParticipation),
            "vested_shares" => Some(Self::VestedShares),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ETA-calibration and cache key of a report.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportShape {
    pub company_id: Uuid,
    pub report_type: ReportType,
    pub order_by: String,
    pub file_type: FileType,
}

impl ReportShape {
    pub fn new(
        company_id: Uuid,
        report_type: ReportType,
        order_by: impl Into<String>,
        file_type: FileType,
    ) -> Self {
        Self {
            company_id,
            report_type,
            order_by: order_by.into(),
            file_type,
        }
    }

    /// Shape of a stored report, `None` if its columns hold unknown values.
    pub fn of(model: &report::Model) -> Option<Self> {
        Some(Self {
            company_id: model.company_id,
            report_type: ReportType::parse(&model.report_type)?,
            order_by: model.order_by.clone(),
            file_type: FileType::parse(&model.file_type)?,
        })
    }
}

/// Whether a report has been rendered yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Generated,
}

/// Request body for creating a report.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateReportRequest {
    pub report_type: ReportType,
    pub file_type: FileType,
    /// Ordering token, e.g. `user__last_name` or `share_count_desc`.
    pub order_by: String,
    /// As-of date; defaults to now.
    #[serde(default)]
    pub report_at: Option<DateTime<Utc>>,
}

/// Query string of the warm-cache lookup.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CachedReportQuery {
    pub report_type: ReportType,
    pub file_type: FileType,
    pub order_by: String,
}

/// Report as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportResponse {
    pub id: Uuid,
    pub company_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub report_type: String,
    pub file_type: String,
    pub order_by: String,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub eta: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// Seconds spent generating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_time: Option<i64>,
    pub report_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<report::Model> for ReportResponse {
    fn from(m: report::Model) -> Self {
        let status = if m.generated_at.is_some() {
            ReportStatus::Generated
        } else {
            ReportStatus::Pending
        };

        Self {
            id: m.id,
            company_id: m.company_id,
            user_id: m.user_id,
            report_type: m.report_type,
            file_type: m.file_type,
            order_by: m.order_by,
            status,
            file_name: m.file_name,
            eta: m.eta,
            generated_at: m.generated_at,
            generation_time: m.generation_time,
            report_at: m.report_at,
            downloaded_at: m.downloaded_at,
            created_at: m.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_roundtrip_and_extension() {
        assert_eq!(FileType::parse("PDF"), Some(FileType::Pdf));
        assert_eq!(FileType::parse("xls"), None);
        assert_eq!(FileType::Xls.extension(), "xlsx");
        assert_eq!(FileType::Pdf.extension(), "pdf");
    }

    #[test]
    fn test_report_type_serde_names() {
        let json = serde_json::to_string(&ReportType::AssemblyParticipation).unwrap();
        assert_eq!(json, "\"assembly_participation\"");

        let parsed: FileType = serde_json::from_str("\"XLS\"").unwrap();
        assert_eq!(parsed, FileType::Xls);
    }

    #[test]
    fn test_status_follows_generated_at() {
        let now = Utc::now();
        let mut model = report::Model {
            id: Uuid::now_v7(),
            company_id: Uuid::now_v7(),
            user_id: None,
            file_type: "PDF".to_string(),
            report_type: "captable".to_string(),
            order_by: "number".to_string(),
            file_key: None,
            file_name: None,
            eta: now,
            generated_at: None,
            generation_time: None,
            report_at: now,
            downloaded_at: None,
            created_at: now,
        };
        assert_eq!(ReportResponse::from(model.clone()).status, ReportStatus::Pending);

        model.generated_at = Some(now);
        assert_eq!(ReportResponse::from(model).status, ReportStatus::Generated);
    }
}
