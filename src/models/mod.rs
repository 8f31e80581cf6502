//! Domain models for the report server.

pub mod holder;
pub mod report;
pub mod user;

// Re-export commonly used types
pub use holder::{CompanyInfo, CompanySnapshot, HolderRecord, SecurityInfo, TrackedUnits};
pub use report::{
    CachedReportQuery, CreateReportRequest, FileType, ReportResponse, ReportShape, ReportStatus,
    ReportType,
};
pub use user::AuthenticatedUser;
