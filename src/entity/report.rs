//! Report entity: one generated-or-pending artifact.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    /// Requesting user; `None` for pre-rendered reports.
    pub user_id: Option<Uuid>,
    pub file_type: String,
    pub report_type: String,
    pub order_by: String,
    /// Storage key of the rendered artifact.
    pub file_key: Option<String>,
    pub file_name: Option<String>,
    pub eta: DateTimeUtc,
    pub generated_at: Option<DateTimeUtc>,
    /// Seconds between creation and completed rendering.
    pub generation_time: Option<i64>,
    pub report_at: DateTimeUtc,
    pub downloaded_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
