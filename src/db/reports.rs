//! Database queries for reports.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::entity::report::{self, ActiveModel, Entity as Report};
use crate::error::{AppError, AppResult};
use crate::models::ReportShape;

use super::DbPool;

/// Columns of a report row about to be created.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub id: Uuid,
    pub shape: ReportShape,
    pub user_id: Option<Uuid>,
    pub eta: DateTime<Utc>,
    pub report_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

fn filter_shape(
    select: sea_orm::Select<Report>,
    shape: &ReportShape,
) -> sea_orm::Select<Report> {
    select
        .filter(report::Column::CompanyId.eq(shape.company_id))
        .filter(report::Column::ReportType.eq(shape.report_type.as_str()))
        .filter(report::Column::OrderBy.eq(shape.order_by.as_str()))
        .filter(report::Column::FileType.eq(shape.file_type.as_str()))
}

impl DbPool {
    /// Insert a new pending report.
    pub async fn insert_report(&self, new: NewReport) -> AppResult<report::Model> {
        let model = ActiveModel {
            id: Set(new.id),
            company_id: Set(new.shape.company_id),
            user_id: Set(new.user_id),
            file_type: Set(new.shape.file_type.as_str().to_string()),
            report_type: Set(new.shape.report_type.as_str().to_string()),
            order_by: Set(new.shape.order_by),
            file_key: Set(None),
            file_name: Set(None),
            eta: Set(new.eta),
            generated_at: Set(None),
            generation_time: Set(None),
            report_at: Set(new.report_at),
            downloaded_at: Set(None),
            created_at: Set(new.created_at),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert report: {}", e)))
    }

    /// Get a report by ID.
    pub async fn get_report_by_id(&self, id: Uuid) -> AppResult<Option<report::Model>> {
        Report::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get report: {}", e)))
    }

    /// Most recently created report of a shape, optionally ignoring one row.
    pub async fn latest_report_for_shape(
        &self,
        shape: &ReportShape,
        exclude: Option<Uuid>,
    ) -> AppResult<Option<report::Model>> {
        let mut select = filter_shape(Report::find(), shape);
        if let Some(id) = exclude {
            select = select.filter(report::Column::Id.ne(id));
        }

        select
            .order_by_desc(report::Column::CreatedAt)
            .order_by_desc(report::Column::Id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get latest report: {}", e)))
    }

    /// Most recently generated report of a shape: the warm cache entry.
    pub async fn latest_generated_for_shape(
        &self,
        shape: &ReportShape,
    ) -> AppResult<Option<report::Model>> {
        filter_shape(Report::find(), shape)
            .filter(report::Column::GeneratedAt.is_not_null())
            .filter(report::Column::FileKey.is_not_null())
            .order_by_desc(report::Column::GeneratedAt)
            .order_by_desc(report::Column::Id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get cached report: {}", e)))
    }

    /// Point a report at its stored artifact.
    pub async fn set_report_artifact(&self, id: Uuid, file_key: &str, file_name: &str) -> AppResult<()> {
        Report::update_many()
            .col_expr(report::Column::FileKey, Expr::value(file_key))
            .col_expr(report::Column::FileName, Expr::value(file_name))
            .filter(report::Column::Id.eq(id))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to store report artifact: {}", e)))?;

        Ok(())
    }

    /// Stamp generation metrics. Both columns change in the same statement.
    pub async fn mark_report_generated(
        &self,
        id: Uuid,
        generated_at: DateTime<Utc>,
        generation_time: i64,
    ) -> AppResult<()> {
        Report::update_many()
            .col_expr(report::Column::GeneratedAt, Expr::value(generated_at))
            .col_expr(report::Column::GenerationTime, Expr::value(generation_time))
            .filter(report::Column::Id.eq(id))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to mark report generated: {}", e)))?;

        Ok(())
    }

    /// Unconditionally set `downloaded_at`.
    pub async fn mark_report_downloaded(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        Report::update_many()
            .col_expr(report::Column::DownloadedAt, Expr::value(at))
            .filter(report::Column::Id.eq(id))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to mark report downloaded: {}", e)))?;

        Ok(())
    }

    /// Set `downloaded_at` unless already set. Returns whether this call set it.
    pub async fn mark_first_download(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let result = Report::update_many()
            .col_expr(report::Column::DownloadedAt, Expr::value(at))
            .filter(report::Column::Id.eq(id))
            .filter(report::Column::DownloadedAt.is_null())
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to mark report downloaded: {}", e)))?;

        Ok(result.rows_affected > 0)
    }

    /// Batch reports (no requesting user) generated before `cutoff`.
    pub async fn batch_reports_generated_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<report::Model>> {
        Report::find()
            .filter(report::Column::UserId.is_null())
            .filter(report::Column::GeneratedAt.lt(cutoff))
            .order_by_asc(report::Column::GeneratedAt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list expired reports: {}", e)))
    }

    /// Delete a report row.
    pub async fn delete_report(&self, id: Uuid) -> AppResult<()> {
        Report::delete_by_id(id)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete report: {}", e)))?;

        Ok(())
    }
}
