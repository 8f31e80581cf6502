//! Migration: Create reports table.
//!
//! One row per generated-or-pending artifact. The shape index backs the
//! ETA lookup and the pre-render cache.

use sea_orm_migration::prelude::*;

use super::m20261001_000001_create_companies::Companies;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reports::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Reports::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Reports::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Reports::UserId).uuid())
                    .col(ColumnDef::new(Reports::FileType).string_len(8).not_null())
                    .col(ColumnDef::new(Reports::ReportType).string_len(32).not_null())
                    .col(ColumnDef::new(Reports::OrderBy).string_len(64).not_null())
                    .col(ColumnDef::new(Reports::FileKey).string_len(512))
                    .col(ColumnDef::new(Reports::FileName).string_len(255))
                    .col(
                        ColumnDef::new(Reports::Eta)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reports::GeneratedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Reports::GenerationTime).big_integer())
                    .col(
                        ColumnDef::new(Reports::ReportAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reports::DownloadedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Reports::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reports_company")
                            .from(Reports::Table, Reports::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reports_shape_created_at")
                    .table(Reports::Table)
                    .col(Reports::CompanyId)
                    .col(Reports::ReportType)
                    .col(Reports::OrderBy)
                    .col(Reports::FileType)
                    .col(Reports::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reports_generated_at")
                    .table(Reports::Table)
                    .col(Reports::GeneratedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reports::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Reports {
    Table,
    Id,
    CompanyId,
    UserId,
    FileType,
    ReportType,
    OrderBy,
    FileKey,
    FileName,
    Eta,
    GeneratedAt,
    GenerationTime,
    ReportAt,
    DownloadedAt,
    CreatedAt,
}
