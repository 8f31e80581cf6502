//! Migration: Create shareholders, positions and option_positions tables.
//!
//! Holdings are a ledger: counts as of a date are derived from the
//! positions bought or sold up to that date.

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
                    .table(Shareholders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Shareholders::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Shareholders::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Shareholders::Number).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Shareholders::FirstName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Shareholders::LastName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Shareholders::Email).string_len(255))
                    .col(ColumnDef::new(Shareholders::Language).string_len(8))
                    .col(
                        ColumnDef::new(Shareholders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shareholders_company")
                            .from(Shareholders::Table, Shareholders::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_shareholders_company_number")
                    .table(Shareholders::Table)
                    .col(Shareholders::CompanyId)
                    .col(Shareholders::Number)
                    .unique()
                    .to_owned(),
            )
            .await?;

        for table in [Ledger::Positions, Ledger::OptionPositions] {
            let mut create = Table::create();
            create
                .table(table)
                .if_not_exists()
                .col(ColumnDef::new(Ledger::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Ledger::CompanyId).uuid().not_null())
                .col(ColumnDef::new(Ledger::SecurityId).uuid().not_null())
                .col(ColumnDef::new(Ledger::BuyerId).uuid())
                .col(ColumnDef::new(Ledger::SellerId).uuid())
                .col(ColumnDef::new(Ledger::Count).big_integer().not_null())
                .col(ColumnDef::new(Ledger::NumberSegments).text())
                .col(
                    ColumnDef::new(Ledger::BoughtAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(Ledger::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                );

            if matches!(table, Ledger::OptionPositions) {
                create.col(ColumnDef::new(Ledger::VestingMonths).integer());
            }

            manager.create_table(create.to_owned()).await?;
        }

        manager
            .create_index(
                Index::create()
                    .name("idx_positions_company_bought_at")
                    .table(Ledger::Positions)
                    .col(Ledger::CompanyId)
                    .col(Ledger::BoughtAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_option_positions_company_bought_at")
                    .table(Ledger::OptionPositions)
                    .col(Ledger::CompanyId)
                    .col(Ledger::BoughtAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ledger::OptionPositions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ledger::Positions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Shareholders::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Shareholders {
    Table,
    Id,
    CompanyId,
    Number,
    FirstName,
    LastName,
    Email,
    Language,
    CreatedAt,
}

/// Column names shared by `positions` and `option_positions`.
#[derive(DeriveIden, Clone, Copy)]
enum Ledger {
    Positions,
    OptionPositions,
    Id,
    CompanyId,
    SecurityId,
    BuyerId,
    SellerId,
    Count,
    NumberSegments,
    VestingMonths,
    BoughtAt,
    CreatedAt,
}
