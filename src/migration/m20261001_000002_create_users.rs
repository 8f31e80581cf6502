//! Migration: Create users and operators tables.
//!
//! Operators link users to the companies they may manage.

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
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Email).string_len(255).not_null())
                    .col(ColumnDef::new(Users::FirstName).string_len(100))
                    .col(ColumnDef::new(Users::LastName).string_len(100))
                    .col(ColumnDef::new(Users::Language).string_len(8))
                    .col(
                        ColumnDef::new(Users::ApiKeyHash)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Operators::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Operators::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Operators::UserId).uuid().not_null())
                    .col(ColumnDef::new(Operators::CompanyId).uuid().not_null())
                    .col(
                        ColumnDef::new(Operators::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_operators_user")
                            .from(Operators::Table, Operators::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_operators_company")
                            .from(Operators::Table, Operators::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_operators_user_company")
                    .table(Operators::Table)
                    .col(Operators::UserId)
                    .col(Operators::CompanyId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Operators::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    FirstName,
    LastName,
    Language,
    ApiKeyHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Operators {
    Table,
    Id,
    UserId,
    CompanyId,
    CreatedAt,
}
