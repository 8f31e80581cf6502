//! SeaORM database migrations.
//!
//! Written with the schema builder so the same migrations run on PostgreSQL
//! (production) and SQLite (tests).

pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_companies;
mod m20261001_000002_create_users;
mod m20261001_000003_create_holdings;
mod m20261001_000004_create_reports;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_companies::Migration),
            Box::new(m20261001_000002_create_users::Migration),
            Box::new(m20261001_000003_create_holdings::Migration),
            Box::new(m20261001_000004_create_reports::Migration),
        ]
    }
}
