//! Database module providing connection management, migrations, and queries.

pub mod holders;
pub mod reports;
pub mod users;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::migration::Migrator;

/// Database connection pool wrapper.
///
/// `DatabaseConnection` is itself a pool, so cloning is cheap.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration.
    pub async fn new(config: &Config) -> AppResult<Self> {
        Self::connect(&config.database_url, config.db_max_connections).await
    }

    /// Connect to `url` with at most `max_connections` pooled connections.
    pub async fn connect(url: &str, max_connections: u32) -> AppResult<Self> {
        let mut options = ConnectOptions::new(url.to_string());
        options
            .max_connections(max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        info!("Database connection established (max {} connections)", max_connections);

        Ok(Self { conn })
    }

    /// A migrated in-memory SQLite database.
    ///
    /// Limited to one connection so every query sees the same database.
    pub async fn in_memory() -> AppResult<Self> {
        let pool = Self::connect("sqlite::memory:", 1).await?;
        pool.run_migrations().await?;
        Ok(pool)
    }

    /// Apply all pending migrations.
    pub async fn run_migrations(&self) -> AppResult<()> {
        Migrator::up(&self.conn, None)
            .await
            .map_err(|e| AppError::Database(format!("Failed to run migrations: {}", e)))?;
        Ok(())
    }

    /// Get access to the connection for executing queries.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Database round trip behind `/ready`.
    pub async fn ping(&self) -> AppResult<()> {
        self.conn
            .ping()
            .await
            .map_err(|e| AppError::Database(format!("Database ping failed: {}", e)))
    }
}
