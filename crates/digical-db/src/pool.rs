//! # Database Handle
//!
//! Opening the ledger file and handing out repositories.
//!
//! ## Connection Setup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Opening the Ledger                                   │
//! │                                                                         │
//! │  DbConfig::new("~/.local/share/digical/digical.db")                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  per connection:                                                       │
//! │    journal_mode = WAL        summary reads don't block a checkout      │
//! │    synchronous  = NORMAL                                               │
//! │    foreign_keys = ON         handler deletes SET NULL on history       │
//! │    busy_timeout = 5s         two `digical` processes may overlap       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  embedded migrations (001 schema, 002 default categories)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database ──► transactions() handlers() customers() products()         │
//! │               calculations() categories() summaries()                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::calculation::CalculationRepository;
use crate::repository::category::CategoryRepository;
use crate::repository::customer::CustomerRepository;
use crate::repository::handler::HandlerRepository;
use crate::repository::product::ProductRepository;
use crate::repository::summary::SummaryRepository;
use crate::repository::transaction::TransactionRepository;

/// Path that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// How to open the ledger.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/digical.db")
///     .max_connections(2)
///     .busy_timeout(Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// SQLite file, created on first open. [`IN_MEMORY`] for a scratch database.
    pub database_path: PathBuf,

    /// Default: 4
    pub max_connections: u32,

    /// How long to wait for a pooled connection. Default: 10 seconds
    pub acquire_timeout: Duration,

    /// How long SQLite retries a locked database before failing.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// `None` keeps idle connections forever; an in-memory database
    /// disappears with its last connection.
    pub idle_timeout: Option<Duration>,

    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(10),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(300)),
            run_migrations: true,
        }
    }

    /// A fresh, isolated database for tests.
    ///
    /// It has exactly one connection, so a multi-statement write must keep
    /// using its own transaction handle and never go back to the pool.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: None,
            ..DbConfig::new(IN_MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY)
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
        };

        options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
    }
}

// =============================================================================
// Database
// =============================================================================

/// An open ledger. Cloning shares the pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("digical.db")).await?;
/// let today = db.summaries().daily(date).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the database and, unless disabled, applies pending migrations.
    ///
    /// ## Errors
    /// - `ConnectionFailed` when the file can't be opened or created
    /// - `MigrationFailed` when the schema can't be brought up to date
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening ledger");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max_connections = config.max_connections,
            in_memory = config.is_in_memory(),
            "Pool ready"
        );

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Sales, expenses and atomic checkouts.
    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }

    /// Handlers and the active-handler flag.
    pub fn handlers(&self) -> HandlerRepository {
        HandlerRepository::new(self.pool.clone())
    }

    /// Customers, dues, settlements and balances.
    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Calculator log and handler performance.
    pub fn calculations(&self) -> CalculationRepository {
        CalculationRepository::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    /// Period totals, breakdowns and chart series.
    pub fn summaries(&self) -> SummaryRepository {
        SummaryRepository::new(self.pool.clone())
    }

    /// Waits for in-flight queries and closes every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Ledger closed");
    }

    /// `true` while the database still answers queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_databases_are_isolated() {
        let a = Database::new(DbConfig::in_memory()).await.unwrap();
        let b = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(a.health_check().await);

        sqlx::query("DELETE FROM categories").execute(a.pool()).await.unwrap();

        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(b.pool())
            .await
            .unwrap();
        assert_eq!(left, 11);
    }

    #[tokio::test]
    async fn test_closed_database_is_unhealthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[tokio::test]
    async fn test_skipping_migrations_leaves_no_schema() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false)).await.unwrap();
        let err = sqlx::query("SELECT COUNT(*) FROM transactions").execute(db.pool()).await;
        assert!(err.is_err());
    }

    #[test]
    fn test_config() {
        let config = DbConfig::new("/tmp/ledger.db")
            .max_connections(0)
            .busy_timeout(Duration::from_millis(250));
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.is_in_memory());

        let memory = DbConfig::in_memory();
        assert!(memory.is_in_memory());
        assert_eq!(memory.idle_timeout, None);
        assert_eq!(memory.max_connections, 1);
    }
}
