//! # Database Pool Management
//!
//! Opening the SQLite file and handing out repositories.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Opening the Store                                   │
//! │                                                                         │
//! │  CliConfig ──► DbConfig::new(path).max_connections(n)                  │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │  Database::new ── WAL + NORMAL sync + foreign keys + busy timeout      │
//! │                     │                                                   │
//! │                     ├──► migrations (unless disabled)                  │
//! │                     ▼                                                   │
//! │  ┌───────────────────────── SqlitePool ──────────────────────────┐    │
//! │  │  report reads (load_snapshot)     writes (import, payment)    │    │
//! │  └───────────────────────────────────────────────────────────────┘    │
//! │                     │                                                   │
//! │  load_snapshot() ── sales + exchanges, expenses,                       │
//! │                     revenue_changes, orders (one read transaction)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! Readers don't block writers and writers don't block readers, so a report
//! can run while a sale is being recorded. A writer that still finds the
//! file locked waits up to `busy_timeout` before failing.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tally_core::LedgerSnapshot;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::expense::{self, ExpenseRepository};
use crate::repository::order::{self, OrderRepository};
use crate::repository::revenue_change::{self, RevenueChangeRepository};
use crate::repository::sale::{self, SaleRepository};

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the store lives and how the pool behaves.
///
/// ```rust,ignore
/// let config = DbConfig::new("./tally.db").max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// How long a caller waits for a free connection. Default: 30s
    pub acquire_timeout: Duration,

    /// How long SQLite retries a locked file. Default: 5s
    pub busy_timeout: Duration,

    /// Apply pending migrations on open. Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Configuration for a database file, created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Private in-memory store (tests).
    ///
    /// Single connection that never idles out: closing it would drop the
    /// whole database.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
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

    fn is_memory(&self) -> bool {
        self.database_path == Path::new(MEMORY_PATH)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cloning is cheap: every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Opens (or creates) the store and prepares the pool.
    ///
    /// Runs pending migrations unless `config.run_migrations` is false.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening database"
        );

        let url = format!("sqlite://{}?mode=rwc", config.database_path.display());
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // off by default in SQLite
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        let idle_timeout = if config.is_memory() {
            None
        } else {
            Some(Duration::from_secs(600))
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(idle_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(memory = config.is_memory(), "Pool ready");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Applies pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the sale repository.
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    /// Returns the expense repository.
    pub fn expenses(&self) -> ExpenseRepository {
        ExpenseRepository::new(self.pool.clone())
    }

    /// Returns the revenue change repository.
    pub fn revenue_changes(&self) -> RevenueChangeRepository {
        RevenueChangeRepository::new(self.pool.clone())
    }

    /// Returns the order repository.
    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    /// Reads everything a report needs in one bulk pass.
    ///
    /// One query per table (two for sales and their exchanges), all inside a
    /// single read transaction so the snapshot is consistent across tables.
    /// Any failure fails the whole read: a report is never built from a
    /// partial snapshot.
    pub async fn load_snapshot(&self) -> DbResult<LedgerSnapshot> {
        let mut tx = self.pool.begin().await?;

        let sales = sale::load_all(&mut tx).await?;
        let expenses = expense::load_all(&mut tx).await?;
        let revenue_changes = revenue_change::load_all(&mut tx).await?;
        let orders = order::load_all(&mut tx).await?;

        tx.commit().await?;

        debug!(
            sales = sales.len(),
            expenses = expenses.len(),
            revenue_changes = revenue_changes.len(),
            orders = orders.len(),
            "Snapshot loaded"
        );

        Ok(LedgerSnapshot {
            sales,
            expenses,
            revenue_changes,
            orders,
        })
    }

    /// Waits for in-flight queries, then closes every connection. Later
    /// repository calls fail with `ConnectionFailed`.
    pub async fn close(&self) {
        debug!("Closing database");
        self.pool.close().await;
    }

    /// Whether a trivial query still succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tally_core::{
        Calendar, Expense, ExpenseRecurrence, Money, RevenueChange, Sale, SummaryComposer, Window,
    };

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        db.close().await;
        assert!(!db.health_check().await);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/tally-test.db")
            .max_connections(10)
            .busy_timeout(Duration::from_millis(250))
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.run_migrations);
        assert!(!config.is_memory());
        assert!(DbConfig::in_memory().is_memory());
    }

    #[tokio::test]
    async fn test_snapshot_feeds_period_summary() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let at = |h| Utc.with_ymd_and_hms(2024, 3, 5, h, 0, 0).unwrap();

        db.sales()
            .insert(&Sale {
                id: "s1".to_string(),
                barcode: "R-0001".to_string(),
                total: Money::from_units(1000),
                original_total: Money::from_units(1100),
                profit: Money::from_units(300),
                discount_amount: Money::from_units(100),
                is_pre_paid: false,
                prepaid_amount: Money::zero(),
                final_payment_at: None,
                is_exchanged: false,
                exchanges: vec![],
                total_before_exchange: None,
                profit_before_exchange: None,
                created_at: at(10),
            })
            .await
            .unwrap();
        db.expenses()
            .insert(&Expense {
                id: "e1".to_string(),
                description: "cleaning".to_string(),
                amount: Money::from_units(50),
                admin: false,
                is_fixed: false,
                recurrence: ExpenseRecurrence::Monthly,
                created_at: at(12),
            })
            .await
            .unwrap();
        db.revenue_changes()
            .insert(&RevenueChange {
                id: "c1".to_string(),
                description: "float".to_string(),
                amount: Money::from_units(20),
                created_at: at(8),
            })
            .await
            .unwrap();

        let snapshot = db.load_snapshot().await.unwrap();
        assert_eq!(snapshot.sales.len(), 1);
        assert_eq!(snapshot.expenses.len(), 1);
        assert_eq!(snapshot.revenue_changes.len(), 1);
        assert!(snapshot.orders.is_empty());

        let composer = SummaryComposer::new(&snapshot, Calendar::utc());
        let day = Window::day(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        let summary = composer.period_summary(day).unwrap();
        assert_eq!(summary.sales.revenue, Money::from_units(900));
        assert_eq!(summary.expenses.non_fixed, Money::from_units(50));
    }

    #[tokio::test]
    async fn test_loaders_read_through_the_callers_transaction() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        sqlx::query(
            "INSERT INTO revenue_changes (id, description, amount_cents, created_at) \
             VALUES ('c1', 'float', 2000, ?1)",
        )
        .bind(Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap())
        .execute(&mut *tx)
        .await
        .unwrap();

        let seen = revenue_change::load_all(&mut tx).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].amount, Money::from_units(20));
        tx.rollback().await.unwrap();

        let snapshot = db.load_snapshot().await.unwrap();
        assert!(snapshot.revenue_changes.is_empty());
        // the snapshot transaction is closed again
        db.expenses().list_all().await.unwrap();
    }
}
