//! # tally-db: Database Layer for Tally
//!
//! SQLite storage for sales, expenses, register adjustments and orders, and
//! the bulk snapshot read that feeds the ledger engine.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  tally-cli (period / history / trend ...)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  sale.rs      │    │  (embedded)  │  │   │
//! │  │   │               │    │  expense.rs   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  order.rs     │    │ 001_initial_ │  │   │
//! │  │   │ load_snapshot │    │  revenue_...  │    │   schema.sql │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerSnapshot → tally-core::SummaryComposer                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - `DbConfig`, `Database` and the snapshot read
//! - [`migrations`] - Schema embedded from `migrations/sqlite`
//! - [`error`] - `DbError` and its mapping onto `CoreError`
//! - [`repository`] - One repository per table family
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./tally.db")).await?;
//! let snapshot = db.load_snapshot().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::expense::ExpenseRepository;
pub use repository::order::OrderRepository;
pub use repository::revenue_change::RevenueChangeRepository;
pub use repository::sale::SaleRepository;
