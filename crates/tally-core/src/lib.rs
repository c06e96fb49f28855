//! # tally-core: Revenue Recognition for a Retail Backend
//!
//! This crate turns sales, expenses, register adjustments and delivery orders
//! into revenue, profit and register-balance reports. Pure functions only.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/tally-cli                               │   │
//! │  │    period, all-time, total-revenue, history, trend, ...         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ LedgerSnapshot                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  ledger   │  │  window   │  │  summary  │  │ analytics │  │   │
//! │  │   │ decompose │  │  Window   │  │  period   │  │   trend   │  │   │
//! │  │   │ aggregate │  │ Calendar  │  │  history  │  │  hourly   │  │   │
//! │  │   │reconstruct│  │ Interval  │  │  totals   │  │  expenses │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                ▲                                        │
//! │  ┌─────────────────────────────┴───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │        SQLite queries, migrations, load_snapshot()              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Sale, Exchange, Expense, Order, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`window`] - Reporting windows and the business calendar
//! - [`ledger`] - Sale decomposition, window aggregation, day reconstruction
//! - [`expenses`] - Expense breakdown and register entries
//! - [`summary`] - Report shapes built from one decomposition
//! - [`analytics`] - Trend, hourly and expense charts
//! - [`validation`] - Request parameter validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **One Decomposition**: every report reads the same event stream
//! 2. **No I/O**: the snapshot is handed in by the caller
//! 3. **Integer Money**: all amounts are cents (i64); rounding only on publish
//! 4. **Isolated Failures**: one malformed sale is skipped and counted
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{NaiveDate, TimeZone, Utc};
//! use tally_core::{LedgerSnapshot, Money, Sale, SummaryComposer, Window};
//! use tally_core::window::Calendar;
//!
//! let sale = Sale {
//!     id: "s1".to_string(),
//!     barcode: "R-0001".to_string(),
//!     total: Money::from_units(1000),
//!     original_total: Money::from_units(1100),
//!     profit: Money::from_units(300),
//!     discount_amount: Money::from_units(100),
//!     is_pre_paid: false,
//!     prepaid_amount: Money::zero(),
//!     final_payment_at: None,
//!     is_exchanged: false,
//!     exchanges: vec![],
//!     total_before_exchange: None,
//!     profit_before_exchange: None,
//!     created_at: Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
//! };
//! let snapshot = LedgerSnapshot { sales: vec![sale], ..Default::default() };
//!
//! let composer = SummaryComposer::new(&snapshot, Calendar::utc());
//! let day = Window::day(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
//! let summary = composer.period_summary(day).unwrap();
//!
//! assert_eq!(summary.sales.revenue, Money::from_units(900));
//! assert_eq!(summary.sales.profit, Money::from_units(200));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod error;
pub mod expenses;
pub mod ledger;
pub mod money;
pub mod summary;
pub mod types;
pub mod validation;
pub mod window;

#[cfg(test)]
pub(crate) mod fixtures;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tally_core::Money` instead of
// `use tally_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use summary::SummaryComposer;
pub use types::*;
pub use window::{Calendar, Window};
