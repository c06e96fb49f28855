//! # Repository Module
//!
//! One repository per table the ledger reads.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tally-cli                                                             │
//! │       │                                                                 │
//! │       │  db.load_snapshot()                                            │
//! │       ▼                                                                 │
//! │  SaleRepository ────────── sales + sale_exchanges (2 queries)          │
//! │  ExpenseRepository ─────── expenses                                    │
//! │  RevenueChangeRepository ─ revenue_changes                             │
//! │  OrderRepository ───────── orders                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerSnapshot → tally-core                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SaleRepository`](sale::SaleRepository) - Sales, exchanges, payment completion
//! - [`ExpenseRepository`](expense::ExpenseRepository) - Expense rows
//! - [`RevenueChangeRepository`](revenue_change::RevenueChangeRepository) - Register adjustments
//! - [`OrderRepository`](order::OrderRepository) - Delivery orders

pub mod expense;
pub mod order;
pub mod revenue_change;
pub mod sale;
