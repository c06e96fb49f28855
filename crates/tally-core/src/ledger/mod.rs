//! # Ledger
//!
//! Revenue recognition for sales.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   &[Sale] ──► decompose ──► EventStream ──┬──► aggregate(interval)      │
//! │                  │                        │        └─► Totals           │
//! │                  │                        │                             │
//! │                  └─► anomalies / skipped  └──► reconstruct(day)         │
//! │                      (warnings count)              └─► Reconstruction   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are recomputed from the current sale state on every call. A payment
//! completion or an exchange changes which events exist, so nothing here is
//! cached.

pub mod aggregate;
pub mod decompose;
pub mod event;
pub mod reconstruct;

pub use aggregate::{aggregate, Totals};
pub use decompose::{decompose, decompose_all, DecomposeError, Decomposition, EventStream, SaleAnomaly};
pub use event::{EventKind, LedgerEvent};
pub use reconstruct::{
    balance, reconstruct, EntryKind, HistoryEntry, Reconstruction, RegisterEntry, RegisterSource,
};
