//! # Ledger Reconstructor
//!
//! "What happened on day X, and what was in the register before and after?"
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sale events ─┐                                                         │
//! │               ├──► split at start/end of day                            │
//! │  register ────┘         │                                               │
//! │  entries                ├── before start ──► opening balance            │
//! │                         └── inside day ───► sort by time (stable)       │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                          running = opening + Σ revenue so far           │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                                       closing balance                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Balances follow revenue only; profit never moves the register.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::event::{EventKind, LedgerEvent};
use crate::money::Money;
use crate::window::{Calendar, Interval};

// =============================================================================
// Entry Types
// =============================================================================

/// Where a non-sale register movement comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RegisterSource {
    Expense,
    RevenueChange,
}

/// A signed register movement that is not a sale (expense out, manual
/// adjustment in or out).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterEntry {
    pub source: RegisterSource,
    pub record_id: String,
    pub timestamp: DateTime<Utc>,
    pub amount: Money,
    pub label: String,
}

/// Kind of a history line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Principal,
    Prepayment,
    Completion,
    Discount,
    Exchange,
    Expense,
    RevenueChange,
}

impl From<EventKind> for EntryKind {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Principal => EntryKind::Principal,
            EventKind::Prepayment => EntryKind::Prepayment,
            EventKind::Completion => EntryKind::Completion,
            EventKind::Discount => EntryKind::Discount,
            EventKind::Exchange => EntryKind::Exchange,
        }
    }
}

impl From<RegisterSource> for EntryKind {
    fn from(source: RegisterSource) -> Self {
        match source {
            RegisterSource::Expense => EntryKind::Expense,
            RegisterSource::RevenueChange => EntryKind::RevenueChange,
        }
    }
}

/// One line of a day's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub kind: EntryKind,
    /// Sale id for sale events, record id otherwise.
    pub source_id: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    pub amount: Money,
    pub label: String,
    pub running_total_after: Money,
}

/// Exact (unrounded) view of one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    pub opening_balance: Money,
    pub entries: Vec<HistoryEntry>,
    pub closing_balance: Money,
}

// =============================================================================
// Reconstruction
// =============================================================================

/// Register balance made of every sale event and register entry in `interval`.
pub fn balance(events: &[LedgerEvent], register: &[RegisterEntry], interval: &Interval) -> Money {
    let sales: Money = events
        .iter()
        .filter(|e| interval.contains(e.timestamp))
        .map(|e| e.revenue)
        .sum();
    let other: Money = register
        .iter()
        .filter(|r| interval.contains(r.timestamp))
        .map(|r| r.amount)
        .sum();
    sales + other
}

/// Rebuilds one calendar day from the event stream and register entries.
///
/// Entries are sorted by timestamp; equal timestamps keep input order (sale
/// events first, then register entries as given).
pub fn reconstruct(
    events: &[LedgerEvent],
    register: &[RegisterEntry],
    date: NaiveDate,
    calendar: &Calendar,
) -> Reconstruction {
    let start = calendar.start_of_day(date);
    let day = Interval::between(start, calendar.end_of_day(date));
    let opening_balance = balance(events, register, &Interval::before(start));

    let mut lines: Vec<(EntryKind, &str, DateTime<Utc>, Money, &str)> = events
        .iter()
        .filter(|e| day.contains(e.timestamp))
        .map(|e| {
            let kind = EntryKind::from(e.kind);
            (kind, e.sale_id.as_str(), e.timestamp, e.revenue, e.label.as_str())
        })
        .chain(register.iter().filter(|r| day.contains(r.timestamp)).map(|r| {
            let kind = EntryKind::from(r.source);
            (kind, r.record_id.as_str(), r.timestamp, r.amount, r.label.as_str())
        }))
        .collect();
    lines.sort_by_key(|line| line.2);

    let mut running = opening_balance;
    let entries = lines
        .into_iter()
        .map(|(kind, source_id, timestamp, amount, label)| {
            running += amount;
            HistoryEntry {
                kind,
                source_id: source_id.to_string(),
                timestamp,
                amount,
                label: label.to_string(),
                running_total_after: running,
            }
        })
        .collect();

    Reconstruction {
        opening_balance,
        entries,
        closing_balance: running,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
