//! Ledger events: the single currency every view is computed from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// What business step produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Full recognition of a regular sale at creation.
    Principal,
    /// Money taken up front on a prepaid sale.
    Prepayment,
    /// Remainder collected when a prepaid sale is completed.
    Completion,
    /// Discount applied when a prepaid sale completes.
    Discount,
    /// Price difference of one exchange.
    Exchange,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Principal => "principal",
            EventKind::Prepayment => "prepayment",
            EventKind::Completion => "completion",
            EventKind::Discount => "discount",
            EventKind::Exchange => "exchange",
        }
    }
}

/// One dated monetary effect of a sale.
///
/// Derived from the current sale state on every call. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    pub sale_id: String,
    pub kind: EventKind,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    pub revenue: Money,
    pub profit: Money,
    pub label: String,
}

impl LedgerEvent {
    pub(crate) fn new(
        sale_id: &str,
        kind: EventKind,
        timestamp: DateTime<Utc>,
        revenue: Money,
        profit: Money,
        label: String,
    ) -> Self {
        LedgerEvent {
            sale_id: sale_id.to_string(),
            kind,
            timestamp,
            revenue,
            profit,
            label,
        }
    }
}
