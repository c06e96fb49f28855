//! Window aggregation: a membership test and a fold.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::event::LedgerEvent;
use crate::money::Money;
use crate::window::Interval;

/// Revenue and profit recognized inside a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub revenue: Money,
    pub profit: Money,
}

impl Totals {
    pub fn add(&mut self, revenue: Money, profit: Money) {
        self.revenue += revenue;
        self.profit += profit;
    }
}

/// Sums every event whose timestamp falls in `interval`.
pub fn aggregate(events: &[LedgerEvent], interval: &Interval) -> Totals {
    events
        .iter()
        .filter(|e| interval.contains(e.timestamp))
        .fold(Totals::default(), |mut totals, e| {
            totals.add(e.revenue, e.profit);
            totals
        })
}
