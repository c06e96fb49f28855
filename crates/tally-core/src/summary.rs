//! # Summary Composer
//!
//! The report shapes the dashboard reads, all built from ONE decomposition of
//! the snapshot.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LedgerSnapshot ──► SummaryComposer::new ──► EventStream (once)         │
//! │                                        └──► RegisterEntry list (once)   │
//! │                                                                         │
//! │   period_summary(window)   sales + orders + expenses for a window      │
//! │   all_time_summary()       sales + orders since the first record       │
//! │   total_revenue()          register balance, with breakdown            │
//! │   day_history(date)        opening, itemized day, closing              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Formulas
//! ```text
//! turnover      = sales revenue + orders revenue          (window)
//! net profit    = sales profit + orders profit - expenses (window)
//! total revenue = sales revenue - variable expenses + revenue changes (all)
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::expenses::{
    period_expenses, register_entries, register_outflow, revenue_change_total, ExpenseBreakdown,
};
use crate::ledger::{
    aggregate, decompose_all, reconstruct, EventStream, HistoryEntry, LedgerEvent, RegisterEntry,
    Totals,
};
use crate::money::Money;
use crate::types::{LedgerSnapshot, Order};
use crate::window::{Calendar, Interval, Window};

// =============================================================================
// Response Shapes
// =============================================================================

/// Figures for one bounded window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub window: Window,
    pub sales: Totals,
    pub orders: Totals,
    pub expenses: ExpenseBreakdown,
    pub turnover: Money,
    pub net_profit: Money,
    pub all_time_sales: Totals,
    pub all_time_orders: Totals,
    /// Register balance over all time.
    pub total_revenue: Money,
    pub warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AllTimeSummary {
    pub sales: Totals,
    pub orders: Totals,
    pub total_revenue: Money,
    pub warnings: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RevenueBreakdown {
    pub sales_revenue: Money,
    pub non_fixed_expenses: Money,
    pub revenue_changes: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TotalRevenue {
    pub total_revenue: Money,
    pub breakdown: RevenueBreakdown,
    pub warnings: usize,
}

/// Published day view. Balances are rounded to whole units; entry amounts
/// are not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DayHistory {
    #[ts(as = "String")]
    pub selected_date: NaiveDate,
    pub opening_balance: Money,
    pub closing_balance: Money,
    pub change_count: usize,
    pub entries: Vec<HistoryEntry>,
    pub warnings: usize,
}

// =============================================================================
// Composer
// =============================================================================

/// Builds every report from one decomposition of a snapshot.
pub struct SummaryComposer<'a> {
    snapshot: &'a LedgerSnapshot,
    calendar: Calendar,
    stream: EventStream,
    register: Vec<RegisterEntry>,
}

impl<'a> SummaryComposer<'a> {
    pub fn new(snapshot: &'a LedgerSnapshot, calendar: Calendar) -> Self {
        let stream = decompose_all(&snapshot.sales);
        let register = register_entries(&snapshot.expenses, &snapshot.revenue_changes);
        SummaryComposer {
            snapshot,
            calendar,
            stream,
            register,
        }
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        self.snapshot
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.stream.events
    }

    pub fn stream(&self) -> &EventStream {
        &self.stream
    }

    /// Anomalous plus skipped sales.
    pub fn warnings(&self) -> usize {
        self.stream.warning_count()
    }

    /// Checks that `window` can be summarized as a period.
    ///
    /// The all-time window is rejected: fixed expenses have no finite count
    /// over it. Use [`Self::all_time_summary`].
    pub fn period_window(window: Window) -> CoreResult<Window> {
        if window.is_all_time() {
            return Err(CoreError::UnsupportedWindow {
                operation: "period summary".to_string(),
                reason: "use the all-time summary instead".to_string(),
            });
        }
        Ok(window)
    }

    /// Sales, orders and expenses for a day or a range.
    pub fn period_summary(&self, window: Window) -> CoreResult<PeriodSummary> {
        let window = Self::period_window(window)?;

        let interval = window.resolve(&self.calendar);
        let sales = aggregate(&self.stream.events, &interval);
        let orders = order_totals(&self.snapshot.orders, &interval);
        let expenses = period_expenses(&self.snapshot.expenses, &window, &self.calendar);
        let all_time = self.all_time_summary();

        debug!(?window, sales_revenue = %sales.revenue, orders_revenue = %orders.revenue, "Period summary");

        Ok(PeriodSummary {
            window,
            sales,
            orders,
            expenses,
            turnover: sales.revenue + orders.revenue,
            net_profit: sales.profit + orders.profit - expenses.total,
            all_time_sales: all_time.sales,
            all_time_orders: all_time.orders,
            total_revenue: all_time.total_revenue,
            warnings: self.warnings(),
        })
    }

    pub fn all_time_summary(&self) -> AllTimeSummary {
        let all = Interval::unbounded();
        AllTimeSummary {
            sales: aggregate(&self.stream.events, &all),
            orders: order_totals(&self.snapshot.orders, &all),
            total_revenue: self.total_revenue().total_revenue,
            warnings: self.warnings(),
        }
    }

    /// Register balance over all time.
    pub fn total_revenue(&self) -> TotalRevenue {
        let all = Interval::unbounded();
        let breakdown = RevenueBreakdown {
            sales_revenue: aggregate(&self.stream.events, &all).revenue,
            non_fixed_expenses: register_outflow(&self.snapshot.expenses, &all),
            revenue_changes: revenue_change_total(&self.snapshot.revenue_changes, &all),
        };
        TotalRevenue {
            total_revenue: breakdown.sales_revenue - breakdown.non_fixed_expenses
                + breakdown.revenue_changes,
            breakdown,
            warnings: self.warnings(),
        }
    }

    /// Opening balance, itemized movements and closing balance of one day.
    pub fn day_history(&self, date: NaiveDate) -> DayHistory {
        let exact = reconstruct(&self.stream.events, &self.register, date, &self.calendar);

        debug!(%date, entries = exact.entries.len(), "Day history");

        let entries: Vec<HistoryEntry> = exact
            .entries
            .into_iter()
            .map(|entry| HistoryEntry {
                running_total_after: entry.running_total_after.round_to_unit(),
                ..entry
            })
            .collect();

        DayHistory {
            selected_date: date,
            opening_balance: exact.opening_balance.round_to_unit(),
            closing_balance: exact.closing_balance.round_to_unit(),
            change_count: entries.len(),
            entries,
            warnings: self.warnings(),
        }
    }
}

/// Revenue and profit of the received orders dated inside `interval`.
pub fn order_totals(orders: &[Order], interval: &Interval) -> Totals {
    orders
        .iter()
        .filter_map(Order::contribution)
        .filter(|c| interval.contains(c.at))
        .fold(Totals::default(), |mut totals, c| {
            totals.add(c.revenue, c.profit);
            totals
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
