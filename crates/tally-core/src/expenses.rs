//! # Expenses and Register Adjustments
//!
//! Two readings of the same expense rows:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PERIOD BREAKDOWN (profit side)                                         │
//! │    admin rows      → amount, if created inside the window               │
//! │    variable rows   → amount, if created inside the window               │
//! │    fixed rows      → amount × units(window, recurrence)                 │
//! │                                                                         │
//! │  REGISTER ENTRIES (cash side)                                           │
//! │    variable, non-admin rows → -amount at created_at                     │
//! │    revenue changes          → ±amount at created_at                     │
//! │    admin and fixed rows never touch the register                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ledger::{RegisterEntry, RegisterSource};
use crate::money::Money;
use crate::types::{Expense, RevenueChange};
use crate::window::{Calendar, Interval, Window};

/// Expenses charged to a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseBreakdown {
    pub total: Money,
    pub admin: Money,
    pub non_fixed: Money,
    pub fixed: Money,
}

/// Splits expenses charged to `window` by category.
///
/// Admin rows are classified first, so a fixed admin row counts once, on its
/// creation date.
pub fn period_expenses(expenses: &[Expense], window: &Window, calendar: &Calendar) -> ExpenseBreakdown {
    let interval = window.resolve(calendar);
    let mut breakdown = ExpenseBreakdown::default();

    for expense in expenses {
        if expense.admin {
            if interval.contains(expense.created_at) {
                breakdown.admin += expense.amount;
            }
        } else if !expense.is_fixed {
            if interval.contains(expense.created_at) {
                breakdown.non_fixed += expense.amount;
            }
        } else {
            breakdown.fixed += expense.amount * window.fixed_units(expense.recurrence);
        }
    }

    breakdown.total = breakdown.admin + breakdown.non_fixed + breakdown.fixed;
    breakdown
}

/// Total of the variable, non-admin expenses created inside `interval`.
pub fn register_outflow(expenses: &[Expense], interval: &Interval) -> Money {
    expenses
        .iter()
        .filter(|e| e.touches_register() && interval.contains(e.created_at))
        .map(|e| e.amount)
        .sum()
}

/// Net of the revenue changes created inside `interval`.
pub fn revenue_change_total(changes: &[RevenueChange], interval: &Interval) -> Money {
    changes
        .iter()
        .filter(|c| interval.contains(c.created_at))
        .map(|c| c.amount)
        .sum()
}

/// Signed register entries: expenses first, then revenue changes, each in
/// input order.
pub fn register_entries(expenses: &[Expense], changes: &[RevenueChange]) -> Vec<RegisterEntry> {
    let outflows = expenses
        .iter()
        .filter(|e| e.touches_register())
        .map(|e| RegisterEntry {
            source: RegisterSource::Expense,
            record_id: e.id.clone(),
            timestamp: e.created_at,
            amount: -e.amount,
            label: e.description.clone(),
        });
    let adjustments = changes.iter().map(|c| RegisterEntry {
        source: RegisterSource::RevenueChange,
        record_id: c.id.clone(),
        timestamp: c.created_at,
        amount: c.amount,
        label: c.description.clone(),
    });
    outflows.chain(adjustments).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, expense, revenue_change, units, variable_expense};
    use crate::types::ExpenseRecurrence;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn rows() -> Vec<Expense> {
        vec![
            variable_expense("v1", 30, at(2, 10)),
            variable_expense("v2", 20, at(9, 10)),
            expense("a1", 100, at(2, 11), true, false, ExpenseRecurrence::Monthly),
            expense("f1", 10, at(1, 0), false, true, ExpenseRecurrence::Daily),
            expense("f2", 300, at(1, 0), false, true, ExpenseRecurrence::Monthly),
            expense("af", 40, at(15, 0), true, true, ExpenseRecurrence::Daily),
        ]
    }

    #[test]
    fn test_single_day_breakdown() {
        let b = period_expenses(&rows(), &Window::day(day(2)), &Calendar::utc());
        assert_eq!(b.admin, units(100));
        assert_eq!(b.non_fixed, units(30));
        // one daily unit + one monthly unit
        assert_eq!(b.fixed, units(310));
        assert_eq!(b.total, units(440));
    }

    #[test]
    fn test_range_counts_fixed_units() {
        let window = Window::range(day(1), day(10)).unwrap();
        let b = period_expenses(&rows(), &window, &Calendar::utc());
        assert_eq!(b.non_fixed, units(50));
        assert_eq!(b.fixed, units(10 * 10 + 300));
        assert_eq!(b.admin, units(100));
    }

    #[test]
    fn test_fixed_admin_counts_once_on_creation() {
        let window = Window::range(day(14), day(16)).unwrap();
        let b = period_expenses(&rows(), &window, &Calendar::utc());
        assert_eq!(b.admin, units(40));
    }

    #[test]
    fn test_register_entries_skip_admin_and_fixed() {
        let changes = vec![revenue_change("c1", -15, at(3, 9))];
        let entries = register_entries(&rows(), &changes);
        let ids: Vec<&str> = entries.iter().map(|e| e.record_id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2", "c1"]);
        assert_eq!(entries[0].amount, units(-30));
        assert_eq!(entries[2].amount, units(-15));
    }

    #[test]
    fn test_outflow_and_change_totals() {
        let changes = vec![
            revenue_change("c1", 200, at(3, 9)),
            revenue_change("c2", -50, at(20, 9)),
        ];
        let all = Interval::unbounded();
        assert_eq!(register_outflow(&rows(), &all), units(50));
        assert_eq!(revenue_change_total(&changes, &all), units(150));
        assert_eq!(
            revenue_change_total(&changes, &Interval::before(at(10, 0))),
            units(200)
        );
    }
}
