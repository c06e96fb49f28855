//! # Analytics
//!
//! Dashboard charts. Sales figures come from the same event stream as every
//! other report, so a prepaid sale shows up on the day its money arrived and
//! not on its creation date with its full total.
//!
//! - [`revenue_trend`] - revenue/profit per day or per month
//! - [`hourly_pattern`] - 24 hourly buckets for one day
//! - [`expense_analysis`] - expenses per category and per month

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ledger::LedgerEvent;
use crate::money::Money;
use crate::summary::SummaryComposer;
use crate::types::{Expense, Order};
use crate::window::{Calendar, Window};

// =============================================================================
// Revenue Trend
// =============================================================================

/// Bucket size of a trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Month,
}

impl Granularity {
    fn key(&self, date: NaiveDate) -> String {
        match self {
            Granularity::Day => date.format("%Y-%m-%d").to_string(),
            Granularity::Month => date.format("%Y-%m").to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// `YYYY-MM-DD` or `YYYY-MM`.
    pub bucket: String,
    pub sales_revenue: Money,
    pub sales_profit: Money,
    pub sales_events: usize,
    pub orders_revenue: Money,
    pub orders_profit: Money,
    pub orders_count: usize,
}

/// Sales and order figures per bucket inside `window`, oldest first.
///
/// Only buckets with at least one event or order are returned.
pub fn revenue_trend(
    events: &[LedgerEvent],
    orders: &[Order],
    window: &Window,
    granularity: Granularity,
    calendar: &Calendar,
) -> Vec<TrendPoint> {
    let interval = window.resolve(calendar);
    let mut buckets: BTreeMap<String, TrendPoint> = BTreeMap::new();

    for event in events.iter().filter(|e| interval.contains(e.timestamp)) {
        let key = granularity.key(calendar.local_date(event.timestamp));
        let point = trend_point(&mut buckets, key);
        point.sales_revenue += event.revenue;
        point.sales_profit += event.profit;
        point.sales_events += 1;
    }

    for order in orders.iter().filter_map(Order::contribution) {
        if !interval.contains(order.at) {
            continue;
        }
        let key = granularity.key(calendar.local_date(order.at));
        let point = trend_point(&mut buckets, key);
        point.orders_revenue += order.revenue;
        point.orders_profit += order.profit;
        point.orders_count += 1;
    }

    buckets.into_values().collect()
}

fn trend_point(buckets: &mut BTreeMap<String, TrendPoint>, key: String) -> &mut TrendPoint {
    buckets.entry(key.clone()).or_insert_with(|| TrendPoint {
        bucket: key,
        ..Default::default()
    })
}

// =============================================================================
// Hourly Pattern
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct HourBucket {
    pub hour: u32,
    /// `HH:00`
    pub label: String,
    pub sales_events: usize,
    pub sales_revenue: Money,
    pub sales_profit: Money,
    pub orders_count: usize,
    pub orders_revenue: Money,
    pub total_revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct HourlyPattern {
    #[ts(as = "String")]
    pub date: NaiveDate,
    /// Always 24 buckets, hour 0 first.
    pub hours: Vec<HourBucket>,
}

/// Activity of one local day split into 24 hourly buckets.
pub fn hourly_pattern(
    events: &[LedgerEvent],
    orders: &[Order],
    date: NaiveDate,
    calendar: &Calendar,
) -> HourlyPattern {
    let interval = Window::day(date).resolve(calendar);
    let mut hours: Vec<HourBucket> = (0..24)
        .map(|hour| HourBucket {
            hour,
            label: format!("{hour:02}:00"),
            ..Default::default()
        })
        .collect();

    for event in events.iter().filter(|e| interval.contains(e.timestamp)) {
        let slot = &mut hours[calendar.local_hour(event.timestamp) as usize];
        slot.sales_events += 1;
        slot.sales_revenue += event.revenue;
        slot.sales_profit += event.profit;
    }

    for order in orders.iter().filter_map(Order::contribution) {
        if !interval.contains(order.at) {
            continue;
        }
        let slot = &mut hours[calendar.local_hour(order.at) as usize];
        slot.orders_count += 1;
        slot.orders_revenue += order.revenue;
    }

    for slot in &mut hours {
        slot.total_revenue = slot.sales_revenue + slot.orders_revenue;
    }

    HourlyPattern { date, hours }
}

// =============================================================================
// Expense Analysis
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Admin,
    Fixed,
    Variable,
}

impl ExpenseCategory {
    /// Admin wins over fixed.
    pub fn of(expense: &Expense) -> Self {
        if expense.admin {
            ExpenseCategory::Admin
        } else if expense.is_fixed {
            ExpenseCategory::Fixed
        } else {
            ExpenseCategory::Variable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub total: Money,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCategoryTotal {
    /// `YYYY-MM`
    pub month: String,
    pub category: ExpenseCategory,
    pub total: Money,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseAnalysis {
    /// Sorted by month, then category.
    pub monthly: Vec<MonthlyCategoryTotal>,
    /// Largest total first.
    pub categories: Vec<CategoryTotal>,
}

/// Expense rows created inside `window`, grouped by category and month.
///
/// Amounts are taken as recorded. Fixed-expense recurrence is a period
/// breakdown concern and is not expanded here.
pub fn expense_analysis(expenses: &[Expense], window: &Window, calendar: &Calendar) -> ExpenseAnalysis {
    let interval = window.resolve(calendar);
    let mut monthly: BTreeMap<(String, ExpenseCategory), (Money, usize)> = BTreeMap::new();
    let mut totals: BTreeMap<ExpenseCategory, (Money, usize)> = BTreeMap::new();

    for expense in expenses.iter().filter(|e| interval.contains(e.created_at)) {
        let category = ExpenseCategory::of(expense);
        let month = Granularity::Month.key(calendar.local_date(expense.created_at));

        let cell = monthly.entry((month, category)).or_default();
        cell.0 += expense.amount;
        cell.1 += 1;

        let cell = totals.entry(category).or_default();
        cell.0 += expense.amount;
        cell.1 += 1;
    }

    let monthly = monthly
        .into_iter()
        .map(|((month, category), (total, count))| MonthlyCategoryTotal {
            month,
            category,
            total,
            count,
        })
        .collect();

    let mut categories: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category,
            total,
            count,
        })
        .collect();
    categories.sort_by(|a, b| b.total.cmp(&a.total));

    ExpenseAnalysis {
        monthly,
        categories,
    }
}

// =============================================================================
// Composer Shortcuts
// =============================================================================

impl SummaryComposer<'_> {
    pub fn revenue_trend(&self, window: &Window, granularity: Granularity) -> Vec<TrendPoint> {
        revenue_trend(
            self.events(),
            &self.snapshot().orders,
            window,
            granularity,
            self.calendar(),
        )
    }

    pub fn hourly_pattern(&self, date: NaiveDate) -> HourlyPattern {
        hourly_pattern(self.events(), &self.snapshot().orders, date, self.calendar())
    }

    pub fn expense_analysis(&self, window: &Window) -> ExpenseAnalysis {
        expense_analysis(&self.snapshot().expenses, window, self.calendar())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
