//! # Domain Types
//!
//! Records the ledger engine reads. The engine never mutates them.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │    Exchange     │   │  ExchangeItem   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id, barcode    │──►│  price_diff     │──►│  price          │       │
//! │  │  total, profit  │   │  exchanged_at   │   │  original_price │       │
//! │  │  prepaid_amount │   │  original_item  │   │  quantity       │       │
//! │  │  final_payment  │   │  exchanged_with │   │  barcode        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Expense      │   │  RevenueChange  │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  amount         │   │  amount (±)     │   │  total, profit  │       │
//! │  │  admin/is_fixed │   │  description    │   │  status         │       │
//! │  │  recurrence     │   │  created_at     │   │  status_updated │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  LedgerSnapshot = all four lists, read in one bulk pass                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every record has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (receipt barcode for sales) - human-readable, shown in history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Exchange
// =============================================================================

/// One side of an exchange: the item handed back or the item taken instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeItem {
    /// Selling price per unit.
    pub price: Money,
    /// Unit cost.
    pub original_price: Money,
    pub quantity: i64,
    pub barcode: Option<String>,
}

impl ExchangeItem {
    /// Margin of the whole line: `(price - original_price) × quantity`.
    #[inline]
    pub fn line_margin(&self) -> Money {
        (self.price - self.original_price).multiply_quantity(self.quantity)
    }
}

/// One exchange performed on a sale after it was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub id: String,
    /// New total minus the total before this exchange. Signed.
    pub price_difference: Money,
    #[ts(as = "String")]
    pub exchanged_at: DateTime<Utc>,
    pub original_item: Option<ExchangeItem>,
    pub exchanged_with: Option<ExchangeItem>,
}

impl Exchange {
    /// Profit delta of this exchange step, when both items are known.
    ///
    /// ```text
    /// (new.price - new.cost) × new.qty  -  (old.price - old.cost) × old.qty
    /// ```
    pub fn item_profit_delta(&self) -> Option<Money> {
        match (&self.original_item, &self.exchanged_with) {
            (Some(old), Some(new)) => Some(new.line_margin() - old.line_margin()),
            _ => None,
        }
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// How far a sale's payment has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Regular sale, paid in full at the counter.
    Completed,
    /// Prepaid sale whose prepayment already covered the total.
    CompletedAtCreation,
    /// Prepaid sale whose remainder was collected later.
    CompletedLater,
    /// Prepaid sale still waiting for the remainder.
    PrepaidPending,
}

// =============================================================================
// Sale
// =============================================================================

/// A sale as stored, possibly prepaid and possibly exchanged.
///
/// `total` and `profit` always hold the CURRENT values: an exchange rewrites
/// them, and the first exchange saves the previous values into
/// `total_before_exchange` / `profit_before_exchange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    /// Receipt barcode.
    pub barcode: String,
    pub total: Money,
    /// Total before the discount.
    pub original_total: Money,
    pub profit: Money,
    pub discount_amount: Money,
    pub is_pre_paid: bool,
    pub prepaid_amount: Money,
    /// `None` while a prepaid sale is still pending.
    #[ts(as = "Option<String>")]
    pub final_payment_at: Option<DateTime<Utc>>,
    pub is_exchanged: bool,
    pub exchanges: Vec<Exchange>,
    pub total_before_exchange: Option<Money>,
    pub profit_before_exchange: Option<Money>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Whether the remainder of a prepaid sale has been collected.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.final_payment_at.is_some()
    }

    /// Amount still owed on top of the prepayment. Negative when the
    /// prepayment exceeds the current total.
    #[inline]
    pub fn remaining_amount(&self) -> Money {
        self.total - self.prepaid_amount
    }

    /// Payment progress of the sale.
    ///
    /// ```text
    /// !is_pre_paid                     → Completed
    /// prepaid_amount >= total          → CompletedAtCreation
    /// final_payment_at set             → CompletedLater
    /// otherwise                        → PrepaidPending
    /// ```
    pub fn payment_status(&self) -> PaymentStatus {
        if !self.is_pre_paid {
            PaymentStatus::Completed
        } else if self.prepaid_amount >= self.total {
            PaymentStatus::CompletedAtCreation
        } else if self.is_completed() {
            PaymentStatus::CompletedLater
        } else {
            PaymentStatus::PrepaidPending
        }
    }
}

// =============================================================================
// Expense
// =============================================================================

/// How often a fixed expense recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseRecurrence {
    Daily,
    Monthly,
}

impl Default for ExpenseRecurrence {
    fn default() -> Self {
        ExpenseRecurrence::Monthly
    }
}

impl ExpenseRecurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseRecurrence::Daily => "daily",
            ExpenseRecurrence::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(ExpenseRecurrence::Daily),
            "monthly" => Some(ExpenseRecurrence::Monthly),
            _ => None,
        }
    }
}

/// An expense row. Amounts are stored positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: Money,
    /// Paid by the owner, not out of the register.
    pub admin: bool,
    pub is_fixed: bool,
    pub recurrence: ExpenseRecurrence,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Only variable, non-admin expenses leave the register.
    #[inline]
    pub fn touches_register(&self) -> bool {
        !self.admin && !self.is_fixed
    }
}

// =============================================================================
// Revenue Change
// =============================================================================

/// Manual signed adjustment of the register (cash added or withdrawn).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RevenueChange {
    pub id: String,
    pub description: String,
    pub amount: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order
// =============================================================================

/// Delivery order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Unconfirmed,
    Confirmed,
    InDelivery,
    Received,
    Returned,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Unconfirmed
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Unconfirmed => "unconfirmed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::InDelivery => "in_delivery",
            OrderStatus::Received => "received",
            OrderStatus::Returned => "returned",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unconfirmed" => Some(OrderStatus::Unconfirmed),
            "confirmed" => Some(OrderStatus::Confirmed),
            "in_delivery" => Some(OrderStatus::InDelivery),
            "received" => Some(OrderStatus::Received),
            "returned" => Some(OrderStatus::Returned),
            _ => None,
        }
    }
}

/// A delivery order, consumed as an opaque additive contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: i64,
    pub total: Money,
    pub discount_amount: Money,
    pub profit: Money,
    pub status: OrderStatus,
    #[ts(as = "Option<String>")]
    pub status_updated_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// What a received order adds to the books.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderContribution {
    pub at: DateTime<Utc>,
    pub revenue: Money,
    pub profit: Money,
}

impl Order {
    /// Revenue and profit of the order, dated when it was received.
    ///
    /// `None` for any other status, or for a received order with no status
    /// timestamp.
    pub fn contribution(&self) -> Option<OrderContribution> {
        if self.status != OrderStatus::Received {
            return None;
        }
        let at = self.status_updated_at?;
        Some(OrderContribution {
            at,
            revenue: self.total - self.discount_amount,
            profit: self.profit - self.discount_amount,
        })
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Everything one report call reads, loaded in a single bulk pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub sales: Vec<Sale>,
    pub expenses: Vec<Expense>,
    pub revenue_changes: Vec<RevenueChange>,
    pub orders: Vec<Order>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, item, SaleBuilder};

    #[test]
    fn test_payment_status_regular_sale() {
        let sale = SaleBuilder::new("s1", at(1, 10)).total(1000).build();
        assert_eq!(sale.payment_status(), PaymentStatus::Completed);
    }

    #[test]
    fn test_payment_status_prepaid_variants() {
        let pending = SaleBuilder::new("s1", at(1, 10))
            .total(1000)
            .prepaid(400)
            .build();
        assert_eq!(pending.payment_status(), PaymentStatus::PrepaidPending);
        assert_eq!(pending.remaining_amount(), Money::from_units(600));

        let later = SaleBuilder::new("s2", at(1, 10))
            .total(1000)
            .prepaid(400)
            .completed_at(at(3, 12))
            .build();
        assert_eq!(later.payment_status(), PaymentStatus::CompletedLater);

        let covered = SaleBuilder::new("s3", at(1, 10))
            .total(300)
            .prepaid(500)
            .build();
        assert_eq!(covered.payment_status(), PaymentStatus::CompletedAtCreation);
        assert_eq!(covered.remaining_amount(), Money::from_units(-200));
    }

    #[test]
    fn test_item_profit_delta() {
        let exchange = Exchange {
            id: "x1".to_string(),
            price_difference: Money::from_units(100),
            exchanged_at: at(2, 9),
            original_item: Some(item(400, 250, 1)),
            exchanged_with: Some(item(500, 300, 1)),
        };
        // (500-300)·1 - (400-250)·1
        assert_eq!(exchange.item_profit_delta(), Some(Money::from_units(50)));

        let bare = Exchange {
            original_item: None,
            ..exchange
        };
        assert_eq!(bare.item_profit_delta(), None);
    }

    #[test]
    fn test_order_contribution_only_when_received() {
        let mut order = Order {
            id: "o1".to_string(),
            order_number: 7,
            total: Money::from_units(900),
            discount_amount: Money::from_units(100),
            profit: Money::from_units(300),
            status: OrderStatus::InDelivery,
            status_updated_at: Some(at(4, 15)),
            created_at: at(1, 8),
        };
        assert!(order.contribution().is_none());

        order.status = OrderStatus::Received;
        let contribution = order.contribution().unwrap();
        assert_eq!(contribution.at, at(4, 15));
        assert_eq!(contribution.revenue, Money::from_units(800));
        assert_eq!(contribution.profit, Money::from_units(200));

        order.status_updated_at = None;
        assert!(order.contribution().is_none());
    }

    #[test]
    fn test_status_strings_round_trip() {
        for status in [
            OrderStatus::Unconfirmed,
            OrderStatus::Confirmed,
            OrderStatus::InDelivery,
            OrderStatus::Received,
            OrderStatus::Returned,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ExpenseRecurrence::parse("weekly"), None);
        assert_eq!(ExpenseRecurrence::default(), ExpenseRecurrence::Monthly);
    }

    #[test]
    fn test_expense_touches_register() {
        let mut expense = Expense {
            id: "e1".to_string(),
            description: "cleaning".to_string(),
            amount: Money::from_units(50),
            admin: false,
            is_fixed: false,
            recurrence: ExpenseRecurrence::Monthly,
            created_at: at(1, 9),
        };
        assert!(expense.touches_register());
        expense.admin = true;
        assert!(!expense.touches_register());
        expense.admin = false;
        expense.is_fixed = true;
        assert!(!expense.touches_register());
    }
}
