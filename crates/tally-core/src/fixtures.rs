//! Test builders shared by the unit tests of this crate.
//!
//! Amounts are given in whole units and instants as day-of-March-2024 plus
//! hour, UTC, so fixtures read like the scenarios they encode.

use chrono::{DateTime, TimeZone, Utc};

use crate::money::Money;
use crate::types::{
    Exchange, ExchangeItem, Expense, ExpenseRecurrence, Order, OrderStatus, RevenueChange, Sale,
};

/// 2024-03-`day` `hour`:00:00 UTC.
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

/// 2024-03-`day` `hour`:`minute`:00 UTC.
pub fn at_min(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
}

pub fn units(value: i64) -> Money {
    Money::from_units(value)
}

pub fn item(price: i64, cost: i64, quantity: i64) -> ExchangeItem {
    ExchangeItem {
        price: units(price),
        original_price: units(cost),
        quantity,
        barcode: None,
    }
}

pub struct SaleBuilder {
    sale: Sale,
}

impl SaleBuilder {
    pub fn new(id: &str, created_at: DateTime<Utc>) -> Self {
        SaleBuilder {
            sale: Sale {
                id: id.to_string(),
                barcode: format!("R-{id}"),
                total: Money::zero(),
                original_total: Money::zero(),
                profit: Money::zero(),
                discount_amount: Money::zero(),
                is_pre_paid: false,
                prepaid_amount: Money::zero(),
                final_payment_at: None,
                is_exchanged: false,
                exchanges: Vec::new(),
                total_before_exchange: None,
                profit_before_exchange: None,
                created_at,
            },
        }
    }

    pub fn total(mut self, value: i64) -> Self {
        self.sale.total = units(value);
        self.sale.original_total = units(value);
        self
    }

    pub fn profit(mut self, value: i64) -> Self {
        self.sale.profit = units(value);
        self
    }

    pub fn discount(mut self, value: i64) -> Self {
        self.sale.discount_amount = units(value);
        self
    }

    pub fn prepaid(mut self, value: i64) -> Self {
        self.sale.is_pre_paid = true;
        self.sale.prepaid_amount = units(value);
        self
    }

    pub fn completed_at(mut self, ts: DateTime<Utc>) -> Self {
        self.sale.final_payment_at = Some(ts);
        self
    }

    pub fn before_exchange(mut self, total: i64, profit: i64) -> Self {
        self.sale.total_before_exchange = Some(units(total));
        self.sale.profit_before_exchange = Some(units(profit));
        self
    }

    /// Marks the sale exchanged and appends an exchange without item detail.
    pub fn exchange(mut self, price_difference: i64, ts: DateTime<Utc>) -> Self {
        let id = format!("{}-x{}", self.sale.id, self.sale.exchanges.len() + 1);
        self.sale.is_exchanged = true;
        self.sale.exchanges.push(Exchange {
            id,
            price_difference: units(price_difference),
            exchanged_at: ts,
            original_item: None,
            exchanged_with: None,
        });
        self
    }

    /// Appends an exchange carrying both items.
    pub fn exchange_items(
        mut self,
        price_difference: i64,
        ts: DateTime<Utc>,
        original: ExchangeItem,
        replacement: ExchangeItem,
    ) -> Self {
        let id = format!("{}-x{}", self.sale.id, self.sale.exchanges.len() + 1);
        self.sale.is_exchanged = true;
        self.sale.exchanges.push(Exchange {
            id,
            price_difference: units(price_difference),
            exchanged_at: ts,
            original_item: Some(original),
            exchanged_with: Some(replacement),
        });
        self
    }

    /// Sets the flag without touching the exchange list.
    pub fn flagged_exchanged(mut self) -> Self {
        self.sale.is_exchanged = true;
        self
    }

    pub fn build(self) -> Sale {
        self.sale
    }
}

pub fn expense(
    id: &str,
    amount: i64,
    created_at: DateTime<Utc>,
    admin: bool,
    is_fixed: bool,
    recurrence: ExpenseRecurrence,
) -> Expense {
    Expense {
        id: id.to_string(),
        description: format!("expense {id}"),
        amount: units(amount),
        admin,
        is_fixed,
        recurrence,
        created_at,
    }
}

/// A variable, non-admin expense: the only kind that leaves the register.
pub fn variable_expense(id: &str, amount: i64, created_at: DateTime<Utc>) -> Expense {
    expense(id, amount, created_at, false, false, ExpenseRecurrence::Monthly)
}

pub fn revenue_change(id: &str, amount: i64, created_at: DateTime<Utc>) -> RevenueChange {
    RevenueChange {
        id: id.to_string(),
        description: format!("change {id}"),
        amount: units(amount),
        created_at,
    }
}

pub fn received_order(
    id: &str,
    total: i64,
    discount: i64,
    profit: i64,
    received_at: DateTime<Utc>,
) -> Order {
    Order {
        id: id.to_string(),
        order_number: 1,
        total: units(total),
        discount_amount: units(discount),
        profit: units(profit),
        status: OrderStatus::Received,
        status_updated_at: Some(received_at),
        created_at: received_at,
    }
}
