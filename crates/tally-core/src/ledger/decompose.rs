//! # Event Decomposer
//!
//! `Sale → Vec<LedgerEvent>`. Every recognition rule lives here and nowhere
//! else; aggregation, history and analytics only consume the output.
//!
//! ## Branches
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  is_pre_paid  is_exchanged  completed │ events                          │
//! │  ─────────────────────────────────────┼──────────────────────────────── │
//! │     no           no            -      │ principal(total-disc,           │
//! │                                       │           profit-disc)          │
//! │     no           yes           -      │ principal(before snapshot)      │
//! │                                       │ + exchange per step             │
//! │     yes          no            no     │ prepayment                      │
//! │     yes          no            yes    │ prepayment + completion         │
//! │                                       │ + discount (if > 0)             │
//! │     yes          yes           no     │ prepayment + guarded exchanges  │
//! │     yes          yes           yes    │ prepayment + exchanges          │
//! │                                       │ + completion(net of exchanges)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - The principal is recognized once: either whole at creation, or as the
//!   prepayment plus the remainder at completion.
//! - The discount is applied once, when the principal is fully recognized,
//!   and never on an exchanged sale.
//! - Each exchange contributes its price difference once. On a pending
//!   prepaid sale whose total fell below the prepayment, a negative
//!   difference is recognized as 0: no cash flows back to the customer.
//! - Integer arithmetic only. Nothing is rounded here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use ts_rs::TS;

use super::event::{EventKind, LedgerEvent};
use crate::money::Money;
use crate::types::{Exchange, Sale};

// =============================================================================
// Errors & Anomalies
// =============================================================================

/// A sale that cannot be decomposed at all. Only that sale is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecomposeError {
    #[error("{field} is negative ({value})")]
    NegativeAmount { field: &'static str, value: Money },
}

/// Inconsistent sale data. The decomposition still completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleAnomaly {
    #[error("sale is flagged exchanged but has no exchanges")]
    ExchangedWithoutExchanges,

    #[error("final payment is dated before the sale was created")]
    FinalPaymentBeforeCreation,

    /// The pre-exchange total or profit is absent and was taken as 0.
    #[error("pre-exchange total or profit missing, treated as 0")]
    MissingPreExchangeSnapshot,

    #[error("an exchange is dated before the sale was created")]
    ExchangeBeforeCreation,
}

/// Events of one sale plus whatever looked wrong while producing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decomposition {
    pub events: Vec<LedgerEvent>,
    pub anomalies: Vec<SaleAnomaly>,
}

impl Decomposition {
    fn push(
        &mut self,
        sale: &Sale,
        kind: EventKind,
        timestamp: DateTime<Utc>,
        revenue: Money,
        profit: Money,
        label: String,
    ) {
        self.events
            .push(LedgerEvent::new(&sale.id, kind, timestamp, revenue, profit, label));
    }

    fn flag(&mut self, anomaly: SaleAnomaly) {
        if !self.anomalies.contains(&anomaly) {
            self.anomalies.push(anomaly);
        }
    }
}

// =============================================================================
// Decompose
// =============================================================================

/// Decomposes one sale into its dated monetary events.
///
/// Deterministic and free of I/O. Events come out in the order the business
/// steps happened for a well-formed sale: creation, exchanges in list order,
/// completion.
pub fn decompose(sale: &Sale) -> Result<Decomposition, DecomposeError> {
    check_non_negative("total", sale.total)?;
    check_non_negative("prepaid_amount", sale.prepaid_amount)?;
    check_non_negative("discount_amount", sale.discount_amount)?;

    let mut out = Decomposition::default();
    inspect(sale, &mut out);

    let discount = sale.discount_amount;
    let prepaid = sale.prepaid_amount;

    if !sale.is_pre_paid {
        if !sale.is_exchanged {
            out.push(
                sale,
                EventKind::Principal,
                sale.created_at,
                sale.total - discount,
                sale.profit - discount,
                format!("Sale {}", sale.barcode),
            );
            return Ok(out);
        }

        if sale.total_before_exchange.is_none() || sale.profit_before_exchange.is_none() {
            out.flag(SaleAnomaly::MissingPreExchangeSnapshot);
        }
        out.push(
            sale,
            EventKind::Principal,
            sale.created_at,
            sale.total_before_exchange.unwrap_or_default(),
            sale.profit_before_exchange.unwrap_or_default(),
            format!("Sale {}", sale.barcode),
        );
        let deltas = step_profit_deltas(sale, &mut out);
        push_exchanges(sale, &deltas, false, &mut out);
        return Ok(out);
    }

    out.push(
        sale,
        EventKind::Prepayment,
        sale.created_at,
        prepaid,
        Money::zero(),
        format!("Prepayment {}", sale.barcode),
    );

    match (sale.is_exchanged, sale.final_payment_at) {
        (false, None) => {}
        (false, Some(completed_at)) => {
            out.push(
                sale,
                EventKind::Completion,
                completed_at,
                (sale.total - prepaid).non_negative(),
                sale.profit,
                format!("Final payment {}", sale.barcode),
            );
            if discount.is_positive() {
                out.push(
                    sale,
                    EventKind::Discount,
                    completed_at,
                    -discount,
                    Money::zero(),
                    format!("Discount {}", sale.barcode),
                );
            }
        }
        (true, None) => {
            let deltas = step_profit_deltas(sale, &mut out);
            push_exchanges(sale, &deltas, true, &mut out);
        }
        (true, Some(completed_at)) => {
            let deltas = step_profit_deltas(sale, &mut out);
            push_exchanges(sale, &deltas, false, &mut out);

            let exchanged: Money = sale.exchanges.iter().map(|e| e.price_difference).sum();
            let exchange_profit: Money = deltas.iter().sum();
            out.push(
                sale,
                EventKind::Completion,
                completed_at,
                (sale.total - prepaid - exchanged).non_negative(),
                sale.profit - exchange_profit,
                format!("Final payment {}", sale.barcode),
            );
        }
    }

    Ok(out)
}

fn check_non_negative(field: &'static str, value: Money) -> Result<(), DecomposeError> {
    if value.is_negative() {
        return Err(DecomposeError::NegativeAmount { field, value });
    }
    Ok(())
}

/// Flags the anomalies that do not depend on the branch taken.
fn inspect(sale: &Sale, out: &mut Decomposition) {
    if sale.is_exchanged && sale.exchanges.is_empty() {
        out.flag(SaleAnomaly::ExchangedWithoutExchanges);
    }
    if sale.final_payment_at.is_some_and(|at| at < sale.created_at) {
        out.flag(SaleAnomaly::FinalPaymentBeforeCreation);
    }
    if sale.is_exchanged && sale.exchanges.iter().any(|e| e.exchanged_at < sale.created_at) {
        out.flag(SaleAnomaly::ExchangeBeforeCreation);
    }
}

/// Profit delta of each exchange step, index-aligned with `sale.exchanges`.
///
/// Item detail on every step gives exact per-step deltas. Otherwise the whole
/// sale-level delta (`profit - profit_before_exchange`) goes to the latest
/// exchange and the other steps carry 0.
fn step_profit_deltas(sale: &Sale, out: &mut Decomposition) -> Vec<Money> {
    let itemized: Option<Vec<Money>> = sale
        .exchanges
        .iter()
        .map(Exchange::item_profit_delta)
        .collect();
    if let Some(deltas) = itemized {
        return deltas;
    }

    let before = sale.profit_before_exchange.unwrap_or_else(|| {
        out.flag(SaleAnomaly::MissingPreExchangeSnapshot);
        Money::zero()
    });
    let mut deltas = vec![Money::zero(); sale.exchanges.len()];
    let latest = sale
        .exchanges
        .iter()
        .enumerate()
        .max_by_key(|(_, e)| e.exchanged_at)
        .map(|(i, _)| i);
    if let Some(i) = latest {
        deltas[i] = sale.profit - before;
    }
    deltas
}

fn push_exchanges(sale: &Sale, deltas: &[Money], guarded: bool, out: &mut Decomposition) {
    for (exchange, delta) in sale.exchanges.iter().zip(deltas) {
        let difference = exchange.price_difference;
        let revenue = if guarded && difference.is_negative() && sale.total < sale.prepaid_amount {
            Money::zero()
        } else {
            difference
        };
        let sign = if difference.is_positive() { "+" } else { "" };
        out.push(
            sale,
            EventKind::Exchange,
            exchange.exchanged_at,
            revenue,
            *delta,
            format!("Exchange {sign}{difference} {}", sale.barcode),
        );
    }
}

// =============================================================================
// Bulk Decomposition
// =============================================================================

/// The flattened events of a whole snapshot, with per-sale problems set aside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStream {
    /// Events in snapshot order (sale by sale, each sale's events in order).
    pub events: Vec<LedgerEvent>,
    /// `(sale_id, anomaly)` for every anomalous sale that was still decomposed.
    pub anomalies: Vec<(String, SaleAnomaly)>,
    /// `(sale_id, error)` for every sale that contributed nothing.
    pub skipped: Vec<(String, DecomposeError)>,
}

impl EventStream {
    /// Number of per-record problems a report should surface.
    pub fn warning_count(&self) -> usize {
        self.anomalies.len() + self.skipped.len()
    }
}

/// Decomposes every sale. One bad sale never aborts the rest.
pub fn decompose_all(sales: &[Sale]) -> EventStream {
    let mut stream = EventStream::default();

    for sale in sales {
        match decompose(sale) {
            Ok(decomposition) => {
                for anomaly in decomposition.anomalies {
                    warn!(sale_id = %sale.id, barcode = %sale.barcode, %anomaly, "Inconsistent sale data");
                    stream.anomalies.push((sale.id.clone(), anomaly));
                }
                stream.events.extend(decomposition.events);
            }
            Err(error) => {
                warn!(sale_id = %sale.id, barcode = %sale.barcode, %error, "Skipping sale");
                stream.skipped.push((sale.id.clone(), error));
            }
        }
    }

    debug!(
        sales = sales.len(),
        events = stream.events.len(),
        warnings = stream.warning_count(),
        "Decomposed sales"
    );
    stream
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, item, units, SaleBuilder};

    fn revenue_of(events: &[LedgerEvent]) -> Money {
        events.iter().map(|e| e.revenue).sum()
    }

    fn profit_of(events: &[LedgerEvent]) -> Money {
        events.iter().map(|e| e.profit).sum()
    }

    fn kinds(events: &[LedgerEvent]) -> Vec<EventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    fn count(events: &[LedgerEvent], kind: EventKind) -> usize {
        events.iter().filter(|e| e.kind == kind).count()
    }

    // -------------------------------------------------------------------------
    // Branch fixtures: all-time revenue equals what the customer paid
    // -------------------------------------------------------------------------

    #[test]
    fn test_regular_sale_counts_once() {
        let sale = SaleBuilder::new("s1", at(1, 10))
            .total(1000)
            .profit(300)
            .discount(100)
            .build();
        let d = decompose(&sale).unwrap();
        assert_eq!(kinds(&d.events), vec![EventKind::Principal]);
        assert_eq!(revenue_of(&d.events), units(900));
        assert!(d.anomalies.is_empty());
    }

    #[test]
    fn test_regular_exchanged_sale_counts_once() {
        let sale = SaleBuilder::new("s2", at(1, 10))
            .total(900)
            .profit(300)
            .before_exchange(800, 250)
            .exchange(100, at(2, 11))
            .build();
        let d = decompose(&sale).unwrap();
        assert_eq!(kinds(&d.events), vec![EventKind::Principal, EventKind::Exchange]);
        assert_eq!(revenue_of(&d.events), sale.total);
        assert_eq!(profit_of(&d.events), sale.profit);
    }

    #[test]
    fn test_prepaid_pending_counts_prepayment_only() {
        let sale = SaleBuilder::new("s3", at(1, 10))
            .total(1000)
            .profit(300)
            .prepaid(400)
            .build();
        let d = decompose(&sale).unwrap();
        assert_eq!(kinds(&d.events), vec![EventKind::Prepayment]);
        assert_eq!(revenue_of(&d.events), units(400));
        assert_eq!(profit_of(&d.events), Money::zero());
    }

    #[test]
    fn test_prepaid_completed_counts_once() {
        let sale = SaleBuilder::new("s4", at(5, 10))
            .total(1000)
            .profit(300)
            .discount(50)
            .prepaid(400)
            .completed_at(at(7, 16))
            .build();
        let d = decompose(&sale).unwrap();
        assert_eq!(
            kinds(&d.events),
            vec![EventKind::Prepayment, EventKind::Completion, EventKind::Discount]
        );
        assert_eq!(revenue_of(&d.events), units(950));
        assert_eq!(profit_of(&d.events), units(300));
    }

    #[test]
    fn test_prepaid_exchanged_pending_counts_once() {
        let sale = SaleBuilder::new("s5", at(1, 10))
            .total(1100)
            .profit(350)
            .prepaid(400)
            .before_exchange(1000, 300)
            .exchange(100, at(2, 9))
            .build();
        let d = decompose(&sale).unwrap();
        assert_eq!(kinds(&d.events), vec![EventKind::Prepayment, EventKind::Exchange]);
        assert_eq!(revenue_of(&d.events), units(500));
        assert_eq!(profit_of(&d.events), units(50));
    }

    #[test]
    fn test_prepaid_exchanged_completed_counts_total_once() {
        let sale = SaleBuilder::new("s6", at(1, 10))
            .total(1100)
            .profit(350)
            .prepaid(400)
            .before_exchange(1000, 300)
            .exchange(100, at(2, 9))
            .completed_at(at(4, 12))
            .build();
        let d = decompose(&sale).unwrap();
        assert_eq!(
            kinds(&d.events),
            vec![EventKind::Prepayment, EventKind::Exchange, EventKind::Completion]
        );
        let completion = &d.events[2];
        assert_eq!(completion.revenue, units(600));
        assert_eq!(completion.profit, units(300));
        assert_eq!(revenue_of(&d.events), sale.total);
        assert_eq!(profit_of(&d.events), sale.profit);
        assert_eq!(count(&d.events, EventKind::Discount), 0);
    }

    // -------------------------------------------------------------------------
    // Discount
    // -------------------------------------------------------------------------

    #[test]
    fn test_discount_applied_at_most_once_and_never_on_exchanged() {
        let regular = SaleBuilder::new("d1", at(1, 10)).total(500).discount(20).build();
        let prepaid = SaleBuilder::new("d2", at(1, 10))
            .total(500)
            .discount(20)
            .prepaid(100)
            .completed_at(at(2, 10))
            .build();
        let exchanged = SaleBuilder::new("d3", at(1, 10))
            .total(520)
            .discount(20)
            .before_exchange(500, 100)
            .exchange(20, at(2, 10))
            .build();
        let exchanged_prepaid = SaleBuilder::new("d4", at(1, 10))
            .total(520)
            .discount(20)
            .prepaid(100)
            .before_exchange(500, 100)
            .exchange(20, at(2, 10))
            .completed_at(at(3, 10))
            .build();

        let regular = decompose(&regular).unwrap().events;
        assert_eq!(regular[0].revenue, units(480));

        let prepaid = decompose(&prepaid).unwrap().events;
        assert_eq!(count(&prepaid, EventKind::Discount), 1);
        assert_eq!(revenue_of(&prepaid), units(480));

        for sale in [exchanged, exchanged_prepaid] {
            let events = decompose(&sale).unwrap().events;
            assert_eq!(count(&events, EventKind::Discount), 0);
            assert_eq!(revenue_of(&events), units(520));
        }
    }

    #[test]
    fn test_zero_discount_emits_no_discount_event() {
        let sale = SaleBuilder::new("d5", at(1, 10))
            .total(500)
            .prepaid(100)
            .completed_at(at(2, 10))
            .build();
        let events = decompose(&sale).unwrap().events;
        assert_eq!(count(&events, EventKind::Discount), 0);
    }

    // -------------------------------------------------------------------------
    // Exchange guard
    // -------------------------------------------------------------------------

    #[test]
    fn test_negative_exchange_on_overpaid_pending_sale_is_zero() {
        let sale = SaleBuilder::new("g1", at(1, 10))
            .total(300)
            .prepaid(500)
            .before_exchange(350, 100)
            .exchange(-50, at(2, 10))
            .build();
        let events = decompose(&sale).unwrap().events;
        let exchange = events.iter().find(|e| e.kind == EventKind::Exchange).unwrap();
        assert_eq!(exchange.revenue, Money::zero());
        assert_eq!(exchange.label, "Exchange -50.00 R-g1");
    }

    #[test]
    fn test_guard_does_not_apply_once_completed_or_not_overpaid() {
        let completed = SaleBuilder::new("g2", at(1, 10))
            .total(300)
            .prepaid(500)
            .before_exchange(350, 100)
            .exchange(-50, at(2, 10))
            .completed_at(at(3, 10))
            .build();
        let events = decompose(&completed).unwrap().events;
        assert_eq!(events[1].revenue, units(-50));
        // 300 - 500 + 50 clamps to 0
        assert_eq!(events[2].revenue, Money::zero());

        let not_overpaid = SaleBuilder::new("g3", at(1, 10))
            .total(950)
            .prepaid(400)
            .before_exchange(1000, 300)
            .exchange(-50, at(2, 10))
            .build();
        let events = decompose(&not_overpaid).unwrap().events;
        assert_eq!(events[1].revenue, units(-50));
    }

    // -------------------------------------------------------------------------
    // Scenarios
    // -------------------------------------------------------------------------

    #[test]
    fn test_scenario_exchanged_regular_sale() {
        let sale = SaleBuilder::new("x1", at(1, 10))
            .total(900)
            .profit(300)
            .before_exchange(800, 250)
            .exchange(100, at(3, 14))
            .build();
        let events = decompose(&sale).unwrap().events;
        assert_eq!(events[0].timestamp, at(1, 10));
        assert_eq!((events[0].revenue, events[0].profit), (units(800), units(250)));
        assert_eq!(events[1].timestamp, at(3, 14));
        assert_eq!((events[1].revenue, events[1].profit), (units(100), units(50)));
        assert_eq!(events[1].label, "Exchange +100.00 R-x1");
    }

    #[test]
    fn test_scenario_prepaid_completed_two_days_later() {
        let sale = SaleBuilder::new("p1", at(5, 9))
            .total(1000)
            .profit(300)
            .discount(50)
            .prepaid(400)
            .completed_at(at(7, 15))
            .build();
        let events = decompose(&sale).unwrap().events;

        let day5: Money = events.iter().filter(|e| e.timestamp < at(6, 0)).map(|e| e.revenue).sum();
        let day7: Vec<&LedgerEvent> = events.iter().filter(|e| e.timestamp >= at(7, 0)).collect();
        assert_eq!(day5, units(400));
        assert_eq!(day7.iter().map(|e| e.revenue).sum::<Money>(), units(550));
        assert_eq!(day7.iter().map(|e| e.profit).sum::<Money>(), units(300));
    }

    // -------------------------------------------------------------------------
    // Profit deltas
    // -------------------------------------------------------------------------

    #[test]
    fn test_itemized_exchanges_use_item_margins() {
        let sale = SaleBuilder::new("i1", at(1, 10))
            .total(1100)
            .profit(360)
            .before_exchange(1000, 300)
            .exchange_items(50, at(2, 10), item(200, 100, 1), item(250, 120, 1))
            .exchange_items(50, at(3, 10), item(100, 60, 1), item(150, 80, 1))
            .build();
        let events = decompose(&sale).unwrap().events;
        assert_eq!(events[1].profit, units(30));
        assert_eq!(events[2].profit, units(30));
    }

    #[test]
    fn test_sale_level_delta_goes_to_latest_exchange() {
        let sale = SaleBuilder::new("i2", at(1, 10))
            .total(1100)
            .profit(360)
            .before_exchange(1000, 300)
            .exchange(50, at(3, 10))
            .exchange_items(50, at(2, 10), item(100, 60, 1), item(150, 80, 1))
            .build();
        let events = decompose(&sale).unwrap().events;
        assert_eq!(events[1].timestamp, at(3, 10));
        assert_eq!(events[1].profit, units(60));
        assert_eq!(events[2].profit, Money::zero());
    }

    // -------------------------------------------------------------------------
    // Anomalies & errors
    // -------------------------------------------------------------------------

    #[test]
    fn test_missing_snapshot_defaults_to_zero_and_is_reported() {
        let sale = SaleBuilder::new("a1", at(1, 10))
            .total(900)
            .profit(300)
            .exchange(100, at(2, 10))
            .build();
        let d = decompose(&sale).unwrap();
        assert_eq!(d.events[0].revenue, Money::zero());
        assert_eq!(d.events[1].profit, units(300));
        assert_eq!(d.anomalies, vec![SaleAnomaly::MissingPreExchangeSnapshot]);
    }

    #[test]
    fn test_exchanged_flag_without_exchanges() {
        let sale = SaleBuilder::new("a2", at(1, 10))
            .total(500)
            .before_exchange(500, 100)
            .flagged_exchanged()
            .build();
        let d = decompose(&sale).unwrap();
        assert_eq!(d.anomalies, vec![SaleAnomaly::ExchangedWithoutExchanges]);
        assert_eq!(revenue_of(&d.events), units(500));
    }

    #[test]
    fn test_dates_out_of_order_are_reported() {
        let sale = SaleBuilder::new("a3", at(5, 10))
            .total(500)
            .prepaid(100)
            .before_exchange(500, 100)
            .exchange(0, at(4, 10))
            .completed_at(at(3, 10))
            .build();
        let d = decompose(&sale).unwrap();
        assert!(d.anomalies.contains(&SaleAnomaly::FinalPaymentBeforeCreation));
        assert!(d.anomalies.contains(&SaleAnomaly::ExchangeBeforeCreation));
    }

    #[test]
    fn test_negative_amount_is_fatal_for_the_sale() {
        let mut sale = SaleBuilder::new("a4", at(1, 10)).total(500).build();
        sale.discount_amount = units(-5);
        let err = decompose(&sale).unwrap_err();
        assert_eq!(
            err,
            DecomposeError::NegativeAmount {
                field: "discount_amount",
                value: units(-5)
            }
        );
    }

    #[test]
    fn test_decompose_all_isolates_bad_sales() {
        let good = SaleBuilder::new("b1", at(1, 10)).total(100).build();
        let mut bad = SaleBuilder::new("b2", at(1, 11)).total(100).build();
        bad.total = units(-1);
        let odd = SaleBuilder::new("b3", at(1, 12))
            .total(100)
            .exchange(100, at(2, 10))
            .build();

        let stream = decompose_all(&[good, bad, odd]);
        assert_eq!(stream.skipped.len(), 1);
        assert_eq!(stream.skipped[0].0, "b2");
        assert_eq!(stream.anomalies.len(), 1);
        assert_eq!(stream.warning_count(), 2);
        assert!(stream.events.iter().all(|e| e.sale_id != "b2"));
        assert_eq!(stream.events[0].sale_id, "b1");
    }
}
