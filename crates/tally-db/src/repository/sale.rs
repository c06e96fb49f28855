//! # Sale Repository
//!
//! Database operations for sales and their exchange history.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. RECORD                                                             │
//! │     └── insert() → sales row + sale_exchanges rows (one transaction)   │
//! │                                                                         │
//! │  2. (PREPAID ONLY) COMPLETE                                            │
//! │     └── complete_payment() → final_payment_at = now                    │
//! │                                                                         │
//! │  3. (OPTIONAL, REPEATABLE) EXCHANGE                                    │
//! │     └── record_exchange()                                              │
//! │         ├── first time: save total/profit as the pre-exchange snapshot │
//! │         ├── total  += price_difference                                 │
//! │         ├── profit += item margin delta (when both items are known)    │
//! │         ├── discount = 0                                               │
//! │         └── append sale_exchanges row                                  │
//! │                                                                         │
//! │  4. REPORT                                                             │
//! │     └── list_all() → two bulk queries, joined in memory                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::{Exchange, ExchangeItem, Money, Sale};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    barcode: String,
    total_cents: i64,
    original_total_cents: i64,
    profit_cents: i64,
    discount_cents: i64,
    is_pre_paid: bool,
    prepaid_cents: i64,
    final_payment_at: Option<DateTime<Utc>>,
    is_exchanged: bool,
    total_before_exchange_cents: Option<i64>,
    profit_before_exchange_cents: Option<i64>,
    created_at: DateTime<Utc>,
}

impl SaleRow {
    fn into_sale(self, exchanges: Vec<Exchange>) -> Sale {
        Sale {
            id: self.id,
            barcode: self.barcode,
            total: Money::from_cents(self.total_cents),
            original_total: Money::from_cents(self.original_total_cents),
            profit: Money::from_cents(self.profit_cents),
            discount_amount: Money::from_cents(self.discount_cents),
            is_pre_paid: self.is_pre_paid,
            prepaid_amount: Money::from_cents(self.prepaid_cents),
            final_payment_at: self.final_payment_at,
            is_exchanged: self.is_exchanged,
            exchanges,
            total_before_exchange: self.total_before_exchange_cents.map(Money::from_cents),
            profit_before_exchange: self.profit_before_exchange_cents.map(Money::from_cents),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ExchangeRow {
    id: String,
    sale_id: String,
    price_difference_cents: i64,
    exchanged_at: DateTime<Utc>,
    original_item: Option<String>,
    exchanged_with: Option<String>,
}

impl ExchangeRow {
    fn into_exchange(self) -> DbResult<(String, Exchange)> {
        let original_item = decode_item(&self.id, self.original_item.as_deref())?;
        let exchanged_with = decode_item(&self.id, self.exchanged_with.as_deref())?;
        Ok((
            self.sale_id,
            Exchange {
                id: self.id,
                price_difference: Money::from_cents(self.price_difference_cents),
                exchanged_at: self.exchanged_at,
                original_item,
                exchanged_with,
            },
        ))
    }
}

fn decode_item(exchange_id: &str, raw: Option<&str>) -> DbResult<Option<ExchangeItem>> {
    raw.map(serde_json::from_str)
        .transpose()
        .map_err(|e| DbError::corrupt("Exchange", exchange_id, e.to_string()))
}

fn encode_item(exchange_id: &str, item: Option<&ExchangeItem>) -> DbResult<Option<String>> {
    item.map(serde_json::to_string)
        .transpose()
        .map_err(|e| DbError::corrupt("Exchange", exchange_id, e.to_string()))
}

const SALE_COLUMNS: &str = r#"
    id, barcode,
    total_cents, original_total_cents, profit_cents, discount_cents,
    is_pre_paid, prepaid_cents, final_payment_at,
    is_exchanged, total_before_exchange_cents, profit_before_exchange_cents,
    created_at
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a sale together with its exchange history.
    ///
    /// Both tables are written in one transaction: a sale is never visible
    /// without the exchanges that explain its current total.
    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, barcode = %sale.barcode, exchanges = sale.exchanges.len(), "Inserting sale");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, barcode,
                total_cents, original_total_cents, profit_cents, discount_cents,
                is_pre_paid, prepaid_cents, final_payment_at,
                is_exchanged, total_before_exchange_cents, profit_before_exchange_cents,
                created_at
            ) VALUES (
                ?1, ?2,
                ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13
            )
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.barcode)
        .bind(sale.total.cents())
        .bind(sale.original_total.cents())
        .bind(sale.profit.cents())
        .bind(sale.discount_amount.cents())
        .bind(sale.is_pre_paid)
        .bind(sale.prepaid_amount.cents())
        .bind(sale.final_payment_at)
        .bind(sale.is_exchanged)
        .bind(sale.total_before_exchange.map(|m| m.cents()))
        .bind(sale.profit_before_exchange.map(|m| m.cents()))
        .bind(sale.created_at)
        .execute(&mut *tx)
        .await?;

        for (seq, exchange) in sale.exchanges.iter().enumerate() {
            insert_exchange(&mut tx, &sale.id, seq as i64, exchange).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a sale (with its exchanges) by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let row: Option<SaleRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let exchange_rows: Vec<ExchangeRow> = sqlx::query_as(
            r#"
            SELECT id, sale_id, price_difference_cents, exchanged_at, original_item, exchanged_with
            FROM sale_exchanges
            WHERE sale_id = ?1
            ORDER BY seq
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let exchanges = exchange_rows
            .into_iter()
            .map(|r| r.into_exchange().map(|(_, exchange)| exchange))
            .collect::<DbResult<Vec<_>>>()?;

        Ok(Some(row.into_sale(exchanges)))
    }

    /// Loads every sale with its exchanges.
    ///
    /// Both queries run in one read transaction, so an exchange recorded in
    /// between cannot show up without its updated sale row.
    pub async fn list_all(&self) -> DbResult<Vec<Sale>> {
        let mut tx = self.pool.begin().await?;
        let sales = load_all(&mut tx).await?;
        tx.commit().await?;
        Ok(sales)
    }

    /// Collects the remainder of a prepaid sale.
    ///
    /// ## Errors
    /// - `NotFound` if the sale does not exist
    /// - `InvalidState` if the sale is not prepaid or is already completed
    pub async fn complete_payment(&self, sale_id: &str, at: DateTime<Utc>) -> DbResult<()> {
        let state: Option<(bool, Option<DateTime<Utc>>)> =
            sqlx::query_as("SELECT is_pre_paid, final_payment_at FROM sales WHERE id = ?1")
                .bind(sale_id)
                .fetch_optional(&self.pool)
                .await?;

        match state {
            None => return Err(DbError::not_found("Sale", sale_id)),
            Some((false, _)) => {
                return Err(DbError::invalid_state("Sale", sale_id, "sale is not prepaid"))
            }
            Some((true, Some(_))) => {
                return Err(DbError::invalid_state(
                    "Sale",
                    sale_id,
                    "payment already completed",
                ))
            }
            Some((true, None)) => {}
        }

        // Guarded again in SQL so two concurrent completions cannot both win.
        let result = sqlx::query(
            r#"
            UPDATE sales SET final_payment_at = ?2
            WHERE id = ?1 AND is_pre_paid = 1 AND final_payment_at IS NULL
            "#,
        )
        .bind(sale_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::invalid_state(
                "Sale",
                sale_id,
                "payment already completed",
            ));
        }

        debug!(sale_id = %sale_id, "Prepaid sale completed");
        Ok(())
    }

    /// Appends an exchange to a sale and rewrites its current figures.
    ///
    /// The first exchange saves the current total and profit into the
    /// pre-exchange snapshot. Profit moves by the item margin delta when both
    /// items are known, and stays unchanged otherwise.
    ///
    /// ## Returns
    /// The sale as stored after the exchange.
    pub async fn record_exchange(&self, sale_id: &str, exchange: &Exchange) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(i64, i64, Option<i64>, i64)> = sqlx::query_as(
            r#"
            SELECT total_cents, profit_cents, total_before_exchange_cents,
                   (SELECT COUNT(*) FROM sale_exchanges WHERE sale_id = ?1)
            FROM sales WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((total_cents, profit_cents, snapshot, seq)) = current else {
            return Err(DbError::not_found("Sale", sale_id));
        };

        let profit_delta = exchange.item_profit_delta().unwrap_or_default();
        let new_total = Money::from_cents(total_cents) + exchange.price_difference;
        let new_profit = Money::from_cents(profit_cents) + profit_delta;

        debug!(
            sale_id = %sale_id,
            diff = %exchange.price_difference,
            first = snapshot.is_none(),
            "Recording exchange"
        );

        sqlx::query(
            r#"
            UPDATE sales SET
                total_before_exchange_cents = COALESCE(total_before_exchange_cents, ?2),
                profit_before_exchange_cents = COALESCE(profit_before_exchange_cents, ?3),
                total_cents = ?4,
                profit_cents = ?5,
                discount_cents = 0,
                is_exchanged = 1
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(total_cents)
        .bind(profit_cents)
        .bind(new_total.cents())
        .bind(new_profit.cents())
        .execute(&mut *tx)
        .await?;

        insert_exchange(&mut tx, sale_id, seq, exchange).await?;
        tx.commit().await?;

        self.get_by_id(sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))
    }

    /// Number of stored sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Every sale visible on `conn`, with its exchanges.
///
/// Two queries in total, never one per sale. Sales come back ordered by
/// creation time; exchanges keep their recorded order.
pub(crate) async fn load_all(conn: &mut SqliteConnection) -> DbResult<Vec<Sale>> {
    let sql = format!("SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at, id");
    let rows: Vec<SaleRow> = sqlx::query_as(&sql).fetch_all(&mut *conn).await?;

    let exchange_rows: Vec<ExchangeRow> = sqlx::query_as(
        r#"
        SELECT id, sale_id, price_difference_cents, exchanged_at, original_item, exchanged_with
        FROM sale_exchanges
        ORDER BY sale_id, seq
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut by_sale: HashMap<String, Vec<Exchange>> = HashMap::new();
    for row in exchange_rows {
        let (sale_id, exchange) = row.into_exchange()?;
        by_sale.entry(sale_id).or_default().push(exchange);
    }

    let sales: Vec<Sale> = rows
        .into_iter()
        .map(|row| {
            let exchanges = by_sale.remove(&row.id).unwrap_or_default();
            row.into_sale(exchanges)
        })
        .collect();

    debug!(count = sales.len(), "Loaded sales");
    Ok(sales)
}

async fn insert_exchange(
    tx: &mut Transaction<'_, Sqlite>,
    sale_id: &str,
    seq: i64,
    exchange: &Exchange,
) -> DbResult<()> {
    let id = if exchange.id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        exchange.id.clone()
    };
    let original_item = encode_item(&id, exchange.original_item.as_ref())?;
    let exchanged_with = encode_item(&id, exchange.exchanged_with.as_ref())?;

    sqlx::query(
        r#"
        INSERT INTO sale_exchanges (
            id, sale_id, seq, price_difference_cents, exchanged_at,
            original_item, exchanged_with
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&id)
    .bind(sale_id)
    .bind(seq)
    .bind(exchange.price_difference.cents())
    .bind(exchange.exchanged_at)
    .bind(original_item)
    .bind(exchanged_with)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
