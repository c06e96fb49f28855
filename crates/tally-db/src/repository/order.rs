//! # Order Repository
//!
//! Delivery orders. Only the status and its timestamp matter to the ledger:
//! a received order contributes on the day it was received.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{Money, Order, OrderStatus};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    order_number: i64,
    total_cents: i64,
    discount_cents: i64,
    profit_cents: i64,
    status: String,
    status_updated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> DbResult<Self> {
        let status = OrderStatus::parse(&row.status).ok_or_else(|| {
            DbError::corrupt("Order", &row.id, format!("unknown status '{}'", row.status))
        })?;
        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            total: Money::from_cents(row.total_cents),
            discount_amount: Money::from_cents(row.discount_cents),
            profit: Money::from_cents(row.profit_cents),
            status,
            status_updated_at: row.status_updated_at,
            created_at: row.created_at,
        })
    }
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts an order.
    pub async fn insert(&self, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, order_number = order.order_number, "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, total_cents, discount_cents, profit_cents,
                status, status_updated_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&order.id)
        .bind(order.order_number)
        .bind(order.total.cents())
        .bind(order.discount_amount.cents())
        .bind(order.profit.cents())
        .bind(order.status.as_str())
        .bind(order.status_updated_at)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Moves an order to `status`, stamping the change time.
    pub async fn update_status(
        &self,
        id: &str,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET status = ?2, status_updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        debug!(id = %id, status = status.as_str(), "Order status updated");
        Ok(())
    }

    /// Loads every order, by order number.
    pub async fn list_all(&self) -> DbResult<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        load_all(&mut conn).await
    }
}

pub(crate) async fn load_all(conn: &mut SqliteConnection) -> DbResult<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(
        r#"
        SELECT id, order_number, total_cents, discount_cents, profit_cents,
               status, status_updated_at, created_at
        FROM orders
        ORDER BY order_number
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Order::try_from).collect()
}
