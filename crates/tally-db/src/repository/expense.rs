//! # Expense Repository
//!
//! Expense rows as the ledger reads them: amount, flags, recurrence and
//! creation time. Nothing here decides how an expense is charged to a period.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{Expense, ExpenseRecurrence, Money};

#[derive(Debug, sqlx::FromRow)]
struct ExpenseRow {
    id: String,
    description: String,
    amount_cents: i64,
    admin: bool,
    is_fixed: bool,
    recurrence: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ExpenseRow> for Expense {
    type Error = DbError;

    fn try_from(row: ExpenseRow) -> DbResult<Self> {
        let recurrence = ExpenseRecurrence::parse(&row.recurrence).ok_or_else(|| {
            DbError::corrupt("Expense", &row.id, format!("unknown recurrence '{}'", row.recurrence))
        })?;
        Ok(Expense {
            id: row.id,
            description: row.description,
            amount: Money::from_cents(row.amount_cents),
            admin: row.admin,
            is_fixed: row.is_fixed,
            recurrence,
            created_at: row.created_at,
        })
    }
}

/// Repository for expense database operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    /// Creates a new ExpenseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Inserts an expense. Amounts are stored positive.
    pub async fn insert(&self, expense: &Expense) -> DbResult<()> {
        debug!(id = %expense.id, amount = %expense.amount, "Inserting expense");

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, description, amount_cents, admin, is_fixed, recurrence, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.description)
        .bind(expense.amount.cents())
        .bind(expense.admin)
        .bind(expense.is_fixed)
        .bind(expense.recurrence.as_str())
        .bind(expense.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Loads every expense, oldest first.
    pub async fn list_all(&self) -> DbResult<Vec<Expense>> {
        let mut conn = self.pool.acquire().await?;
        load_all(&mut conn).await
    }
}

/// Reads every row on the given connection, so a caller holding a
/// transaction gets rows from its snapshot.
pub(crate) async fn load_all(conn: &mut SqliteConnection) -> DbResult<Vec<Expense>> {
    let rows: Vec<ExpenseRow> = sqlx::query_as(
        r#"
        SELECT id, description, amount_cents, admin, is_fixed, recurrence, created_at
        FROM expenses
        ORDER BY created_at, id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Expense::try_from).collect()
}
