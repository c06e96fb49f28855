//! # Revenue Change Repository
//!
//! Signed manual adjustments of the register.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{Money, RevenueChange};

#[derive(Debug, sqlx::FromRow)]
struct RevenueChangeRow {
    id: String,
    description: String,
    amount_cents: i64,
    created_at: DateTime<Utc>,
}

impl From<RevenueChangeRow> for RevenueChange {
    fn from(row: RevenueChangeRow) -> Self {
        RevenueChange {
            id: row.id,
            description: row.description,
            amount: Money::from_cents(row.amount_cents),
            created_at: row.created_at,
        }
    }
}

/// Repository for revenue change database operations.
#[derive(Debug, Clone)]
pub struct RevenueChangeRepository {
    pool: SqlitePool,
}

impl RevenueChangeRepository {
    /// Creates a new RevenueChangeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RevenueChangeRepository { pool }
    }

    /// Inserts a revenue change. The amount keeps its sign.
    pub async fn insert(&self, change: &RevenueChange) -> DbResult<()> {
        debug!(id = %change.id, amount = %change.amount, "Inserting revenue change");

        sqlx::query(
            r#"
            INSERT INTO revenue_changes (id, description, amount_cents, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&change.id)
        .bind(&change.description)
        .bind(change.amount.cents())
        .bind(change.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Loads every revenue change, oldest first.
    pub async fn list_all(&self) -> DbResult<Vec<RevenueChange>> {
        let mut conn = self.pool.acquire().await?;
        load_all(&mut conn).await
    }
}

/// Every revenue change visible on `conn`.
pub(crate) async fn load_all(conn: &mut SqliteConnection) -> DbResult<Vec<RevenueChange>> {
    let rows: Vec<RevenueChangeRow> = sqlx::query_as(
        r#"
        SELECT id, description, amount_cents, created_at
        FROM revenue_changes
        ORDER BY created_at, id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(RevenueChange::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_signed_amounts_survive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let withdrawal = RevenueChange {
            id: "c1".to_string(),
            description: "owner withdrawal".to_string(),
            amount: Money::from_cents(-12_550),
            created_at: Utc.with_ymd_and_hms(2024, 3, 4, 18, 30, 0).unwrap(),
        };
        db.revenue_changes().insert(&withdrawal).await.unwrap();

        let rows = db.revenue_changes().list_all().await.unwrap();
        assert_eq!(rows, vec![withdrawal]);
    }
}
