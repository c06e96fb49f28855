//! # Commands
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  report commands                                                       │
//! │    load_snapshot() ──► SummaryComposer (one decomposition) ──► JSON    │
//! │                                                                         │
//! │  write commands                                                        │
//! │    import / complete-payment ──► repositories                          │
//! │                                                                         │
//! │  maintenance                                                           │
//! │    migrate ──► embedded migrations                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tally_core::analytics::Granularity;
use tally_core::validation::{parse_date, parse_window};
use tally_core::{Calendar, LedgerSnapshot, SummaryComposer, ValidationError, Window};
use tally_db::migrations::migration_status;
use tally_db::Database;
use tracing::{debug, info};

use crate::cli::Command;
use crate::error::ApiError;

/// Runs one command against the database.
pub async fn execute(command: &Command, db: &Database, calendar: Calendar) -> Result<Value, ApiError> {
    match command {
        Command::Migrate => {
            db.run_migrations().await?;
            let (total, applied) = migration_status(db.pool()).await?;
            Ok(json!({ "total": total, "applied": applied }))
        }
        Command::Import { file } => import(db, file).await,
        Command::CompletePayment { sale_id, at } => {
            let at = match at {
                Some(raw) => parse_timestamp("at", raw)?,
                None => Utc::now(),
            };
            db.sales().complete_payment(sale_id, at).await?;
            let sale = db
                .sales()
                .get_by_id(sale_id)
                .await?
                .ok_or_else(|| ApiError::internal(format!("sale {sale_id} vanished")))?;
            info!(sale_id = %sale_id, "Payment completed");
            Ok(json!({
                "id": sale.id,
                "barcode": sale.barcode,
                "paymentStatus": sale.payment_status(),
                "finalPaymentAt": sale.final_payment_at,
            }))
        }
        report_command => {
            // Bad parameters fail before the bulk read.
            let request = ReportRequest::from_command(report_command)?;
            let snapshot = db.load_snapshot().await?;
            request.render(&snapshot, calendar)
        }
    }
}

/// Builds a report from an already loaded snapshot.
pub fn report(command: &Command, snapshot: &LedgerSnapshot, calendar: Calendar) -> Result<Value, ApiError> {
    ReportRequest::from_command(command)?.render(snapshot, calendar)
}

/// A report command with its parameters validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportRequest {
    Period(Window),
    AllTime,
    TotalRevenue,
    History(NaiveDate),
    Trend(Window, Granularity),
    Hourly(NaiveDate),
    Expenses(Window),
}

impl ReportRequest {
    /// Validates the parameters without touching any data.
    fn from_command(command: &Command) -> Result<Self, ApiError> {
        let request = match command {
            Command::Period(args) => {
                let window = parse_window(&args.request())?;
                ReportRequest::Period(SummaryComposer::period_window(window)?)
            }
            Command::AllTime => ReportRequest::AllTime,
            Command::TotalRevenue => ReportRequest::TotalRevenue,
            Command::History { date } => ReportRequest::History(parse_date("date", Some(date))?),
            Command::Trend { window, bucket } => {
                ReportRequest::Trend(parse_window(&window.request())?, (*bucket).into())
            }
            Command::Hourly { date } => ReportRequest::Hourly(parse_date("date", Some(date))?),
            Command::Expenses(args) => ReportRequest::Expenses(parse_window(&args.request())?),
            Command::Migrate | Command::Import { .. } | Command::CompletePayment { .. } => {
                return Err(ApiError::internal("not a report command"))
            }
        };
        Ok(request)
    }

    fn render(self, snapshot: &LedgerSnapshot, calendar: Calendar) -> Result<Value, ApiError> {
        let composer = SummaryComposer::new(snapshot, calendar);
        match self {
            ReportRequest::Period(window) => to_value(&composer.period_summary(window)?),
            ReportRequest::AllTime => to_value(&composer.all_time_summary()),
            ReportRequest::TotalRevenue => to_value(&composer.total_revenue()),
            ReportRequest::History(date) => to_value(&composer.day_history(date)),
            ReportRequest::Trend(window, granularity) => {
                to_value(&composer.revenue_trend(&window, granularity))
            }
            ReportRequest::Hourly(date) => to_value(&composer.hourly_pattern(date)),
            ReportRequest::Expenses(window) => to_value(&composer.expense_analysis(&window)),
        }
    }
}

/// Inserts every record of a JSON snapshot file.
///
/// Stops at the first failing record; records inserted before it stay.
async fn import(db: &Database, file: &Path) -> Result<Value, ApiError> {
    let raw = std::fs::read_to_string(file)
        .map_err(|e| ApiError::validation(format!("cannot read {}: {e}", file.display())))?;
    let snapshot: LedgerSnapshot = serde_json::from_str(&raw)
        .map_err(|e| ApiError::validation(format!("invalid snapshot {}: {e}", file.display())))?;

    debug!(path = %file.display(), sales = snapshot.sales.len(), "Importing snapshot");

    let sales = db.sales();
    for sale in &snapshot.sales {
        sales.insert(sale).await?;
    }
    let expenses = db.expenses();
    for expense in &snapshot.expenses {
        expenses.insert(expense).await?;
    }
    let changes = db.revenue_changes();
    for change in &snapshot.revenue_changes {
        changes.insert(change).await?;
    }
    let orders = db.orders();
    for order in &snapshot.orders {
        orders.insert(order).await?;
    }

    info!(
        sales = snapshot.sales.len(),
        expenses = snapshot.expenses.len(),
        revenue_changes = snapshot.revenue_changes.len(),
        orders = snapshot.orders.len(),
        "Snapshot imported"
    );

    Ok(json!({
        "sales": snapshot.sales.len(),
        "expenses": snapshot.expenses.len(),
        "revenueChanges": snapshot.revenue_changes.len(),
        "orders": snapshot.orders.len(),
    }))
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("expected RFC 3339 ({e})"),
        })
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Bucket, WindowArgs};
    use crate::error::ErrorCode;
    use chrono::TimeZone;
    use tally_core::{Expense, ExpenseRecurrence, Money, Sale};
    use tally_db::DbConfig;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn snapshot() -> LedgerSnapshot {
        let prepaid = Sale {
            id: "p1".to_string(),
            barcode: "R-0002".to_string(),
            total: Money::from_units(2000),
            original_total: Money::from_units(2000),
            profit: Money::from_units(800),
            discount_amount: Money::zero(),
            is_pre_paid: true,
            prepaid_amount: Money::from_units(500),
            final_payment_at: Some(at(12, 15)),
            is_exchanged: false,
            exchanges: vec![],
            total_before_exchange: None,
            profit_before_exchange: None,
            created_at: at(10, 11),
        };
        let plain = Sale {
            id: "s1".to_string(),
            barcode: "R-0001".to_string(),
            total: Money::from_units(1000),
            original_total: Money::from_units(1100),
            profit: Money::from_units(300),
            discount_amount: Money::from_units(100),
            is_pre_paid: false,
            prepaid_amount: Money::zero(),
            final_payment_at: None,
            created_at: at(10, 9),
            ..prepaid.clone()
        };
        LedgerSnapshot {
            sales: vec![plain, prepaid],
            expenses: vec![Expense {
                id: "e1".to_string(),
                description: "cleaning".to_string(),
                amount: Money::from_units(50),
                admin: false,
                is_fixed: false,
                recurrence: ExpenseRecurrence::Monthly,
                created_at: at(10, 18),
            }],
            ..Default::default()
        }
    }

    fn day(date: &str) -> WindowArgs {
        WindowArgs {
            day: Some(date.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_period_report() {
        let value = report(&Command::Period(day("2024-03-10")), &snapshot(), Calendar::utc()).unwrap();
        // 900 from the plain sale, 500 prepayment
        assert_eq!(value["sales"]["revenue"], json!(140_000));
        assert_eq!(value["window"]["mode"], json!("day"));
        assert_eq!(value["expenses"]["nonFixed"], json!(5_000));
    }

    #[test]
    fn test_period_requires_window() {
        let err = report(&Command::Period(WindowArgs::default()), &snapshot(), Calendar::utc())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "mode is required");
    }

    #[test]
    fn test_period_rejects_all_time() {
        let all = WindowArgs {
            all: true,
            ..Default::default()
        };
        let err = report(&Command::Period(all), &snapshot(), Calendar::utc()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_history_report() {
        let command = Command::History {
            date: "2024-03-12".to_string(),
        };
        let value = report(&command, &snapshot(), Calendar::utc()).unwrap();
        // 900 + 500 - 50 before the day, then the 1500 remainder
        assert_eq!(value["openingBalance"], json!(135_000));
        assert_eq!(value["closingBalance"], json!(285_000));
        assert_eq!(value["changeCount"], json!(1));
    }

    #[test]
    fn test_history_bad_date() {
        let command = Command::History {
            date: "12/03/2024".to_string(),
        };
        let err = report(&command, &snapshot(), Calendar::utc()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_history_date_at_end_of_calendar() {
        let command = Command::History {
            date: "+262142-12-31".to_string(),
        };
        let err = report(&command, &snapshot(), Calendar::utc()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_bad_window_fails_before_reading_the_store() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;

        // a closed store would surface as UPSTREAM_UNAVAILABLE
        let err = execute(&Command::Period(WindowArgs::default()), &db, Calendar::utc())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let all = WindowArgs {
            all: true,
            ..Default::default()
        };
        let err = execute(&Command::Period(all), &db, Calendar::utc())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = execute(&Command::TotalRevenue, &db, Calendar::utc())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UpstreamUnavailable);
    }

    #[test]
    fn test_trend_by_month() {
        let command = Command::Trend {
            window: WindowArgs {
                all: true,
                ..Default::default()
            },
            bucket: Bucket::Month,
        };
        let value = report(&command, &snapshot(), Calendar::utc()).unwrap();
        assert_eq!(value[0]["bucket"], json!("2024-03"));
        assert_eq!(value[0]["salesRevenue"], json!(290_000));
    }

    #[tokio::test]
    async fn test_import_then_complete_payment() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut data = snapshot();
        data.sales[1].final_payment_at = None;

        let path = std::env::temp_dir().join(format!("tally-import-{}.json", std::process::id()));
        std::fs::write(&path, serde_json::to_string(&data).unwrap()).unwrap();

        let imported = execute(&Command::Import { file: path.clone() }, &db, Calendar::utc())
            .await
            .unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(imported["sales"], json!(2));
        assert_eq!(imported["expenses"], json!(1));

        let complete = Command::CompletePayment {
            sale_id: "p1".to_string(),
            at: Some("2024-03-12T15:00:00Z".to_string()),
        };
        let done = execute(&complete, &db, Calendar::utc()).await.unwrap();
        assert_eq!(done["paymentStatus"], json!("completed_later"));

        let again = execute(&complete, &db, Calendar::utc()).await.unwrap_err();
        assert_eq!(again.code, ErrorCode::BusinessLogic);

        let total = execute(&Command::TotalRevenue, &db, Calendar::utc())
            .await
            .unwrap();
        // 900 + 2000 - 50
        assert_eq!(total["totalRevenue"], json!(285_000));
    }

    #[tokio::test]
    async fn test_migrate_reports_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let value = execute(&Command::Migrate, &db, Calendar::utc()).await.unwrap();
        assert_eq!(value["total"], value["applied"]);
    }
}
