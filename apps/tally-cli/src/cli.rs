//! Command-line arguments.
//!
//! Dates stay strings here; they are validated by
//! [`tally_core::validation`] so a bad date is a structured
//! `VALIDATION_ERROR`, not a clap usage error.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tally_core::analytics::Granularity;
use tally_core::validation::WindowRequest;

#[derive(Debug, Parser)]
#[command(name = "tally", version, about = "Revenue, profit and register reports")]
pub struct Cli {
    /// Database file. Overrides TALLY_DB_PATH.
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Pretty-print the JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sales, orders and expenses for one day or a date range.
    Period(WindowArgs),

    /// Sales and orders over the whole history.
    AllTime,

    /// Register balance: sales revenue minus register expenses plus adjustments.
    TotalRevenue,

    /// Opening balance, itemized movements and closing balance of one day.
    History {
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: String,
    },

    /// Sales and order figures per day or per month.
    Trend {
        #[command(flatten)]
        window: WindowArgs,

        #[arg(long, value_enum, default_value_t = Bucket::Day)]
        bucket: Bucket,
    },

    /// Figures per hour of one day.
    Hourly {
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: String,
    },

    /// Expense totals per category and month.
    Expenses(WindowArgs),

    /// Load sales, expenses, revenue changes and orders from a JSON snapshot.
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Collect the remainder of a prepaid sale.
    CompletePayment {
        #[arg(value_name = "SALE_ID")]
        sale_id: String,

        /// RFC 3339 timestamp. Defaults to now.
        #[arg(long, value_name = "TIMESTAMP")]
        at: Option<String>,
    },

    /// Apply pending database migrations.
    Migrate,
}

/// Window selection shared by the windowed reports.
#[derive(Debug, Clone, Default, Args)]
pub struct WindowArgs {
    /// Single calendar day.
    #[arg(long, value_name = "YYYY-MM-DD", conflicts_with_all = ["from", "to", "all"])]
    pub day: Option<String>,

    /// First day of an inclusive range.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub from: Option<String>,

    /// Last day of an inclusive range.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub to: Option<String>,

    /// No date filter.
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub all: bool,
}

impl WindowArgs {
    /// The raw request the core validator checks. With no flag at all the
    /// mode stays empty and validation reports it as required.
    pub fn request(&self) -> WindowRequest {
        let mode = if self.all {
            Some("all")
        } else if self.day.is_some() {
            Some("day")
        } else if self.from.is_some() || self.to.is_some() {
            Some("range")
        } else {
            None
        };

        WindowRequest {
            mode: mode.map(str::to_string),
            date: self.day.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Bucket {
    Day,
    Month,
}

impl From<Bucket> for Granularity {
    fn from(bucket: Bucket) -> Self {
        match bucket {
            Bucket::Day => Granularity::Day,
            Bucket::Month => Granularity::Month,
        }
    }
}
