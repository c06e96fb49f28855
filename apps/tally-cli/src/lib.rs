//! # Tally CLI Library
//!
//! Parses a command, opens the database, runs the command and prints one
//! JSON document.
//!
//! ## Module Organization
//! ```text
//! tally_cli/
//! ├── lib.rs          ◄─── You are here (startup & output)
//! ├── cli.rs          ◄─── clap arguments
//! ├── config.rs       ◄─── Environment configuration
//! ├── commands.rs     ◄─── Report / write / migrate commands
//! └── error.rs        ◄─── ApiError and the failure document
//! ```
//!
//! ## Output
//! ```text
//! success: { "success": true,  "data": { ...report... } }
//! failure: { "success": false, "code": "VALIDATION_ERROR", "message": "..." }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

use std::process::ExitCode;

use clap::Parser;
use serde_json::{json, Value};
use tally_db::{Database, DbConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::CliConfig;
use crate::error::ApiError;

/// Runs the CLI.
///
/// ## Startup Sequence
/// ```text
/// 1. Parse arguments (clap exits on usage errors)
/// 2. Load configuration from the environment
/// 3. Initialize logging (stderr; stdout is reserved for the JSON result)
/// 4. Open the database
/// 5. Execute the command
/// 6. Print the success or failure document
/// ```
pub async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = match CliConfig::load() {
        Ok(config) => config.with_db_path(cli.db.clone()),
        Err(err) => {
            init_tracing(false);
            emit(&ApiError::from(err).to_json(), cli.pretty)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    init_tracing(config.log_json);

    match run_command(&cli.command, &config).await {
        Ok(data) => {
            emit(&json!({ "success": true, "data": data }), cli.pretty)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            emit(&err.to_json(), cli.pretty)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_command(command: &Command, config: &CliConfig) -> Result<Value, ApiError> {
    info!(
        db = %config.db_path.display(),
        utc_offset_minutes = config.utc_offset_minutes,
        "Starting tally"
    );

    // `migrate` applies migrations itself so it can report what it did.
    let db_config = DbConfig::new(config.db_path.clone())
        .max_connections(config.max_connections)
        .run_migrations(!matches!(command, Command::Migrate));

    let db = Database::new(db_config).await?;
    let result = commands::execute(command, &db, config.calendar).await;
    db.close().await;
    result
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins over the default filter.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // try_init: a second call (tests) keeps the first subscriber
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

fn emit(document: &Value, pretty: bool) -> anyhow::Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(document)?
    } else {
        serde_json::to_string(document)?
    };
    println!("{text}");
    Ok(())
}
