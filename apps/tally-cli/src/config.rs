//! CLI configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. Command-line flags (see [`crate::cli`]) override the database path.

use std::env;
use std::path::PathBuf;

use tally_core::Calendar;

/// Reporting CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Business calendar (TALLY_UTC_OFFSET_MINUTES)
    pub calendar: Calendar,

    /// Offset the calendar was built from, in minutes east of UTC
    pub utc_offset_minutes: i32,

    /// Pool size
    pub max_connections: u32,

    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
}

impl CliConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any name → value lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let utc_offset_minutes: i32 = lookup("TALLY_UTC_OFFSET_MINUTES")
            .unwrap_or_else(|| "0".to_string())
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue("TALLY_UTC_OFFSET_MINUTES".to_string()))?;

        let calendar = Calendar::from_offset_minutes(utc_offset_minutes)
            .map_err(|_| ConfigError::InvalidValue("TALLY_UTC_OFFSET_MINUTES".to_string()))?;

        let max_connections: u32 = lookup("TALLY_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string()))?;

        if max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "TALLY_DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        let log_json = match lookup("TALLY_LOG_JSON").as_deref().map(str::trim) {
            None | Some("") => false,
            Some(v) => parse_flag(v)
                .ok_or_else(|| ConfigError::InvalidValue("TALLY_LOG_JSON".to_string()))?,
        };

        Ok(CliConfig {
            db_path: lookup("TALLY_DB_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./tally.db")),
            calendar,
            utc_offset_minutes,
            max_connections,
            log_json,
        })
    }

    /// Replaces the database path when `--db` was given.
    pub fn with_db_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.db_path = path;
        }
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
