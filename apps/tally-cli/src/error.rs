//! # API Error Type
//!
//! What a failed command prints.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in tally-cli                              │
//! │                                                                         │
//! │  ConfigError ─────────────────────────────┐                            │
//! │  ValidationError ── CoreError ────────────┤                            │
//! │  DbError ─────────────────────────────────┼──► ApiError ──► stdout     │
//! │                                           │                            │
//! │  {                                        │                            │
//! │    "success": false,                      │                            │
//! │    "code": "UPSTREAM_UNAVAILABLE",        │                            │
//! │    "message": "Data source unavailable"   │                            │
//! │  }                                        │                            │
//! │                                                                         │
//! │  Never any partial numbers next to an error.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tally_core::{CoreError, ValidationError};
use tally_db::DbError;

use crate::config::ConfigError;

/// Error returned from a command.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{code:?}: {message}")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad window or date parameters
    ValidationError,

    /// Record not found
    NotFound,

    /// Write refused in the record's current state
    BusinessLogic,

    /// Bulk read failed, no report was produced
    UpstreamUnavailable,

    /// Bad environment configuration
    ConfigError,

    /// Internal error
    Internal,
}

/// Serialized failure document.
#[derive(Debug, Serialize)]
struct Failure<'a> {
    success: bool,
    code: ErrorCode,
    message: &'a str,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// The `{ success: false, code, message }` document.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(Failure {
            success: false,
            code: self.code,
            message: &self.message,
        })
        .unwrap_or(serde_json::Value::Null)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
            CoreError::UnsupportedWindow { .. } => ApiError::validation(err.to_string()),
            CoreError::UpstreamUnavailable(e) => {
                tracing::error!("Upstream unavailable: {}", e);
                ApiError::new(ErrorCode::UpstreamUnavailable, "Data source unavailable")
            }
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ApiError::new(ErrorCode::NotFound, format!("{entity} not found: {id}"))
            }
            DbError::UniqueViolation { field, .. } => {
                ApiError::validation(format!("{field} already exists"))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::InvalidState { .. } => ApiError::new(ErrorCode::BusinessLogic, err.to_string()),
            // Everything else means the store could not be read.
            other => CoreError::from(other).into(),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}
