//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Fatal for one report call                      │
//! │  └── ValidationError  - Bad window / request parameters                │
//! │                                                                         │
//! │  tally-core ledger errors (ledger::decompose)                          │
//! │  ├── DecomposeError   - Fatal for ONE sale, the sale is skipped        │
//! │  └── SaleAnomaly      - Not an error, reported and counted             │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  CLI errors (in app)                                                   │
//! │  └── ApiError         - What the caller sees (serialized)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → JSON on stdout         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors that abort a report call.
///
/// A single malformed sale never produces a `CoreError`: it is skipped by the
/// decomposer and counted in the report's `warnings`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The bulk read that feeds the engine failed.
    ///
    /// ## When This Occurs
    /// - Database file missing or locked
    /// - Pool exhausted / connection timeout
    /// - A stored row could not be decoded
    #[error("Upstream data source unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The requested operation does not accept this window.
    #[error("Window not supported for {operation}: {reason}")]
    UnsupportedWindow { operation: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any ledger work runs. No default window is ever guessed
/// for a missing parameter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Invalid format (e.g., unparseable date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A range whose bounds are out of order or out of limits.
    #[error("{field} is out of range: {reason}")]
    InvalidRange { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
