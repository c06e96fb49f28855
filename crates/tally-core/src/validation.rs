//! # Validation Module
//!
//! Turns raw request parameters into a [`Window`], or a [`ValidationError`].
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Command line (clap)                                          │
//! │  ├── Flag presence and shape                                           │
//! │  └── Immediate usage errors                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── mode is day | range | all                                         │
//! │  ├── the dates the mode needs are present and parse                    │
//! │  └── from <= to                                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SummaryComposer                                              │
//! │  └── operation-specific window rules (no all-time period summary)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A missing parameter is always an error. No default window is guessed.
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{parse_window, WindowRequest};
//!
//! let request = WindowRequest {
//!     mode: Some("range".to_string()),
//!     from: Some("2024-03-01".to_string()),
//!     to: Some("2024-03-07".to_string()),
//!     ..Default::default()
//! };
//! assert!(parse_window(&request).is_ok());
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::window::{Calendar, Window};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Accepted date format for every date parameter.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Accepted values of the `mode` parameter.
pub const WINDOW_MODES: [&str; 3] = ["day", "range", "all"];

// =============================================================================
// Window Request
// =============================================================================

/// Raw, unvalidated window parameters as they arrive from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowRequest {
    pub mode: Option<String>,
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

// =============================================================================
// Validators
// =============================================================================

/// Parses a `YYYY-MM-DD` date parameter.
///
/// ## Example
/// ```rust
/// use tally_core::validation::parse_date;
///
/// assert!(parse_date("date", Some("2024-03-05")).is_ok());
/// assert!(parse_date("date", Some("05/03/2024")).is_err());
/// assert!(parse_date("date", None).is_err());
/// ```
pub fn parse_date(field: &str, value: Option<&str>) -> ValidationResult<NaiveDate> {
    let value = value.map(str::trim).unwrap_or_default();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let date = NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("expected YYYY-MM-DD ({e})"),
        }
    })?;

    if !Calendar::has_day_boundaries(date) {
        return Err(ValidationError::InvalidRange {
            field: field.to_string(),
            reason: format!("{date} is outside the supported calendar"),
        });
    }
    Ok(date)
}

/// Validates a window request.
///
/// ## Rules
/// - `mode` must be present and one of `day`, `range`, `all`
/// - `day` requires `date`
/// - `range` requires `from` and `to`, with `from <= to`
/// - `all` ignores the date parameters
pub fn parse_window(request: &WindowRequest) -> ValidationResult<Window> {
    let mode = request
        .mode
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ValidationError::Required {
            field: "mode".to_string(),
        })?;

    match mode {
        "day" => Ok(Window::day(parse_date("date", request.date.as_deref())?)),
        "range" => {
            let from = parse_date("from", request.from.as_deref())?;
            let to = parse_date("to", request.to.as_deref())?;
            Window::range(from, to)
        }
        "all" => Ok(Window::AllTime),
        _ => Err(ValidationError::NotAllowed {
            field: "mode".to_string(),
            allowed: WINDOW_MODES.iter().map(|m| m.to_string()).collect(),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: &str) -> WindowRequest {
        WindowRequest {
            mode: Some(mode.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_day_requires_date() {
        let err = parse_window(&request("day")).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Required {
                field: "date".to_string()
            }
        );

        let ok = parse_window(&WindowRequest {
            date: Some("2024-03-05".to_string()),
            ..request("day")
        })
        .unwrap();
        assert_eq!(
            ok,
            Window::day(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
        );
    }

    #[test]
    fn test_range_requires_both_bounds() {
        let missing_to = WindowRequest {
            from: Some("2024-03-01".to_string()),
            ..request("range")
        };
        assert_eq!(
            parse_window(&missing_to).unwrap_err(),
            ValidationError::Required {
                field: "to".to_string()
            }
        );

        let missing_from = WindowRequest {
            to: Some("2024-03-01".to_string()),
            ..request("range")
        };
        assert!(matches!(
            parse_window(&missing_from),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_range_rejects_from_after_to() {
        let reversed = WindowRequest {
            from: Some("2024-03-07".to_string()),
            to: Some("2024-03-01".to_string()),
            ..request("range")
        };
        assert!(matches!(
            parse_window(&reversed),
            Err(ValidationError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_unknown_or_missing_mode() {
        assert!(matches!(
            parse_window(&request("week")),
            Err(ValidationError::NotAllowed { .. })
        ));
        assert!(matches!(
            parse_window(&WindowRequest::default()),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            parse_window(&request("  ")),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_all_mode_ignores_dates() {
        assert_eq!(parse_window(&request("all")).unwrap(), Window::AllTime);
    }

    #[test]
    fn test_bad_date_format() {
        let err = parse_date("date", Some("2024-13-01")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }

    #[test]
    fn test_date_at_end_of_calendar_rejected() {
        let err = parse_date("date", Some("+262142-12-31")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRange { ref field, .. } if field == "date"));

        let range = WindowRequest {
            from: Some("2024-03-01".to_string()),
            to: Some("+262142-12-31".to_string()),
            ..request("range")
        };
        assert!(matches!(
            parse_window(&range),
            Err(ValidationError::InvalidRange { .. })
        ));
    }
}
