//! # Reporting Windows
//!
//! Turns "which days does the owner want to see" into exact UTC instants.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Window (calendar days)         Calendar (fixed offset)                 │
//! │  ┌─────────────────────┐        ┌─────────────────────┐                 │
//! │  │ Day(2024-03-05)     │        │ UTC+01:00           │                 │
//! │  │ Range{from, to}     │ ─────► │ start_of_day(d)     │ ───► Interval   │
//! │  │ AllTime             │        └─────────────────────┘      [start,end)│
//! │  └─────────────────────┘                                                │
//! │                                                                         │
//! │  Day(d)          → [start_of_day(d),    start_of_day(d+1))              │
//! │  Range{from, to} → [start_of_day(from), start_of_day(to+1))             │
//! │  AllTime         → (-∞, +∞)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Intervals are half-open, so adjacent days never share an instant and an
//! event at exactly midnight belongs to the day that starts there.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Timelike,
    Utc,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::ExpenseRecurrence;

/// Largest accepted distance from UTC, in minutes.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

// =============================================================================
// Calendar
// =============================================================================

/// The business's wall clock: a fixed offset from UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Calendar {
    /// Calendar whose days start at 00:00 UTC.
    pub fn utc() -> Self {
        Calendar { offset: Utc.fix() }
    }

    /// Builds a calendar from an offset in minutes east of UTC.
    ///
    /// ```rust
    /// use tally_core::window::Calendar;
    ///
    /// assert!(Calendar::from_offset_minutes(60).is_ok());
    /// assert!(Calendar::from_offset_minutes(15 * 60).is_err());
    /// ```
    pub fn from_offset_minutes(minutes: i32) -> Result<Self, ValidationError> {
        if minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ValidationError::InvalidRange {
                field: "utc_offset_minutes".to_string(),
                reason: format!("must be within ±{MAX_UTC_OFFSET_MINUTES}"),
            });
        }
        FixedOffset::east_opt(minutes * 60)
            .map(|offset| Calendar { offset })
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "utc_offset_minutes".to_string(),
                reason: format!("{minutes} is not a valid offset"),
            })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The UTC instant at which the given local day begins.
    ///
    /// Saturates at the ends of the representable timeline.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let local_midnight = date.and_time(NaiveTime::MIN);
        let shift = Duration::seconds(i64::from(self.offset.local_minus_utc()));
        match local_midnight.checked_sub_signed(shift) {
            Some(utc) => Utc.from_utc_datetime(&utc),
            None if shift > Duration::zero() => DateTime::<Utc>::MIN_UTC,
            None => DateTime::<Utc>::MAX_UTC,
        }
    }

    /// The UTC instant at which the day after `date` begins.
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.start_of_day(date)
            .checked_add_signed(Duration::days(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether both day boundaries of `date` exist on every supported
    /// offset, so the day can be reported on without saturating.
    pub fn has_day_boundaries(date: NaiveDate) -> bool {
        date.pred_opt().is_some() && date.succ_opt().and_then(|d| d.succ_opt()).is_some()
    }

    /// The local calendar day an instant falls on.
    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.offset).date_naive()
    }

    /// The local hour (0-23) an instant falls in.
    pub fn local_hour(&self, ts: DateTime<Utc>) -> u32 {
        ts.with_timezone(&self.offset).hour()
    }

    /// Local `HH:MM` of an instant.
    pub fn local_time_label(&self, ts: DateTime<Utc>) -> String {
        ts.with_timezone(&self.offset).format("%H:%M").to_string()
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Calendar::utc()
    }
}

// =============================================================================
// Interval
// =============================================================================

/// Half-open UTC interval `[start, end)`. A missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Interval {
    /// The whole timeline.
    pub const fn unbounded() -> Self {
        Interval {
            start: None,
            end: None,
        }
    }

    /// Everything strictly before `end`.
    pub const fn before(end: DateTime<Utc>) -> Self {
        Interval {
            start: None,
            end: Some(end),
        }
    }

    pub const fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Interval {
            start: Some(start),
            end: Some(end),
        }
    }

    #[inline]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| ts >= start) && self.end.map_or(true, |end| ts < end)
    }
}

// =============================================================================
// Window
// =============================================================================

/// A reporting window in calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Window {
    /// One calendar day.
    Day {
        #[ts(as = "String")]
        date: NaiveDate,
    },
    /// Inclusive range of calendar days.
    Range {
        #[ts(as = "String")]
        from: NaiveDate,
        #[ts(as = "String")]
        to: NaiveDate,
    },
    /// No filtering at all.
    AllTime,
}

impl Window {
    pub fn day(date: NaiveDate) -> Self {
        Window::Day { date }
    }

    /// Builds a range window, rejecting `from > to`.
    pub fn range(from: NaiveDate, to: NaiveDate) -> Result<Self, ValidationError> {
        if from > to {
            return Err(ValidationError::InvalidRange {
                field: "from".to_string(),
                reason: format!("{from} is after {to}"),
            });
        }
        Ok(Window::Range { from, to })
    }

    pub fn is_all_time(&self) -> bool {
        matches!(self, Window::AllTime)
    }

    /// Resolves the window into UTC instants on the given calendar.
    pub fn resolve(&self, calendar: &Calendar) -> Interval {
        match *self {
            Window::Day { date } => {
                Interval::between(calendar.start_of_day(date), calendar.end_of_day(date))
            }
            Window::Range { from, to } => {
                Interval::between(calendar.start_of_day(from), calendar.end_of_day(to))
            }
            Window::AllTime => Interval::unbounded(),
        }
    }

    /// How many times a fixed expense is charged inside this window.
    ///
    /// ```text
    /// Day                 → 1 (both recurrences)
    /// Range, Daily        → calendar days spanned, inclusive
    /// Range, Monthly      → calendar months spanned, inclusive
    ///                       2024-01-31 .. 2024-02-01 → 2
    /// AllTime             → 0 (no finite count)
    /// ```
    pub fn fixed_units(&self, recurrence: ExpenseRecurrence) -> i64 {
        match (*self, recurrence) {
            (Window::Day { .. }, _) => 1,
            (Window::Range { from, to }, ExpenseRecurrence::Daily) => {
                (to - from).num_days() + 1
            }
            (Window::Range { from, to }, ExpenseRecurrence::Monthly) => {
                let years = i64::from(to.year() - from.year());
                let months = i64::from(to.month()) - i64::from(from.month());
                years * 12 + months + 1
            }
            (Window::AllTime, _) => 0,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
