//! Time primitives for availability and booking arithmetic.
//!
//! This module provides [`TimeWindow`] for UTC query ranges and the
//! local-time resolution helpers used to turn a rule's wall-clock time in an
//! IANA zone into a UTC instant.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A UTC time window, half-open `[start, end)`.
///
/// Used for free/busy queries and for the padded re-check window during
/// booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates a time window from a start time and duration.
    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> Self {
        Self::new(start, start + duration)
    }

    /// Returns the duration of this window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if an instant falls within this window (`[start, end)`).
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }

    /// Extends the window by the given duration on both ends.
    ///
    /// The booking path uses this to widen the conflict check by one slot
    /// length on each side of the requested interval.
    pub fn extend(&self, duration: Duration) -> Self {
        Self {
            start: self.start - duration,
            end: self.end + duration,
        }
    }
}

/// Resolves a local wall-clock time in `tz` to a concrete instant.
///
/// Returns `None` when the local time does not exist (spring-forward gap).
/// Ambiguous times (fall-back overlap) resolve to the earlier offset.
pub fn resolve_local(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earlier, _later) => Some(earlier),
        LocalResult::None => None,
    }
}

/// Returns the first valid instant of `date` in `tz`.
///
/// Normally local midnight; if midnight falls in a DST gap (some zones
/// shift at 00:00), the hour after is used instead.
pub fn day_start(date: NaiveDate, tz: Tz) -> Option<DateTime<Tz>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    resolve_local(tz, midnight).or_else(|| resolve_local(tz, midnight + Duration::hours(1)))
}

/// Returns the UTC window covering the whole of `date` in `tz`.
///
/// This is the span handed to the free/busy query when listing slots for a
/// single day.
pub fn local_day_span(date: NaiveDate, tz: Tz) -> Option<TimeWindow> {
    let start = day_start(date, tz)?;
    let end = day_start(date.succ_opt()?, tz)?;
    Some(TimeWindow::new(
        start.with_timezone(&Utc),
        end.with_timezone(&Utc),
    ))
}

/// Returns today's date as seen from `tz` at the instant `now`.
pub fn local_today(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}
