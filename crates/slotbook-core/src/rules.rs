//! Weekly availability rules and per-agent booking settings.
//!
//! A [`WeeklyAvailabilityRule`] is a recurring (weekday, start, end) triple
//! describing when an agent is bookable. Rules are owned by agent
//! configuration; this crate only reads them. [`BookingSettings`] supplies
//! the IANA zone all local-time arithmetic is anchored to.

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from constructing rules or settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    /// A rule's start time is not strictly before its end time.
    #[error("rule window is empty or inverted: {start} to {end}")]
    EmptyWindow { start: NaiveTime, end: NaiveTime },

    /// The timezone string is not a known IANA zone identifier.
    #[error("unknown IANA timezone: {0}")]
    UnknownTimezone(String),
}

/// A recurring weekly availability window.
///
/// Many rules may share a weekday (multiple windows per day). The invariant
/// `start < end` is enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWeeklyAvailabilityRule")]
pub struct WeeklyAvailabilityRule {
    /// The day of week this window recurs on.
    pub weekday: Weekday,
    /// Local wall-clock start of the window.
    pub start: NaiveTime,
    /// Local wall-clock end of the window (exclusive).
    pub end: NaiveTime,
}

impl WeeklyAvailabilityRule {
    /// Creates a rule, rejecting empty or inverted windows.
    pub fn new(weekday: Weekday, start: NaiveTime, end: NaiveTime) -> Result<Self, RuleError> {
        if start >= end {
            return Err(RuleError::EmptyWindow { start, end });
        }
        Ok(Self {
            weekday,
            start,
            end,
        })
    }

    /// Returns this rule's weekday index (Sunday=0 through Saturday=6).
    pub fn weekday_index(&self) -> u8 {
        weekday_index(self.weekday)
    }
}

// Deserialization goes through `new` so stored rules cannot smuggle in an
// inverted window.
#[derive(Deserialize)]
struct RawWeeklyAvailabilityRule {
    weekday: Weekday,
    start: NaiveTime,
    end: NaiveTime,
}

impl TryFrom<RawWeeklyAvailabilityRule> for WeeklyAvailabilityRule {
    type Error = RuleError;

    fn try_from(raw: RawWeeklyAvailabilityRule) -> Result<Self, Self::Error> {
        Self::new(raw.weekday, raw.start, raw.end)
    }
}

/// Maps a weekday to the Sunday=0..Saturday=6 index used throughout.
pub fn weekday_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

/// Per-agent booking policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSettings {
    /// The agent's IANA timezone; the reference zone for all local-time
    /// arithmetic unless a caller supplies an override.
    pub timezone: Tz,
    /// Whether slots on the current local date may be booked.
    pub allow_same_day_booking: bool,
}

impl BookingSettings {
    /// Creates settings with the given zone.
    pub fn new(timezone: Tz, allow_same_day_booking: bool) -> Self {
        Self {
            timezone,
            allow_same_day_booking,
        }
    }

    /// Parses settings from an IANA zone string.
    pub fn from_zone_name(zone: &str, allow_same_day_booking: bool) -> Result<Self, RuleError> {
        let timezone = parse_zone(zone)?;
        Ok(Self::new(timezone, allow_same_day_booking))
    }
}

/// Parses an IANA zone identifier.
pub fn parse_zone(zone: &str) -> Result<Tz, RuleError> {
    zone.parse::<Tz>()
        .map_err(|_| RuleError::UnknownTimezone(zone.to_string()))
}
