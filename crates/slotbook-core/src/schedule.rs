//! Weekly template expansion.
//!
//! Turns recurring [`WeeklyAvailabilityRule`]s into concrete dates and
//! per-day windows for a target range. Expansion is a pure function of
//! (rules, zone, clock); nothing here is cached or persisted.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::rules::{weekday_index, WeeklyAvailabilityRule};
use crate::time::local_today;

/// The merged outer window of one date's matching rules.
///
/// The span runs from the earliest rule start to the latest rule end.
/// Gaps between non-contiguous rules are preserved by the slot generator,
/// which walks each rule independently; the outer span exists only to bound
/// the day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayWindow {
    /// Earliest local start among the matching rules.
    pub min_start: NaiveTime,
    /// Latest local end among the matching rules.
    pub max_end: NaiveTime,
    /// The rules whose weekday matches the date, in input order.
    pub rules: Vec<WeeklyAvailabilityRule>,
}

/// Returns the de-duplicated set of weekday indices (Sunday=0) covered by
/// `rules`. Empty iff `rules` is empty.
pub fn approved_weekdays(rules: &[WeeklyAvailabilityRule]) -> BTreeSet<u8> {
    rules.iter().map(WeeklyAvailabilityRule::weekday_index).collect()
}

/// Expands approved weekdays into concrete dates.
///
/// Iterates from today (as seen from `tz` at `now`) through
/// `today + days_ahead` inclusive, emitting each date whose weekday index is
/// in `approved`. Today itself is excluded when `allow_same_day` is false.
pub fn next_approved_dates(
    approved: &BTreeSet<u8>,
    tz: Tz,
    days_ahead: u32,
    allow_same_day: bool,
    now: DateTime<Utc>,
) -> Vec<NaiveDate> {
    let today = local_today(now, tz);
    let mut dates = Vec::new();
    let mut date = today;
    for offset in 0..=days_ahead {
        if offset > 0 || allow_same_day {
            let index = weekday_index(date.weekday());
            if approved.contains(&index) {
                dates.push(date);
            }
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    dates
}

/// Selects the rules matching `date`'s weekday and computes their outer
/// span. Returns `None` when no rule covers that weekday.
pub fn day_window(rules: &[WeeklyAvailabilityRule], date: NaiveDate) -> Option<DayWindow> {
    let matching: Vec<WeeklyAvailabilityRule> = rules
        .iter()
        .filter(|rule| rule.weekday == date.weekday())
        .copied()
        .collect();
    if matching.is_empty() {
        return None;
    }
    let min_start = matching.iter().map(|r| r.start).min()?;
    let max_end = matching.iter().map(|r| r.end).max()?;
    Some(DayWindow {
        min_start,
        max_end,
        rules: matching,
    })
}
