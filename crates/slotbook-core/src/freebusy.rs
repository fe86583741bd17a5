//! Busy-interval filtering.
//!
//! [`BusyInterval`]s are externally reported occupied periods, fetched per
//! query and never persisted here. [`filter_free`] drops every candidate
//! slot that strictly overlaps one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::slots::CandidateSlot;

/// Error from constructing a busy interval.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("busy interval is empty or inverted: {start} to {end}")]
pub struct InvalidBusyInterval {
    /// Reported start.
    pub start: DateTime<Utc>,
    /// Reported end.
    pub end: DateTime<Utc>,
}

/// One externally reported occupied period. Invariant: `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBusyInterval")]
pub struct BusyInterval {
    /// Start of the occupied period.
    pub start: DateTime<Utc>,
    /// End of the occupied period (exclusive).
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    /// Creates a busy interval, rejecting empty or inverted periods.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidBusyInterval> {
        if start >= end {
            return Err(InvalidBusyInterval { start, end });
        }
        Ok(Self { start, end })
    }
}

// Deserialization goes through `new` so wire data cannot smuggle in an
// inverted interval.
#[derive(Deserialize)]
struct RawBusyInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawBusyInterval> for BusyInterval {
    type Error = InvalidBusyInterval;

    fn try_from(raw: RawBusyInterval) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

/// Strict interval intersection.
///
/// `true` iff `[a_start, a_end)` and the busy interval share any instant.
/// Touching boundaries (a slot ending exactly when a busy period starts, or
/// vice versa) do NOT overlap, so back-to-back bookings are allowed.
pub fn overlaps(a_start: DateTime<Utc>, a_end: DateTime<Utc>, busy: &BusyInterval) -> bool {
    a_start < busy.end && busy.start < a_end
}

/// Retains the candidates that overlap no busy interval.
///
/// Pure and deterministic; O(candidates x busy) is fine at the scale of tens
/// of daily slots against tens of busy intervals.
pub fn filter_free(candidates: Vec<CandidateSlot>, busy: &[BusyInterval]) -> Vec<CandidateSlot> {
    candidates
        .into_iter()
        .filter(|slot| !busy.iter().any(|b| overlaps(slot.start_utc, slot.end_utc, b)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::WeeklyAvailabilityRule;
    use crate::slots::generate_candidate_slots;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Weekday};
    use chrono_tz::UTC;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    fn busy(start: (u32, u32), end: (u32, u32)) -> BusyInterval {
        BusyInterval::new(utc(start.0, start.1), utc(end.0, end.1)).unwrap()
    }

    fn monday_slots(slot_minutes: u32) -> Vec<CandidateSlot> {
        let rules = vec![WeeklyAvailabilityRule::new(
            Weekday::Mon,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        )
        .unwrap()];
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        generate_candidate_slots(&rules, day, day, slot_minutes, UTC)
    }

    #[test]
    fn invalid_interval_rejected() {
        assert!(BusyInterval::new(utc(10, 0), utc(10, 0)).is_err());
        assert!(BusyInterval::new(utc(11, 0), utc(10, 0)).is_err());
    }

    #[test]
    fn no_busy_keeps_everything() {
        let slots = monday_slots(30);
        assert_eq!(filter_free(slots.clone(), &[]).len(), slots.len());
    }

    #[test]
    fn busy_interval_removes_exactly_the_covered_slot() {
        let slots = monday_slots(30);
        let free = filter_free(slots, &[busy((10, 0), (10, 30))]);
        assert_eq!(free.len(), 5);
        assert!(free.iter().all(|s| s.start_utc != utc(10, 0)));
    }

    #[test]
    fn boundary_touch_is_not_overlap() {
        // Busy 10:00-10:30: the 09:30-10:00 slot touches its start and the
        // 10:30-11:00 slot touches its end; both stay.
        let slots = monday_slots(30);
        let free = filter_free(slots, &[busy((10, 0), (10, 30))]);
        assert!(free.iter().any(|s| s.start_utc == utc(9, 30)));
        assert!(free.iter().any(|s| s.start_utc == utc(10, 30)));
    }

    #[test]
    fn partial_overlap_removes_slot() {
        // Busy 10:15-10:20 sits inside the 10:00-10:30 slot.
        let slots = monday_slots(30);
        let free = filter_free(slots, &[busy((10, 15), (10, 20))]);
        assert_eq!(free.len(), 5);
        assert!(free.iter().all(|s| s.start_utc != utc(10, 0)));
    }

    #[test]
    fn busy_spanning_whole_day_removes_everything() {
        let slots = monday_slots(30);
        assert!(filter_free(slots, &[busy((0, 0), (23, 59))]).is_empty());
    }

    #[test]
    fn multiple_busy_intervals_accumulate() {
        let slots = monday_slots(30);
        let free = filter_free(slots, &[busy((9, 0), (9, 30)), busy((11, 30), (12, 0))]);
        let starts: Vec<_> = free.iter().map(|s| s.start_utc).collect();
        assert_eq!(
            starts,
            vec![utc(9, 30), utc(10, 0), utc(10, 30), utc(11, 0)]
        );
    }

    #[test]
    fn overlap_predicate_is_strict() {
        let b = busy((10, 0), (11, 0));
        assert!(!overlaps(utc(9, 0), utc(10, 0), &b));
        assert!(!overlaps(utc(11, 0), utc(12, 0), &b));
        assert!(overlaps(utc(9, 0), utc(10, 1), &b));
        assert!(overlaps(utc(10, 59), utc(12, 0), &b));
        assert!(overlaps(utc(10, 15), utc(10, 45), &b));
        assert!(overlaps(utc(9, 0), utc(12, 0), &b));
    }

    #[test]
    fn busy_serde_roundtrip() {
        let b = busy((10, 0), (11, 0));
        let json = serde_json::to_string(&b).unwrap();
        let parsed: BusyInterval = serde_json::from_str(&json).unwrap();
        assert_eq!(b, parsed);
    }

    #[test]
    fn inverted_interval_rejected_on_deserialize() {
        let json = r#"{"start":"2025-06-02T11:00:00Z","end":"2025-06-02T10:00:00Z"}"#;
        assert!(serde_json::from_str::<BusyInterval>(json).is_err());
    }
}
