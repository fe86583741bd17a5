//! Candidate slot generation.
//!
//! Chops each rule window into fixed-length candidate slots. Candidates are
//! transient: they are generated fresh on every query and never cached,
//! because external busy data changes between requests.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::rules::WeeklyAvailabilityRule;
use crate::time::resolve_local;

/// A proposed bookable window, before checking external busy data.
///
/// Carries both the UTC instant pair and the zone-local pair; local times
/// are never re-derived downstream, since the booking zone and a caller's
/// display zone can differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSlot {
    /// Slot start in UTC.
    pub start_utc: DateTime<Utc>,
    /// Slot end in UTC.
    pub end_utc: DateTime<Utc>,
    /// Slot start in the booking zone.
    pub local_start: DateTime<Tz>,
    /// Slot end in the booking zone.
    pub local_end: DateTime<Tz>,
}

impl CandidateSlot {
    /// Returns the slot duration.
    pub fn duration(&self) -> Duration {
        self.end_utc - self.start_utc
    }
}

/// Generates candidate slots for every date in `[from_date, to_date]`.
///
/// For each date and each rule matching that date's weekday, a cursor walks
/// from the rule's start, emitting one slot per `slot_minutes` while a full
/// slot still fits before the rule's end. Slots within one rule window are
/// contiguous and non-overlapping; a day with several rule windows yields
/// one independent sequence per window, so gaps between windows stay empty.
///
/// Output is ordered by UTC start ascending. A window shorter than
/// `slot_minutes` yields nothing. Local times that fall in a DST gap are
/// skipped for that date, as is any slot straddling a transition: its real
/// UTC span would not equal `slot_minutes`.
pub fn generate_candidate_slots(
    rules: &[WeeklyAvailabilityRule],
    from_date: NaiveDate,
    to_date: NaiveDate,
    slot_minutes: u32,
    tz: Tz,
) -> Vec<CandidateSlot> {
    if slot_minutes == 0 {
        return Vec::new();
    }
    let slot = Duration::minutes(i64::from(slot_minutes));
    let mut candidates = Vec::new();

    let mut date = from_date;
    while date <= to_date {
        for rule in rules.iter().filter(|r| r.weekday == date.weekday()) {
            let window_end = date.and_time(rule.end);
            let mut cursor = date.and_time(rule.start);
            while cursor + slot <= window_end {
                let slot_end = cursor + slot;
                if let (Some(local_start), Some(local_end)) =
                    (resolve_local(tz, cursor), resolve_local(tz, slot_end))
                {
                    let start_utc = local_start.with_timezone(&Utc);
                    let end_utc = local_end.with_timezone(&Utc);
                    // Endpoints on opposite sides of a fall-back fold give a
                    // longer real span than the nominal slot. Drop the slot
                    // like a gap slot.
                    if end_utc - start_utc == slot {
                        candidates.push(CandidateSlot {
                            start_utc,
                            end_utc,
                            local_start,
                            local_end,
                        });
                    }
                }
                cursor = slot_end;
            }
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    candidates.sort_by_key(|c| c.start_utc);
    candidates
}
