//! Response values exposed to the request-handling layer.
//!
//! These are plain serde values: dates as ISO-8601 strings, local times as
//! RFC3339 with the booking zone's offset, so clients never re-derive local
//! time from UTC with an implicit zone.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use slotbook_core::CandidateSlot;

use crate::store::AppointmentStatus;

/// Answer to "which days could possibly work".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableDates {
    /// The effective IANA zone used for the computation.
    pub timezone: String,
    /// Approved dates in ascending order.
    pub dates: Vec<NaiveDate>,
}

/// One free slot, carrying both UTC and zone-local representations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    /// Slot start in UTC.
    pub start_utc: DateTime<Utc>,
    /// Slot end in UTC.
    pub end_utc: DateTime<Utc>,
    /// Slot start in the effective zone, RFC3339 with offset.
    pub local_start: String,
    /// Slot end in the effective zone, RFC3339 with offset.
    pub local_end: String,
}

impl From<&CandidateSlot> for SlotView {
    fn from(slot: &CandidateSlot) -> Self {
        Self {
            start_utc: slot.start_utc,
            end_utc: slot.end_utc,
            local_start: slot.local_start.to_rfc3339(),
            local_end: slot.local_end.to_rfc3339(),
        }
    }
}

/// Answer to "which slots are open on date D".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlots {
    /// The effective IANA zone used for the computation.
    pub timezone: String,
    /// The queried date.
    pub date: NaiveDate,
    /// Free slots in ascending order; empty when the day is out of policy
    /// or fully booked.
    pub slots: Vec<SlotView>,
}

/// Result of a successful booking attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    /// The persisted appointment's id.
    pub appointment_id: Uuid,
    /// The id of the event created on the external calendar.
    pub external_event_id: String,
    /// Always `Confirmed` on success.
    pub status: AppointmentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Weekday};
    use chrono_tz::America::New_York;
    use slotbook_core::{generate_candidate_slots, WeeklyAvailabilityRule};

    #[test]
    fn slot_view_keeps_local_offset() {
        let rules = vec![WeeklyAvailabilityRule::new(
            Weekday::Mon,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        )
        .unwrap()];
        let day = chrono::NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let slots = generate_candidate_slots(&rules, day, day, 30, New_York);
        let view = SlotView::from(&slots[0]);
        assert_eq!(
            view.start_utc,
            Utc.with_ymd_and_hms(2025, 6, 2, 13, 0, 0).unwrap()
        );
        assert!(view.local_start.starts_with("2025-06-02T09:00:00"));
        assert!(view.local_start.ends_with("-04:00"));
    }

    #[test]
    fn responses_serialize_to_plain_values() {
        let dates = AvailableDates {
            timezone: "UTC".into(),
            dates: vec![chrono::NaiveDate::from_ymd_opt(2025, 6, 9).unwrap()],
        };
        let json = serde_json::to_value(&dates).unwrap();
        assert_eq!(json["dates"][0], "2025-06-09");

        let confirmation = BookingConfirmation {
            appointment_id: Uuid::nil(),
            external_event_id: "evt-1".into(),
            status: AppointmentStatus::Confirmed,
        };
        let json = serde_json::to_value(&confirmation).unwrap();
        assert_eq!(json["status"], "confirmed");
    }
}
