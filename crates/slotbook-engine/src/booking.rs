//! The booking transactor.
//!
//! One booking attempt runs a fixed pipeline:
//!
//! 1. validate the requested times (no side effects)
//! 2. re-fetch busy intervals over a padded window and check for conflicts
//!    against the live calendar (mandatory even when the caller just saw
//!    the slot listed as free)
//! 3. create the external calendar event (not idempotent, never retried)
//! 4. persist the appointment, carrying the external event id
//!
//! Steps are awaited strictly in order; the busy-check-then-create ordering
//! is the sole double-booking defense. The engine takes no lock of its own:
//! the external provider serializes concurrent inserts per calendar, and
//! the remaining race window between steps 2 and 3 is a documented
//! limitation. Every failure after step 3 preserves the external event id
//! for out-of-band reconciliation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use slotbook_core::{overlaps, TimeWindow};
use slotbook_providers::{CalendarAccess, CredentialSource, EventDraft};

use crate::availability::connect_calendar;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::response::BookingConfirmation;
use crate::store::{AppointmentStatus, AppointmentStore, NewAppointment, ScheduleStore};

/// One structured intake answer, echoed into the event description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeAnswer {
    /// The question label.
    pub question: String,
    /// The visitor's answer.
    pub answer: String,
}

/// A booking attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// The agent to book with.
    pub agent_id: String,
    /// Requested start, RFC3339.
    pub start: String,
    /// Requested end, RFC3339.
    pub end: String,
    /// Optional attendee to invite to the calendar event.
    pub attendee_email: Option<String>,
    /// Caller-supplied notes.
    pub notes: Option<String>,
    /// Structured intake answers.
    pub intake_answers: Vec<IntakeAnswer>,
}

impl BookingRequest {
    /// Creates a request for the given agent and times.
    pub fn new(
        agent_id: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            start: start.into(),
            end: end.into(),
            attendee_email: None,
            notes: None,
            intake_answers: Vec::new(),
        }
    }

    /// Builder: set the attendee.
    pub fn with_attendee(mut self, email: impl Into<String>) -> Self {
        self.attendee_email = Some(email.into());
        self
    }

    /// Builder: set the notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Builder: add an intake answer.
    pub fn with_intake_answer(
        mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        self.intake_answers.push(IntakeAnswer {
            question: question.into(),
            answer: answer.into(),
        });
        self
    }
}

/// Performs conflict-checked, timezone-correct appointment creation.
#[derive(Debug)]
pub struct BookingTransactor<S, P, C, A> {
    schedule: Arc<S>,
    appointments: Arc<P>,
    credentials: Arc<C>,
    calendar: Arc<A>,
    config: EngineConfig,
}

impl<S, P, C, A> BookingTransactor<S, P, C, A>
where
    S: ScheduleStore,
    P: AppointmentStore,
    C: CredentialSource,
    A: CalendarAccess,
{
    /// Creates a transactor over the given stores and calendar capability.
    pub fn new(
        schedule: Arc<S>,
        appointments: Arc<P>,
        credentials: Arc<C>,
        calendar: Arc<A>,
        config: EngineConfig,
    ) -> Self {
        Self {
            schedule,
            appointments,
            credentials,
            calendar,
            config,
        }
    }

    /// Runs one booking attempt end to end.
    ///
    /// On success exactly one appointment exists and references the created
    /// external event. On failure before the external create, nothing was
    /// mutated anywhere. A `persistence_error_after_external_create` means
    /// the external event exists with no local record; its id is in the
    /// error and the log.
    pub async fn book(&self, request: BookingRequest) -> EngineResult<BookingConfirmation> {
        // Step 1: validation, side-effect free.
        let (start, end) = parse_time_range(&request.start, &request.end)?;
        debug!(agent_id = %request.agent_id, %start, %end, "booking attempt validated");

        let (connection, credential) =
            connect_calendar(self.schedule.as_ref(), self.credentials.as_ref(), &request.agent_id)
                .await?;

        // Step 2: mandatory re-check against the live calendar. The fetch
        // window is padded by one slot length each side so adjacent events
        // are visible; the conflict test itself is the strict-overlap rule
        // on the requested interval.
        let padding = Duration::minutes(i64::from(self.config.slot_minutes));
        let check_window = TimeWindow::new(start, end).extend(padding);
        let busy = self
            .calendar
            .query_busy(&credential, &connection.calendar_id, &check_window)
            .await
            .map_err(EngineError::AvailabilityUnknown)?;
        if busy.iter().any(|b| overlaps(start, end, b)) {
            info!(agent_id = %request.agent_id, %start, "slot taken at re-check");
            return Err(EngineError::SlotNotAvailable);
        }

        // Step 3: external create. Terminal on failure; the insert is not
        // idempotent, so no retry.
        let draft = self.compose_draft(&request, start, end);
        let external_event_id = self
            .calendar
            .insert_event(&credential, &connection.calendar_id, &draft)
            .await
            .map_err(|e| {
                error!(agent_id = %request.agent_id, "external event creation failed: {e}");
                EngineError::EventCreationFailed(e)
            })?;

        // Step 4: persist, carrying the external id both as a field and in
        // the notes for reconciliation.
        let record = NewAppointment {
            agent_id: request.agent_id.clone(),
            start_time: start,
            end_time: end,
            status: AppointmentStatus::Confirmed,
            location: None,
            notes: Some(compose_notes(request.notes.as_deref(), &external_event_id)),
            external_event_id: external_event_id.clone(),
        };
        let appointment = match self.appointments.persist_appointment(record).await {
            Ok(appointment) => appointment,
            Err(source) => {
                error!(
                    agent_id = %request.agent_id,
                    external_event_id,
                    "appointment persistence failed after external create: {source}"
                );
                return Err(EngineError::PersistenceFailedAfterCreate {
                    external_event_id,
                    source,
                });
            }
        };

        info!(
            agent_id = %request.agent_id,
            appointment_id = %appointment.id,
            external_event_id,
            "booking confirmed"
        );
        Ok(BookingConfirmation {
            appointment_id: appointment.id,
            external_event_id,
            status: AppointmentStatus::Confirmed,
        })
    }

    fn compose_draft(
        &self,
        request: &BookingRequest,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EventDraft {
        let mut lines = Vec::new();
        if let Some(notes) = request.notes.as_deref() {
            if !notes.is_empty() {
                lines.push(notes.to_string());
            }
        }
        for answer in &request.intake_answers {
            lines.push(format!("{}: {}", answer.question, answer.answer));
        }
        let mut draft = EventDraft::new(self.config.event_summary.clone(), start, end)
            .with_description(lines.join("\n"));
        if let Some(email) = &request.attendee_email {
            draft = draft.with_attendee(email.clone());
        }
        draft
    }
}

/// Parses and validates the requested interval.
fn parse_time_range(start: &str, end: &str) -> EngineResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = DateTime::parse_from_rfc3339(start)
        .map_err(|_| EngineError::invalid_time_range(format!("unparsable start time: {start}")))?
        .with_timezone(&Utc);
    let end = DateTime::parse_from_rfc3339(end)
        .map_err(|_| EngineError::invalid_time_range(format!("unparsable end time: {end}")))?
        .with_timezone(&Utc);
    if end <= start {
        return Err(EngineError::invalid_time_range(
            "end must be after start",
        ));
    }
    Ok((start, end))
}

/// Appends the external event reference to the caller's notes.
fn compose_notes(notes: Option<&str>, external_event_id: &str) -> String {
    match notes {
        Some(notes) if !notes.is_empty() => {
            format!("{notes}\nExternal event: {external_event_id}")
        }
        _ => format!("External event: {external_event_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::UTC;
    use slotbook_core::{BookingSettings, BusyInterval};
    use slotbook_providers::{
        CalendarConnection, Credential, ProviderErrorCode, StaticCalendarAccess,
        StaticCredentialSource,
    };

    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        calendar: Arc<StaticCalendarAccess>,
        transactor: BookingTransactor<
            MemoryStore,
            MemoryStore,
            StaticCredentialSource,
            StaticCalendarAccess,
        >,
    }

    fn fixture(calendar: StaticCalendarAccess) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        store.add_agent(
            "agent-1",
            Vec::new(),
            BookingSettings::new(UTC, true),
            Some(CalendarConnection {
                id: "conn-1".into(),
                provider: "static".into(),
                calendar_id: "primary".into(),
                is_primary: true,
            }),
        );
        let calendar = Arc::new(calendar);
        let transactor = BookingTransactor::new(
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::new(StaticCredentialSource::new(Credential::new("token"))),
            Arc::clone(&calendar),
            EngineConfig::default(),
        );
        Fixture {
            store,
            calendar,
            transactor,
        }
    }

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 9, h, m, 0).unwrap()
    }

    fn request() -> BookingRequest {
        BookingRequest::new("agent-1", "2025-06-09T10:00:00Z", "2025-06-09T10:30:00Z")
    }

    #[tokio::test]
    async fn successful_booking_confirms_and_persists() {
        let f = fixture(StaticCalendarAccess::new());
        let confirmation = f.transactor.book(request().with_notes("First visit")).await.unwrap();
        assert_eq!(confirmation.status, AppointmentStatus::Confirmed);
        assert_eq!(confirmation.external_event_id, "evt-1");

        let stored = f.store.appointments();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, confirmation.appointment_id);
        assert_eq!(stored[0].external_event_id, "evt-1");
        // The notes carry the external reference for reconciliation.
        assert!(stored[0].notes.as_deref().unwrap().contains("evt-1"));
        assert!(stored[0].notes.as_deref().unwrap().contains("First visit"));
    }

    #[tokio::test]
    async fn recheck_window_is_padded_by_one_slot() {
        let f = fixture(StaticCalendarAccess::new());
        f.transactor.book(request()).await.unwrap();
        let windows = f.calendar.queried_windows();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, utc(9, 30));
        assert_eq!(windows[0].end, utc(11, 0));
    }

    #[tokio::test]
    async fn scenario_d_invalid_range_makes_no_external_calls() {
        let f = fixture(StaticCalendarAccess::new());
        let err = f
            .transactor
            .book(BookingRequest::new(
                "agent-1",
                "2025-06-09T10:30:00Z",
                "2025-06-09T10:00:00Z",
            ))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_time_range");
        assert_eq!(f.calendar.query_calls(), 0);
        assert_eq!(f.calendar.insert_calls(), 0);
        assert!(f.store.appointments().is_empty());
    }

    #[tokio::test]
    async fn zero_length_range_rejected() {
        let f = fixture(StaticCalendarAccess::new());
        let err = f
            .transactor
            .book(BookingRequest::new(
                "agent-1",
                "2025-06-09T10:00:00Z",
                "2025-06-09T10:00:00Z",
            ))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_time_range");
    }

    #[tokio::test]
    async fn unparsable_time_rejected_before_any_call() {
        let f = fixture(StaticCalendarAccess::new());
        let err = f
            .transactor
            .book(BookingRequest::new("agent-1", "not a time", "also not"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_time_range");
        assert_eq!(f.calendar.query_calls(), 0);
    }

    #[tokio::test]
    async fn scenario_e_fresh_conflict_at_recheck_rejects() {
        // The caller saw the slot free, but a conflicting event landed
        // before the booking attempt.
        let f = fixture(StaticCalendarAccess::with_busy(vec![
            BusyInterval::new(utc(10, 0), utc(10, 30)).unwrap(),
        ]));
        let err = f.transactor.book(request()).await.unwrap_err();
        assert_eq!(err.code(), "slot_not_available");
        assert_eq!(f.calendar.insert_calls(), 0);
        assert!(f.store.appointments().is_empty());
    }

    #[tokio::test]
    async fn adjacent_events_do_not_conflict() {
        // Busy blocks touching both ends of the requested slot.
        let f = fixture(StaticCalendarAccess::with_busy(vec![
            BusyInterval::new(utc(9, 30), utc(10, 0)).unwrap(),
            BusyInterval::new(utc(10, 30), utc(11, 0)).unwrap(),
        ]));
        assert!(f.transactor.book(request()).await.is_ok());
    }

    #[tokio::test]
    async fn busy_query_failure_aborts_before_create() {
        let calendar = StaticCalendarAccess::new();
        calendar.fail_queries(ProviderErrorCode::ProviderUnreachable, "down");
        let f = fixture(calendar);
        let err = f.transactor.book(request()).await.unwrap_err();
        assert_eq!(err.code(), "availability_unknown");
        assert_eq!(f.calendar.insert_calls(), 0);
    }

    #[tokio::test]
    async fn event_creation_failure_is_terminal() {
        let calendar = StaticCalendarAccess::new();
        calendar.fail_inserts(ProviderErrorCode::ServerError, "500");
        let f = fixture(calendar);
        let err = f.transactor.book(request()).await.unwrap_err();
        assert_eq!(err.code(), "external_event_creation_error");
        assert!(f.store.appointments().is_empty());
        // One attempt only: the insert is not retried.
        assert_eq!(f.calendar.insert_calls(), 1);
    }

    #[tokio::test]
    async fn persistence_failure_preserves_external_id() {
        let f = fixture(StaticCalendarAccess::new());
        f.store.fail_persists("disk full");
        let err = f.transactor.book(request()).await.unwrap_err();
        assert_eq!(err.code(), "persistence_error_after_external_create");
        match err {
            EngineError::PersistenceFailedAfterCreate {
                external_event_id, ..
            } => assert_eq!(external_event_id, "evt-1"),
            other => panic!("unexpected error: {other:?}"),
        }
        // The external event exists; reconciliation needs its id.
        assert_eq!(f.calendar.inserted_events().len(), 1);
    }

    #[tokio::test]
    async fn draft_composes_notes_intake_and_attendee() {
        let f = fixture(StaticCalendarAccess::new());
        f.transactor
            .book(
                request()
                    .with_notes("Prefers video")
                    .with_intake_answer("Reason", "Annual review")
                    .with_attendee("visitor@example.com"),
            )
            .await
            .unwrap();
        let drafts = f.calendar.inserted_events();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].summary, "Booked appointment");
        assert_eq!(drafts[0].description, "Prefers video\nReason: Annual review");
        assert_eq!(drafts[0].attendee_email.as_deref(), Some("visitor@example.com"));
        assert_eq!(drafts[0].start_utc, utc(10, 0));
        assert_eq!(drafts[0].end_utc, utc(10, 30));
    }

    #[tokio::test]
    async fn offset_times_normalize_to_utc() {
        let f = fixture(StaticCalendarAccess::new());
        // 06:00 -04:00 == 10:00Z.
        f.transactor
            .book(BookingRequest::new(
                "agent-1",
                "2025-06-09T06:00:00-04:00",
                "2025-06-09T06:30:00-04:00",
            ))
            .await
            .unwrap();
        let drafts = f.calendar.inserted_events();
        assert_eq!(drafts[0].start_utc, utc(10, 0));
    }

    #[tokio::test]
    async fn missing_credential_rejects_before_any_calendar_call() {
        let store = Arc::new(MemoryStore::new());
        store.add_agent(
            "agent-1",
            Vec::new(),
            BookingSettings::new(UTC, true),
            Some(CalendarConnection {
                id: "conn-1".into(),
                provider: "static".into(),
                calendar_id: "primary".into(),
                is_primary: true,
            }),
        );
        let calendar = Arc::new(StaticCalendarAccess::new());
        let transactor = BookingTransactor::new(
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::new(StaticCredentialSource::unavailable()),
            Arc::clone(&calendar),
            EngineConfig::default(),
        );
        let err = transactor.book(request()).await.unwrap_err();
        assert_eq!(err.code(), "credential_unavailable");
        assert_eq!(calendar.query_calls(), 0);
    }
}
