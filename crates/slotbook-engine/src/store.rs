//! Persistence traits and the appointment record.
//!
//! The engine owns the creation of appointments but not the storage
//! machinery; reads and writes go through [`ScheduleStore`] and
//! [`AppointmentStore`]. [`MemoryStore`] implements both for tests and
//! local runs.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use slotbook_core::{BookingSettings, WeeklyAvailabilityRule};
use slotbook_providers::{BoxFuture, CalendarConnection};

/// A storage failure.
#[derive(Debug, Error)]
#[error("storage error: {message}")]
pub struct StorageError {
    message: String,
}

impl StorageError {
    /// Creates a storage error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Appointment lifecycle status.
///
/// The engine only ever creates `Confirmed` appointments; `Cancelled`
/// exists for the reschedule/cancel flows that live outside this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Booked and confirmed against the external calendar.
    Confirmed,
    /// Cancelled by an external flow.
    Cancelled,
}

/// A persisted appointment.
///
/// Immutable once created, except through the external reschedule/cancel
/// flows. The external event id is stored as a first-class field (and
/// echoed into the notes) so reconciliation can index it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// Appointment identifier.
    pub id: Uuid,
    /// The agent this appointment belongs to.
    pub agent_id: String,
    /// Start instant.
    pub start_time: DateTime<Utc>,
    /// End instant.
    pub end_time: DateTime<Utc>,
    /// Lifecycle status.
    pub status: AppointmentStatus,
    /// Optional location.
    pub location: Option<String>,
    /// Free-text notes; includes the external event reference.
    pub notes: Option<String>,
    /// The id of the event created on the external calendar.
    pub external_event_id: String,
}

/// The record handed to [`AppointmentStore::persist_appointment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    /// The agent this appointment belongs to.
    pub agent_id: String,
    /// Start instant.
    pub start_time: DateTime<Utc>,
    /// End instant.
    pub end_time: DateTime<Utc>,
    /// Lifecycle status.
    pub status: AppointmentStatus,
    /// Optional location.
    pub location: Option<String>,
    /// Free-text notes; includes the external event reference.
    pub notes: Option<String>,
    /// The id of the event created on the external calendar.
    pub external_event_id: String,
}

/// Read access to an agent's booking configuration.
pub trait ScheduleStore: Send + Sync {
    /// Loads the agent's weekly availability rules.
    fn load_weekly_rules(
        &self,
        agent_id: &str,
    ) -> BoxFuture<'_, Result<Vec<WeeklyAvailabilityRule>, StorageError>>;

    /// Loads the agent's booking settings.
    fn load_booking_settings(
        &self,
        agent_id: &str,
    ) -> BoxFuture<'_, Result<BookingSettings, StorageError>>;

    /// Loads the agent's calendar connection, if one is configured.
    fn load_calendar_connection(
        &self,
        agent_id: &str,
    ) -> BoxFuture<'_, Result<Option<CalendarConnection>, StorageError>>;
}

/// Write access for confirmed appointments.
pub trait AppointmentStore: Send + Sync {
    /// Persists one appointment and returns the stored record.
    fn persist_appointment(
        &self,
        record: NewAppointment,
    ) -> BoxFuture<'_, Result<Appointment, StorageError>>;
}

/// Configuration for one agent in a [`MemoryStore`].
#[derive(Debug, Clone)]
struct AgentRecord {
    rules: Vec<WeeklyAvailabilityRule>,
    settings: BookingSettings,
    connection: Option<CalendarConnection>,
}

/// In-memory store for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    agents: Mutex<HashMap<String, AgentRecord>>,
    appointments: Mutex<Vec<Appointment>>,
    fail_persist: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an agent with rules, settings, and an optional connection.
    pub fn add_agent(
        &self,
        agent_id: impl Into<String>,
        rules: Vec<WeeklyAvailabilityRule>,
        settings: BookingSettings,
        connection: Option<CalendarConnection>,
    ) {
        self.agents.lock().expect("lock poisoned").insert(
            agent_id.into(),
            AgentRecord {
                rules,
                settings,
                connection,
            },
        );
    }

    /// Makes every subsequent persist fail with the given message.
    pub fn fail_persists(&self, message: impl Into<String>) {
        *self.fail_persist.lock().expect("lock poisoned") = Some(message.into());
    }

    /// Returns a copy of the persisted appointments.
    pub fn appointments(&self) -> Vec<Appointment> {
        self.appointments.lock().expect("lock poisoned").clone()
    }

    fn agent(&self, agent_id: &str) -> Result<AgentRecord, StorageError> {
        self.agents
            .lock()
            .expect("lock poisoned")
            .get(agent_id)
            .cloned()
            .ok_or_else(|| StorageError::new(format!("unknown agent: {agent_id}")))
    }
}

impl ScheduleStore for MemoryStore {
    fn load_weekly_rules(
        &self,
        agent_id: &str,
    ) -> BoxFuture<'_, Result<Vec<WeeklyAvailabilityRule>, StorageError>> {
        let result = self.agent(agent_id).map(|a| a.rules);
        Box::pin(async move { result })
    }

    fn load_booking_settings(
        &self,
        agent_id: &str,
    ) -> BoxFuture<'_, Result<BookingSettings, StorageError>> {
        let result = self.agent(agent_id).map(|a| a.settings);
        Box::pin(async move { result })
    }

    fn load_calendar_connection(
        &self,
        agent_id: &str,
    ) -> BoxFuture<'_, Result<Option<CalendarConnection>, StorageError>> {
        let result = self.agent(agent_id).map(|a| a.connection);
        Box::pin(async move { result })
    }
}

impl AppointmentStore for MemoryStore {
    fn persist_appointment(
        &self,
        record: NewAppointment,
    ) -> BoxFuture<'_, Result<Appointment, StorageError>> {
        let result = {
            if let Some(message) = self.fail_persist.lock().expect("lock poisoned").as_ref() {
                Err(StorageError::new(message.clone()))
            } else {
                let appointment = Appointment {
                    id: Uuid::new_v4(),
                    agent_id: record.agent_id,
                    start_time: record.start_time,
                    end_time: record.end_time,
                    status: record.status,
                    location: record.location,
                    notes: record.notes,
                    external_event_id: record.external_event_id,
                };
                self.appointments
                    .lock()
                    .expect("lock poisoned")
                    .push(appointment.clone());
                Ok(appointment)
            }
        };
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Weekday};
    use chrono_tz::UTC;

    fn sample_rules() -> Vec<WeeklyAvailabilityRule> {
        vec![WeeklyAvailabilityRule::new(
            Weekday::Mon,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        )
        .unwrap()]
    }

    fn sample_record() -> NewAppointment {
        NewAppointment {
            agent_id: "agent-1".into(),
            start_time: Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 6, 2, 10, 30, 0).unwrap(),
            status: AppointmentStatus::Confirmed,
            location: None,
            notes: Some("external event: evt-1".into()),
            external_event_id: "evt-1".into(),
        }
    }

    #[tokio::test]
    async fn unknown_agent_is_a_storage_error() {
        let store = MemoryStore::new();
        assert!(store.load_weekly_rules("ghost").await.is_err());
    }

    #[tokio::test]
    async fn registered_agent_roundtrip() {
        let store = MemoryStore::new();
        store.add_agent(
            "agent-1",
            sample_rules(),
            BookingSettings::new(UTC, true),
            None,
        );
        let rules = store.load_weekly_rules("agent-1").await.unwrap();
        assert_eq!(rules.len(), 1);
        let settings = store.load_booking_settings("agent-1").await.unwrap();
        assert!(settings.allow_same_day_booking);
        assert!(store
            .load_calendar_connection("agent-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn persist_assigns_id_and_records() {
        let store = MemoryStore::new();
        let stored = store.persist_appointment(sample_record()).await.unwrap();
        assert_eq!(stored.status, AppointmentStatus::Confirmed);
        assert_eq!(stored.external_event_id, "evt-1");
        assert_eq!(store.appointments().len(), 1);
    }

    #[tokio::test]
    async fn injected_persist_failure() {
        let store = MemoryStore::new();
        store.fail_persists("disk full");
        assert!(store.persist_appointment(sample_record()).await.is_err());
        assert!(store.appointments().is_empty());
    }

    #[test]
    fn appointment_serde_roundtrip() {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            agent_id: "agent-1".into(),
            start_time: Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 6, 2, 10, 30, 0).unwrap(),
            status: AppointmentStatus::Confirmed,
            location: Some("Video call".into()),
            notes: None,
            external_event_id: "evt-9".into(),
        };
        let json = serde_json::to_string(&appointment).unwrap();
        let parsed: Appointment = serde_json::from_str(&json).unwrap();
        assert_eq!(appointment, parsed);
    }
}
