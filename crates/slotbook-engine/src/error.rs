//! Engine error types.
//!
//! The taxonomy separates four kinds of failure:
//!
//! - client/input errors: reported immediately, never retried, no side
//!   effects (`invalid_time_range`, `invalid_date`, `invalid_timezone`)
//! - policy rejections: `slot_not_available` on the booking path (the
//!   listing path answers with an empty result instead)
//! - upstream unavailability: `availability_unknown` and
//!   `credential_unavailable`, kept distinct from "no slots free" so an
//!   unreachable provider can never read as a free calendar
//! - partial failure after external mutation:
//!   `persistence_error_after_external_create` carries the external event id
//!   so the dangling event can be reconciled out of band

use thiserror::Error;

use slotbook_providers::ProviderError;

use crate::store::StorageError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from availability queries and booking attempts.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested start/end pair is unparsable or inverted.
    #[error("invalid time range: {reason}")]
    InvalidTimeRange { reason: String },

    /// The requested date is not a valid ISO date.
    #[error("invalid date: {input}")]
    InvalidDate { input: String },

    /// The timezone override is not a known IANA zone.
    #[error("invalid timezone: {input}")]
    InvalidTimezone { input: String },

    /// The agent has no weekly availability rules configured.
    #[error("agent {agent_id} has no availability rules configured")]
    NoRulesConfigured { agent_id: String },

    /// The agent has no connected external calendar.
    #[error("agent {agent_id} has no calendar connection")]
    NoCalendarConnection { agent_id: String },

    /// The requested slot overlaps a busy interval on the live calendar.
    #[error("requested slot is no longer available")]
    SlotNotAvailable,

    /// No valid credential could be produced for the calendar connection.
    #[error("calendar credential unavailable")]
    CredentialUnavailable(#[source] ProviderError),

    /// The busy query failed; availability is temporarily unknown.
    ///
    /// Deliberately distinct from an empty busy list: this must never be
    /// treated as "everything is free".
    #[error("availability temporarily unknown")]
    AvailabilityUnknown(#[source] ProviderError),

    /// The external event insert failed. Terminal for the attempt; the
    /// insert is not idempotent, so the engine never retries it.
    #[error("external event creation failed")]
    EventCreationFailed(#[source] ProviderError),

    /// The appointment write failed after the external event was created.
    ///
    /// The external event id is preserved here so the dangling event can be
    /// found and reconciled.
    #[error("appointment persistence failed after external event {external_event_id} was created")]
    PersistenceFailedAfterCreate {
        external_event_id: String,
        #[source]
        source: StorageError,
    },

    /// A storage read failed before any external mutation.
    #[error("storage error")]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// Creates an invalid-time-range error.
    pub fn invalid_time_range(reason: impl Into<String>) -> Self {
        Self::InvalidTimeRange {
            reason: reason.into(),
        }
    }

    /// Creates an invalid-date error.
    pub fn invalid_date(input: impl Into<String>) -> Self {
        Self::InvalidDate {
            input: input.into(),
        }
    }

    /// Creates an invalid-timezone error.
    pub fn invalid_timezone(input: impl Into<String>) -> Self {
        Self::InvalidTimezone {
            input: input.into(),
        }
    }

    /// Returns the stable snake_case label for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTimeRange { .. } => "invalid_time_range",
            Self::InvalidDate { .. } => "invalid_date",
            Self::InvalidTimezone { .. } => "invalid_timezone",
            Self::NoRulesConfigured { .. } => "no_rules_configured",
            Self::NoCalendarConnection { .. } => "no_calendar_connection",
            Self::SlotNotAvailable => "slot_not_available",
            Self::CredentialUnavailable(_) => "credential_unavailable",
            Self::AvailabilityUnknown(_) => "availability_unknown",
            Self::EventCreationFailed(_) => "external_event_creation_error",
            Self::PersistenceFailedAfterCreate { .. } => "persistence_error_after_external_create",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Returns true for client/input errors that carry no side effects and
    /// must not be retried.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTimeRange { .. } | Self::InvalidDate { .. } | Self::InvalidTimezone { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            EngineError::invalid_time_range("end before start").code(),
            "invalid_time_range"
        );
        assert_eq!(EngineError::SlotNotAvailable.code(), "slot_not_available");
        assert_eq!(
            EngineError::PersistenceFailedAfterCreate {
                external_event_id: "evt-1".into(),
                source: StorageError::new("write failed"),
            }
            .code(),
            "persistence_error_after_external_create"
        );
    }

    #[test]
    fn client_error_classification() {
        assert!(EngineError::invalid_date("2025-13-40").is_client_error());
        assert!(EngineError::invalid_timezone("Nowhere/Zone").is_client_error());
        assert!(!EngineError::SlotNotAvailable.is_client_error());
        assert!(!EngineError::Storage(StorageError::new("down")).is_client_error());
    }

    #[test]
    fn persistence_failure_names_the_external_event() {
        let err = EngineError::PersistenceFailedAfterCreate {
            external_event_id: "evt-42".into(),
            source: StorageError::new("disk full"),
        };
        assert!(err.to_string().contains("evt-42"));
    }
}
