//! Calendar capability traits.
//!
//! The engine never talks to a concrete calendar backend directly; it
//! depends on two capabilities:
//!
//! - [`CredentialSource`] — "get me a valid credential for this connection"
//!   (token acquisition and refresh live behind it, out of scope here)
//! - [`CalendarAccess`] — free/busy query and event insert against one
//!   calendar
//!
//! Both are object-safe via boxed futures so a test double can stand in for
//! the real backend without touching slot logic.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use slotbook_core::{BusyInterval, TimeWindow};

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
///
/// Boxing keeps the capability traits object-safe, which the engine relies
/// on to swap backends and test doubles behind `dyn`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An opaque, ready-to-use credential for calendar API calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token for API requests.
    pub access_token: String,
    /// When the token stops being valid, if known.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Creates a credential from a bearer token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    /// Builder: set the expiry instant.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns true if the credential is expired or about to expire.
    ///
    /// A 60 second buffer is applied so a call started with a "valid"
    /// credential does not expire mid-flight.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + chrono::Duration::seconds(60) >= expires_at,
            None => false,
        }
    }
}

/// Descriptor of an agent's connected external calendar.
///
/// Owned and maintained elsewhere (OAuth connection management); this crate
/// only reads it to know which calendar to query and which connection id to
/// request credentials for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConnection {
    /// Connection identifier, handed to the credential source.
    pub id: String,
    /// Backend name (e.g. "google").
    pub provider: String,
    /// The calendar to query and insert into (e.g. "primary").
    pub calendar_id: String,
    /// Whether this is the agent's primary calendar.
    pub is_primary: bool,
}

/// The event to be created on the external calendar for a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Event title.
    pub summary: String,
    /// Event body, composed from booking notes and intake answers.
    pub description: String,
    /// Start instant.
    pub start_utc: DateTime<Utc>,
    /// End instant.
    pub end_utc: DateTime<Utc>,
    /// Optional attendee to invite.
    pub attendee_email: Option<String>,
}

impl EventDraft {
    /// Creates a draft with the given title and times.
    pub fn new(summary: impl Into<String>, start_utc: DateTime<Utc>, end_utc: DateTime<Utc>) -> Self {
        Self {
            summary: summary.into(),
            description: String::new(),
            start_utc,
            end_utc,
            attendee_email: None,
        }
    }

    /// Builder: set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set the attendee.
    pub fn with_attendee(mut self, email: impl Into<String>) -> Self {
        self.attendee_email = Some(email.into());
        self
    }
}

/// Produces valid credentials for calendar connections.
///
/// Token storage and refresh are implemented behind this trait; from the
/// engine's perspective a credential either materializes or the connection
/// is unusable (`credential_unavailable`).
pub trait CredentialSource: Send + Sync {
    /// Returns a ready-to-use credential for the given connection.
    fn get_valid_credential(&self, connection_id: &str)
        -> BoxFuture<'_, ProviderResult<Credential>>;
}

/// Free/busy query and event insert against one external calendar.
///
/// Implementations must not share mutable per-request state across agents:
/// the credential is passed per call precisely so one agent's token can
/// never leak into another's request.
pub trait CalendarAccess: Send + Sync {
    /// Returns the backend name (e.g. "google").
    fn name(&self) -> &str;

    /// Reports the busy intervals for `calendar_id` within `window`,
    /// ordered by start ascending.
    ///
    /// # Errors
    ///
    /// Any failure must surface as an error; callers rely on never
    /// mistaking "query failed" for "calendar free".
    fn query_busy<'a>(
        &'a self,
        credential: &'a Credential,
        calendar_id: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<BusyInterval>>>;

    /// Creates an event and returns the provider's event id.
    ///
    /// Not idempotent: callers must not blindly retry, a timed-out insert
    /// may have landed.
    fn insert_event<'a>(
        &'a self,
        credential: &'a Credential,
        calendar_id: &'a str,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<String>>;
}
