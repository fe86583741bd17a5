//! Google Calendar backend.
//!
//! Implements [`CalendarAccess`](crate::CalendarAccess) over the Google
//! Calendar v3 REST API:
//!
//! - `freeBusy.query` for busy intervals
//! - `events.insert` for booking event creation
//!
//! Credentials are supplied per call by a
//! [`CredentialSource`](crate::CredentialSource); this module never stores
//! or refreshes tokens, so concurrent requests for different agents cannot
//! share token state.

mod client;

pub use client::GoogleCalendarApi;
