//! Calendar capability traits and implementations.
//!
//! This crate is the boundary between the booking engine and external
//! calendar backends:
//!
//! - [`CalendarAccess`] - free/busy query and event insert for one calendar
//! - [`CredentialSource`] - "get a valid credential" for a connection
//! - [`ProviderError`] - typed failures with retryability classification
//! - [`google::GoogleCalendarApi`] - the Google Calendar v3 backend
//! - [`StaticCalendarAccess`] - in-memory double for tests and local runs
//!
//! The engine only sees the traits; swapping the backend (or substituting
//! the static double) never touches slot or booking logic.

pub mod capability;
pub mod error;
pub mod google;
pub mod static_access;

pub use capability::{
    BoxFuture, CalendarAccess, CalendarConnection, Credential, CredentialSource, EventDraft,
};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use static_access::{StaticCalendarAccess, StaticCredentialSource};
