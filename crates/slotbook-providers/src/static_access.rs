//! In-memory calendar capability for tests and local runs.
//!
//! [`StaticCalendarAccess`] serves a configurable set of busy intervals and
//! records every inserted event, so tests can assert both results and call
//! counts (e.g. that a rejected booking made no external calls). Failures
//! can be injected per operation to exercise the error paths.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;

use slotbook_core::{BusyInterval, TimeWindow};

use crate::capability::{BoxFuture, CalendarAccess, Credential, CredentialSource, EventDraft};
use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};

/// An injected failure, stored as code + message since errors carry a
/// non-cloneable source.
#[derive(Debug, Clone)]
struct InjectedFailure {
    code: ProviderErrorCode,
    message: String,
}

impl InjectedFailure {
    fn to_error(&self) -> ProviderError {
        ProviderError::new(self.code, self.message.clone()).with_provider("static")
    }
}

/// A calendar capability backed by in-memory state.
#[derive(Debug, Default)]
pub struct StaticCalendarAccess {
    busy: Mutex<Vec<BusyInterval>>,
    query_failure: Mutex<Option<InjectedFailure>>,
    insert_failure: Mutex<Option<InjectedFailure>>,
    inserted: Mutex<Vec<EventDraft>>,
    queried_windows: Mutex<Vec<TimeWindow>>,
    query_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    next_event_id: AtomicUsize,
}

impl StaticCalendarAccess {
    /// Creates an empty (fully free) calendar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a calendar preloaded with busy intervals.
    pub fn with_busy(busy: Vec<BusyInterval>) -> Self {
        let access = Self::new();
        *access.busy.lock().expect("lock poisoned") = busy;
        access
    }

    /// Replaces the busy intervals (e.g. to simulate a booking that landed
    /// between listing and re-check).
    pub fn set_busy(&self, busy: Vec<BusyInterval>) {
        *self.busy.lock().expect("lock poisoned") = busy;
    }

    /// Makes every subsequent `query_busy` fail with the given code.
    pub fn fail_queries(&self, code: ProviderErrorCode, message: impl Into<String>) {
        *self.query_failure.lock().expect("lock poisoned") = Some(InjectedFailure {
            code,
            message: message.into(),
        });
    }

    /// Makes every subsequent `insert_event` fail with the given code.
    pub fn fail_inserts(&self, code: ProviderErrorCode, message: impl Into<String>) {
        *self.insert_failure.lock().expect("lock poisoned") = Some(InjectedFailure {
            code,
            message: message.into(),
        });
    }

    /// Returns how many busy queries have been made.
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Returns how many insert attempts have been made.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Returns a copy of the recorded inserted drafts.
    pub fn inserted_events(&self) -> Vec<EventDraft> {
        self.inserted.lock().expect("lock poisoned").clone()
    }

    /// Returns the windows handed to `query_busy`, in call order.
    pub fn queried_windows(&self) -> Vec<TimeWindow> {
        self.queried_windows.lock().expect("lock poisoned").clone()
    }
}

impl CalendarAccess for StaticCalendarAccess {
    fn name(&self) -> &str {
        "static"
    }

    fn query_busy<'a>(
        &'a self,
        _credential: &'a Credential,
        _calendar_id: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<BusyInterval>>> {
        Box::pin(async move {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            self.queried_windows
                .lock()
                .expect("lock poisoned")
                .push(*window);
            if let Some(failure) = self.query_failure.lock().expect("lock poisoned").as_ref() {
                return Err(failure.to_error());
            }
            let mut busy: Vec<BusyInterval> = self
                .busy
                .lock()
                .expect("lock poisoned")
                .iter()
                .filter(|b| b.start < window.end && window.start < b.end)
                .copied()
                .collect();
            busy.sort_by_key(|b| b.start);
            Ok(busy)
        })
    }

    fn insert_event<'a>(
        &'a self,
        _credential: &'a Credential,
        _calendar_id: &'a str,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            self.insert_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(failure) = self.insert_failure.lock().expect("lock poisoned").as_ref() {
                return Err(failure.to_error());
            }
            self.inserted
                .lock()
                .expect("lock poisoned")
                .push(draft.clone());
            let id = self.next_event_id.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("evt-{id}"))
        })
    }
}

/// A credential source handing out one fixed credential.
#[derive(Debug)]
pub struct StaticCredentialSource {
    credential: Option<Credential>,
}

impl StaticCredentialSource {
    /// Always produces the given credential.
    pub fn new(credential: Credential) -> Self {
        Self {
            credential: Some(credential),
        }
    }

    /// Always fails with `credential_unavailable`.
    pub fn unavailable() -> Self {
        Self { credential: None }
    }
}

impl CredentialSource for StaticCredentialSource {
    fn get_valid_credential(
        &self,
        connection_id: &str,
    ) -> BoxFuture<'_, ProviderResult<Credential>> {
        let result = match &self.credential {
            Some(credential) if !credential.is_expired(Utc::now()) => Ok(credential.clone()),
            Some(_) => Err(ProviderError::credential_unavailable(format!(
                "credential for {connection_id} is expired"
            ))),
            None => Err(ProviderError::credential_unavailable(format!(
                "no credential for {connection_id}"
            ))),
        };
        Box::pin(async move { result })
    }
}
