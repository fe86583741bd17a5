//! Google Calendar API v3 client.
//!
//! Low-level HTTP plumbing for the free/busy query and event insert
//! endpoints: request building, response parsing, and the mapping from
//! HTTP status codes to [`ProviderErrorCode`]s.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use slotbook_core::{BusyInterval, TimeWindow};

use crate::capability::{BoxFuture, CalendarAccess, Credential, EventDraft};
use crate::error::{ProviderError, ProviderResult};

/// Base URL for the Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar capability over the v3 REST API.
#[derive(Debug)]
pub struct GoogleCalendarApi {
    http_client: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarApi {
    /// Creates a client with the given request timeout.
    pub fn new(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");
        Self {
            http_client,
            base_url: CALENDAR_API_BASE.to_string(),
        }
    }

    /// Overrides the API base URL (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn free_busy(
        &self,
        credential: &Credential,
        calendar_id: &str,
        window: &TimeWindow,
    ) -> ProviderResult<Vec<BusyInterval>> {
        let url = format!("{}/freeBusy", self.base_url);
        let body = FreeBusyRequest {
            time_min: window.start,
            time_max: window.end,
            items: vec![FreeBusyItem {
                id: calendar_id.to_string(),
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&credential.access_token)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let parsed: FreeBusyResponse = read_json(response).await?;

        let calendar = parsed
            .calendars
            .get(calendar_id)
            .ok_or_else(|| {
                ProviderError::invalid_response(format!(
                    "free/busy response missing calendar {calendar_id}"
                ))
            })?;

        if let Some(errors) = &calendar.errors {
            if let Some(first) = errors.first() {
                return Err(ProviderError::fault(format!(
                    "free/busy query failed for {calendar_id}: {}",
                    first.reason
                )));
            }
        }

        let mut busy = Vec::with_capacity(calendar.busy.len());
        for period in &calendar.busy {
            match BusyInterval::new(period.start, period.end) {
                Ok(interval) => busy.push(interval),
                // A degenerate period cannot conflict with anything.
                Err(err) => warn!("skipping degenerate busy period: {err}"),
            }
        }
        busy.sort_by_key(|b| b.start);
        debug!(
            "free/busy for {calendar_id}: {} busy intervals in window",
            busy.len()
        );
        Ok(busy)
    }

    async fn create_event(
        &self,
        credential: &Credential,
        calendar_id: &str,
        draft: &EventDraft,
    ) -> ProviderResult<String> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencode(calendar_id)
        );
        let body = InsertEventRequest {
            summary: draft.summary.clone(),
            description: draft.description.clone(),
            start: EventDateTime {
                date_time: draft.start_utc,
            },
            end: EventDateTime {
                date_time: draft.end_utc,
            },
            attendees: draft
                .attendee_email
                .as_ref()
                .map(|email| vec![EventAttendee {
                    email: email.clone(),
                }]),
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&credential.access_token)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let created: InsertEventResponse = read_json(response).await?;
        debug!("created event {} on calendar {calendar_id}", created.id);
        Ok(created.id)
    }
}

impl CalendarAccess for GoogleCalendarApi {
    fn name(&self) -> &str {
        "google"
    }

    fn query_busy<'a>(
        &'a self,
        credential: &'a Credential,
        calendar_id: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<BusyInterval>>> {
        Box::pin(async move {
            self.free_busy(credential, calendar_id, window)
                .await
                .map_err(|e| e.with_provider("google"))
        })
    }

    fn insert_event<'a>(
        &'a self,
        credential: &'a Credential,
        calendar_id: &'a str,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            self.create_event(credential, calendar_id, draft)
                .await
                .map_err(|e| e.with_provider("google"))
        })
    }
}

/// Maps reqwest transport failures onto the error taxonomy.
fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout("request timed out").with_source(e)
    } else if e.is_connect() {
        ProviderError::unreachable("connection failed").with_source(e)
    } else {
        ProviderError::unreachable("request failed").with_source(e)
    }
}

/// Checks the HTTP status and parses a JSON body.
async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> ProviderResult<T> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::rate_limited("rate limit exceeded"));
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ProviderError::credential_unavailable(
            "access token rejected by provider",
        ));
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ProviderError::not_found("calendar not found"));
    }
    if status == reqwest::StatusCode::BAD_REQUEST {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::bad_request(format!(
            "request rejected: {body}"
        )));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::server(format!(
            "API error ({status}): {body}"
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::unreachable("failed to read response").with_source(e))?;
    serde_json::from_str(&body)
        .map_err(|e| ProviderError::invalid_response(format!("failed to parse response: {e}")))
}

/// Percent-encodes a calendar id for use as a path segment.
fn urlencode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeBusyRequest {
    time_min: DateTime<Utc>,
    time_max: DateTime<Utc>,
    items: Vec<FreeBusyItem>,
}

#[derive(Debug, Serialize)]
struct FreeBusyItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: std::collections::HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<BusyPeriod>,
    errors: Option<Vec<FreeBusyError>>,
}

#[derive(Debug, Deserialize)]
struct BusyPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyError {
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Serialize)]
struct InsertEventRequest {
    summary: String,
    description: String,
    start: EventDateTime,
    end: EventDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    attendees: Option<Vec<EventAttendee>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct EventAttendee {
    email: String,
}

#[derive(Debug, Deserialize)]
struct InsertEventResponse {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn free_busy_request_shape() {
        let request = FreeBusyRequest {
            time_min: Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap(),
            time_max: Utc.with_ymd_and_hms(2025, 6, 3, 0, 0, 0).unwrap(),
            items: vec![FreeBusyItem {
                id: "primary".to_string(),
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("timeMin").is_some());
        assert!(json.get("timeMax").is_some());
        assert_eq!(json["items"][0]["id"], "primary");
    }

    #[test]
    fn free_busy_response_parses() {
        let body = r#"{
            "calendars": {
                "primary": {
                    "busy": [
                        {"start": "2025-06-02T10:00:00Z", "end": "2025-06-02T10:30:00Z"}
                    ]
                }
            }
        }"#;
        let parsed: FreeBusyResponse = serde_json::from_str(body).unwrap();
        let calendar = parsed.calendars.get("primary").unwrap();
        assert_eq!(calendar.busy.len(), 1);
        assert!(calendar.errors.is_none());
    }

    #[test]
    fn free_busy_response_with_errors_parses() {
        let body = r#"{
            "calendars": {
                "primary": {
                    "busy": [],
                    "errors": [{"domain": "global", "reason": "notFound"}]
                }
            }
        }"#;
        let parsed: FreeBusyResponse = serde_json::from_str(body).unwrap();
        let calendar = parsed.calendars.get("primary").unwrap();
        let errors = calendar.errors.as_ref().unwrap();
        assert_eq!(errors[0].reason, "notFound");
    }

    #[test]
    fn insert_request_omits_missing_attendees() {
        let request = InsertEventRequest {
            summary: "Intro call".to_string(),
            description: String::new(),
            start: EventDateTime {
                date_time: Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
            },
            end: EventDateTime {
                date_time: Utc.with_ymd_and_hms(2025, 6, 2, 10, 30, 0).unwrap(),
            },
            attendees: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("attendees").is_none());
        assert!(json["start"].get("dateTime").is_some());
    }

    #[test]
    fn calendar_id_is_path_encoded() {
        assert_eq!(urlencode("user@example.com"), "user%40example.com");
    }
}
