//! Availability queries.
//!
//! Two modes, both timezone-first:
//!
//! - date listing: which dates could possibly work (template expansion
//!   only, no busy lookup)
//! - slot listing: which slots are open on one date (template expansion,
//!   slot generation, live busy filter)
//!
//! The service owns no persisted state; each answer is a pure function of
//! (rules, settings, externally fetched busy intervals, clock).

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

use slotbook_core::{
    approved_weekdays, day_window, filter_free, generate_candidate_slots, local_day_span,
    local_today, next_approved_dates, parse_zone, BookingSettings,
};
use slotbook_providers::{CalendarAccess, CalendarConnection, Credential, CredentialSource};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::response::{AvailableDates, AvailableSlots, SlotView};
use crate::store::ScheduleStore;

/// Answers availability queries for agents.
#[derive(Debug)]
pub struct AvailabilityService<S, C, A> {
    schedule: Arc<S>,
    credentials: Arc<C>,
    calendar: Arc<A>,
    config: EngineConfig,
}

impl<S, C, A> AvailabilityService<S, C, A>
where
    S: ScheduleStore,
    C: CredentialSource,
    A: CalendarAccess,
{
    /// Creates a service over the given stores and calendar capability.
    pub fn new(
        schedule: Arc<S>,
        credentials: Arc<C>,
        calendar: Arc<A>,
        config: EngineConfig,
    ) -> Self {
        Self {
            schedule,
            credentials,
            calendar,
            config,
        }
    }

    /// Lists the approved dates within the look-ahead window.
    ///
    /// No busy lookup happens here: this mode answers "which days could
    /// possibly work", not "which slots are open".
    pub async fn list_available_dates(
        &self,
        agent_id: &str,
        days_ahead: Option<u32>,
        timezone_override: Option<&str>,
    ) -> EngineResult<AvailableDates> {
        self.list_available_dates_at(agent_id, days_ahead, timezone_override, Utc::now())
            .await
    }

    /// [`list_available_dates`](Self::list_available_dates) with an explicit
    /// clock, so the expansion stays a pure function of its inputs.
    pub async fn list_available_dates_at(
        &self,
        agent_id: &str,
        days_ahead: Option<u32>,
        timezone_override: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<AvailableDates> {
        let rules = self.schedule.load_weekly_rules(agent_id).await?;
        if rules.is_empty() {
            return Err(EngineError::NoRulesConfigured {
                agent_id: agent_id.to_string(),
            });
        }
        let settings = self.schedule.load_booking_settings(agent_id).await?;
        let tz = effective_zone(&settings, timezone_override)?;

        let approved = approved_weekdays(&rules);
        let days = self.config.effective_days_ahead(days_ahead);
        let dates = next_approved_dates(&approved, tz, days, settings.allow_same_day_booking, now);
        debug!(
            agent_id,
            days, "date listing produced {} approved dates", dates.len()
        );
        Ok(AvailableDates {
            timezone: tz.name().to_string(),
            dates,
        })
    }

    /// Lists the free slots on one date.
    ///
    /// An out-of-policy day (same-day when disallowed, or a weekday with no
    /// rules) answers with an empty slot list, not an error; only a
    /// malformed date fails validation.
    pub async fn list_available_slots(
        &self,
        agent_id: &str,
        date: &str,
        timezone_override: Option<&str>,
    ) -> EngineResult<AvailableSlots> {
        self.list_available_slots_at(agent_id, date, timezone_override, Utc::now())
            .await
    }

    /// [`list_available_slots`](Self::list_available_slots) with an explicit
    /// clock.
    pub async fn list_available_slots_at(
        &self,
        agent_id: &str,
        date: &str,
        timezone_override: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<AvailableSlots> {
        let target = NaiveDate::from_str(date).map_err(|_| EngineError::invalid_date(date))?;

        let settings = self.schedule.load_booking_settings(agent_id).await?;
        let tz = effective_zone(&settings, timezone_override)?;

        let empty = |tz: Tz| AvailableSlots {
            timezone: tz.name().to_string(),
            date: target,
            slots: Vec::new(),
        };

        // Same-day out of policy is an unavailable day, not an error.
        if !settings.allow_same_day_booking && target == local_today(now, tz) {
            debug!(agent_id, %target, "same-day booking disallowed, returning empty");
            return Ok(empty(tz));
        }

        let rules = self.schedule.load_weekly_rules(agent_id).await?;
        let Some(window) = day_window(&rules, target) else {
            debug!(agent_id, %target, "no rule matches weekday, returning empty");
            return Ok(empty(tz));
        };

        let candidates =
            generate_candidate_slots(&window.rules, target, target, self.config.slot_minutes, tz);
        if candidates.is_empty() {
            return Ok(empty(tz));
        }

        let span = local_day_span(target, tz).ok_or_else(|| EngineError::invalid_date(date))?;
        let (connection, credential) =
            connect_calendar(self.schedule.as_ref(), self.credentials.as_ref(), agent_id).await?;
        let busy = self
            .calendar
            .query_busy(&credential, &connection.calendar_id, &span)
            .await
            .map_err(EngineError::AvailabilityUnknown)?;

        let free = filter_free(candidates, &busy);
        info!(
            agent_id,
            %target,
            busy = busy.len(),
            free = free.len(),
            "slot listing complete"
        );
        Ok(AvailableSlots {
            timezone: tz.name().to_string(),
            date: target,
            slots: free.iter().map(SlotView::from).collect(),
        })
    }
}

/// Resolves an agent's calendar connection and a valid credential.
pub(crate) async fn connect_calendar<S, C>(
    schedule: &S,
    credentials: &C,
    agent_id: &str,
) -> EngineResult<(CalendarConnection, Credential)>
where
    S: ScheduleStore + ?Sized,
    C: CredentialSource + ?Sized,
{
    let connection = schedule
        .load_calendar_connection(agent_id)
        .await?
        .ok_or_else(|| EngineError::NoCalendarConnection {
            agent_id: agent_id.to_string(),
        })?;
    let credential = credentials
        .get_valid_credential(&connection.id)
        .await
        .map_err(EngineError::CredentialUnavailable)?;
    Ok((connection, credential))
}

/// Resolves the effective zone: the caller's override if present, else the
/// agent's configured zone.
pub(crate) fn effective_zone(
    settings: &BookingSettings,
    timezone_override: Option<&str>,
) -> EngineResult<Tz> {
    match timezone_override {
        Some(name) => parse_zone(name).map_err(|_| EngineError::invalid_timezone(name)),
        None => Ok(settings.timezone),
    }
}
