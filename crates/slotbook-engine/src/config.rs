//! Engine configuration.

/// Configuration shared by the availability service and the booking
/// transactor.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Length of a bookable slot, in minutes.
    pub slot_minutes: u32,

    /// Look-ahead window for date listing when the caller gives none.
    pub default_days_ahead: u32,

    /// Upper bound on the look-ahead window, to cap template expansion.
    pub max_days_ahead: u32,

    /// Summary used for created calendar events.
    pub event_summary: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slot_minutes: 30,
            default_days_ahead: 14,
            max_days_ahead: 60,
            event_summary: "Booked appointment".to_string(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with the given slot length.
    pub fn new(slot_minutes: u32) -> Self {
        Self {
            slot_minutes,
            ..Default::default()
        }
    }

    /// Builder: set the default look-ahead in days.
    pub fn with_default_days_ahead(mut self, days: u32) -> Self {
        self.default_days_ahead = days;
        self
    }

    /// Builder: set the look-ahead cap in days.
    pub fn with_max_days_ahead(mut self, days: u32) -> Self {
        self.max_days_ahead = days;
        self
    }

    /// Builder: set the summary for created events.
    pub fn with_event_summary(mut self, summary: impl Into<String>) -> Self {
        self.event_summary = summary.into();
        self
    }

    /// Resolves the effective look-ahead for a request.
    pub fn effective_days_ahead(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_days_ahead)
            .min(self.max_days_ahead)
    }
}
