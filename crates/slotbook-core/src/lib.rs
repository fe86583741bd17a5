//! Core types and pure logic: time windows, weekly rules, slot generation,
//! busy-interval filtering.

pub mod freebusy;
pub mod rules;
pub mod schedule;
pub mod slots;
pub mod time;
pub mod tracing;

pub use freebusy::{filter_free, overlaps, BusyInterval, InvalidBusyInterval};
pub use rules::{parse_zone, weekday_index, BookingSettings, RuleError, WeeklyAvailabilityRule};
pub use schedule::{approved_weekdays, day_window, next_approved_dates, DayWindow};
pub use slots::{generate_candidate_slots, CandidateSlot};
pub use time::{day_start, local_day_span, local_today, resolve_local, TimeWindow};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
