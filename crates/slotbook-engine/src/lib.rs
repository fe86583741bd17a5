//! Availability queries and conflict-checked booking.
//!
//! This crate orchestrates the core's pure slot arithmetic against live
//! calendar data:
//!
//! - [`AvailabilityService`] answers "which dates are open" and "which
//!   slots are open on date D"
//! - [`BookingTransactor`] runs the validate, re-check, create, persist
//!   pipeline that produces one confirmed [`Appointment`](store::Appointment)
//!
//! Both are stateless per request: shared state is limited to the stores
//! and the calendar capability they borrow.

pub mod availability;
pub mod booking;
pub mod config;
pub mod error;
pub mod response;
pub mod store;

pub use availability::AvailabilityService;
pub use booking::{BookingRequest, BookingTransactor, IntakeAnswer};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use response::{AvailableDates, AvailableSlots, BookingConfirmation, SlotView};
pub use store::{
    Appointment, AppointmentStatus, AppointmentStore, MemoryStore, NewAppointment, ScheduleStore,
    StorageError,
};
