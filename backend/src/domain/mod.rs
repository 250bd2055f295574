//! Domain primitives, services, and ports for the booking core.
//!
//! Purpose: hold the strongly typed aggregates and the services that enforce
//! booking invariants, independent of transport and persistence. Adapters
//! live under `outbound` and implement the traits in [`ports`].
//!
//! Public surface:
//! - `Booking` / `BookingStatus` / `SessionWindow` — the booking aggregate.
//! - `classify_conflict` — pure duplicate/overlap classification.
//! - `BookingCommandService` — validated create/update/cancel.
//! - `AvailabilityService` — slot reads, writes, and discovery.
//! - `LifecycleJob` — idempotent batch completion of elapsed bookings.

pub mod ports;

mod availability;
mod availability_service;
mod booking;
mod booking_service;
mod conflict;
mod error;
mod lifecycle_job;

pub use self::availability::{
    DayAvailability, DayAvailabilityUpdate, Role, SlotInput, SlotSelector, TimeSlot,
    normalize_slot, slots_spanning,
};
pub use self::availability_service::{AvailabilityService, SetAvailabilityResponse};
pub use self::booking::{
    Booking, BookingDraft, BookingMode, BookingPatch, BookingStatus, BookingValidationError,
    SessionWindow,
};
pub use self::booking_service::{
    BookingCommandService, CreateBookingRequest, CreateBookingResponse, UpdateBookingRequest,
};
pub use self::conflict::{ActiveBooking, BookingCandidate, Conflict, ConflictKind, classify_conflict};
pub use self::error::{DomainError, DomainErrorValidationError, ErrorCode};
pub use self::lifecycle_job::{
    JobRunFailure, JobRunSummary, LifecycleJob, LifecycleJobConfig, LifecycleJobPorts,
    LifecycleJobRuntime, LifecycleSleeper, TokioSleeper,
};
