//! Port for transactional booking persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Booking, BookingMode, BookingPatch, ConflictKind, Role};

use super::define_port_error;

define_port_error! {
    /// Errors raised by booking store adapters.
    ///
    /// Raw database error codes never surface here; adapters map them onto
    /// these stable categories.
    pub enum BookingStoreError {
        /// The proposed booking collides with an existing one.
        Conflict { kind: ConflictKind, booking_id: Uuid } =>
            "conflicts with existing booking {booking_id} ({kind})",
        /// A participant exists but is not in an active status.
        ParticipantInactive { role: Role, person_id: Uuid } =>
            "{role} {person_id} is not active",
        /// A foreign key target is missing or was deleted.
        ReferenceMissing { message: String } =>
            "referenced entity missing or deleted: {message}",
        /// The write violated a database check constraint.
        InvariantViolation { message: String } =>
            "write violates a database invariant: {message}",
        /// The merged update produced values the domain rejects.
        InvalidMerge { field: String, message: String } =>
            "merged booking is invalid ({field}): {message}",
        /// The addressed booking does not exist.
        NotFound { booking_id: Uuid } =>
            "booking {booking_id} not found",
        /// Store connection could not be established.
        Connection { message: String } =>
            "booking store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "booking store query failed: {message}",
    }
}

/// Port for creating and mutating bookings atomically.
///
/// Each method runs as a single transaction on the adapter side; partial
/// writes never become visible.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Persist a fully validated new booking.
    ///
    /// In [`BookingMode::Strict`] the adapter serialises on the participants,
    /// scans same-day active bookings, and refuses conflicting inserts; in
    /// [`BookingMode::Permissive`] the conflict scan is skipped and
    /// duplicates/overlaps are allowed through.
    async fn create(&self, booking: &Booking, mode: BookingMode) -> Result<(), BookingStoreError>;

    /// Fetch a booking by id.
    async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingStoreError>;

    /// Merge `patch` over the stored row and persist only the supplied
    /// columns, re-validating the effective merged values.
    async fn update(
        &self,
        booking_id: Uuid,
        patch: &BookingPatch,
    ) -> Result<Booking, BookingStoreError>;
}
