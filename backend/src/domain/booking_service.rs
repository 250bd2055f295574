//! Booking command services.
//!
//! The service validates raw request payloads into domain types, hands fully
//! validated aggregates to the booking store port, and maps store errors to
//! transport-agnostic domain errors. All persistence atomicity lives behind
//! the port; the service never sees a partially-applied write.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::ports::{BookingStore, BookingStoreError};
use crate::domain::{
    Booking, BookingDraft, BookingMode, BookingPatch, BookingStatus, DomainError, SessionWindow,
};

/// Raw booking creation payload as received from the route layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBookingRequest {
    /// The teacher delivering the session.
    pub teacher_id: Uuid,
    /// Requested students; only the first is persisted, the rest are
    /// reported back as a skipped count.
    pub student_ids: Vec<Uuid>,
    /// Session date.
    pub session_date: NaiveDate,
    /// Window start as an `HH:MM` string.
    pub start_time: String,
    /// Window end as an `HH:MM` string.
    pub end_time: String,
    /// Course type reference.
    pub course_type_id: Uuid,
    /// Optional free-form location.
    pub location: Option<String>,
    /// Optional fee in minor currency units.
    pub fee_cents: Option<i64>,
    /// Optional explicit initial status; only `pending` and `confirmed` are
    /// accepted here.
    pub status: Option<String>,
}

/// Outcome of a successful creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateBookingResponse {
    /// Id of the persisted booking.
    pub booking_id: Uuid,
    /// How many surplus student ids were dropped.
    pub skipped_students: usize,
}

/// Raw booking update payload; absent fields keep their stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateBookingRequest {
    /// Replacement session date.
    pub session_date: Option<NaiveDate>,
    /// Replacement window start as `HH:MM`.
    pub start_time: Option<String>,
    /// Replacement window end as `HH:MM`.
    pub end_time: Option<String>,
    /// Replacement status string.
    pub status: Option<String>,
    /// Replacement course type.
    pub course_type_id: Option<Uuid>,
    /// Replacement location.
    pub location: Option<String>,
    /// Replacement fee.
    pub fee_cents: Option<i64>,
}

/// Booking command service implementing create/update/cancel.
#[derive(Clone)]
pub struct BookingCommandService<S> {
    store: Arc<S>,
    mode: BookingMode,
}

impl<S> BookingCommandService<S> {
    /// Create a service around `store` operating in `mode`.
    pub fn new(store: Arc<S>, mode: BookingMode) -> Self {
        Self { store, mode }
    }
}

impl<S> BookingCommandService<S>
where
    S: BookingStore,
{
    /// Validate and persist a new booking.
    pub async fn create(
        &self,
        request: CreateBookingRequest,
    ) -> Result<CreateBookingResponse, DomainError> {
        let student_id = request.student_ids.first().copied().ok_or_else(|| {
            DomainError::invalid_field("student_ids", "at least one student is required")
        })?;
        let skipped_students = request.student_ids.len().saturating_sub(1);

        let window = SessionWindow::parse(&request.start_time, &request.end_time)
            .map_err(validation_to_domain)?;
        let status = resolve_initial_status(request.status.as_deref())?;

        let booking = Booking::new(BookingDraft {
            id: Uuid::new_v4(),
            teacher_id: request.teacher_id,
            student_id,
            course_type_id: request.course_type_id,
            session_date: request.session_date,
            window,
            status,
            last_auto_update: None,
            location: request.location,
            fee_cents: request.fee_cents,
        })
        .map_err(validation_to_domain)?;

        self.store
            .create(&booking, self.mode)
            .await
            .map_err(map_store_error)?;

        info!(
            booking_id = %booking.id(),
            teacher_id = %booking.teacher_id(),
            skipped_students,
            mode = ?self.mode,
            "booking created"
        );

        Ok(CreateBookingResponse {
            booking_id: booking.id(),
            skipped_students,
        })
    }

    /// Merge an update over an existing booking.
    pub async fn update(
        &self,
        booking_id: Uuid,
        request: UpdateBookingRequest,
    ) -> Result<Booking, DomainError> {
        let patch = build_patch(request)?;
        if patch.is_empty() {
            return Err(DomainError::invalid_request(
                "update supplies no fields to change",
            ));
        }

        let updated = self
            .store
            .update(booking_id, &patch)
            .await
            .map_err(map_store_error)?;

        info!(booking_id = %booking_id, status = %updated.status(), "booking updated");
        Ok(updated)
    }

    /// Cancel a pending or confirmed booking.
    pub async fn cancel(&self, booking_id: Uuid) -> Result<(), DomainError> {
        let patch = BookingPatch {
            status: Some(BookingStatus::Cancelled),
            ..BookingPatch::default()
        };

        self.store
            .update(booking_id, &patch)
            .await
            .map_err(map_store_error)?;

        info!(booking_id = %booking_id, "booking cancelled");
        Ok(())
    }

    /// Fetch a booking by id.
    pub async fn get(&self, booking_id: Uuid) -> Result<Booking, DomainError> {
        self.store
            .find_by_id(booking_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| DomainError::not_found(format!("booking {booking_id} not found")))
    }
}

/// Resolve the initial status for a creation request.
///
/// A new booking defaults to pending; only pending and confirmed may be
/// supplied explicitly.
fn resolve_initial_status(raw: Option<&str>) -> Result<BookingStatus, DomainError> {
    let Some(raw) = raw else {
        return Ok(BookingStatus::Pending);
    };
    let status = BookingStatus::parse(raw).map_err(validation_to_domain)?;
    match status {
        BookingStatus::Pending | BookingStatus::Confirmed => Ok(status),
        other => Err(DomainError::invalid_field(
            "status",
            format!("a new booking cannot start as '{other}'"),
        )),
    }
}

/// Parse the raw update payload into a typed patch.
fn build_patch(request: UpdateBookingRequest) -> Result<BookingPatch, DomainError> {
    let start_time = request
        .start_time
        .as_deref()
        .map(|raw| parse_patch_time("start_time", raw))
        .transpose()?;
    let end_time = request
        .end_time
        .as_deref()
        .map(|raw| parse_patch_time("end_time", raw))
        .transpose()?;
    let status = request
        .status
        .as_deref()
        .map(BookingStatus::parse)
        .transpose()
        .map_err(validation_to_domain)?;

    Ok(BookingPatch {
        session_date: request.session_date,
        start_time,
        end_time,
        status,
        course_type_id: request.course_type_id,
        location: request.location,
        fee_cents: request.fee_cents,
    })
}

fn parse_patch_time(
    field: &'static str,
    raw: &str,
) -> Result<chrono::NaiveTime, DomainError> {
    chrono::NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| {
        DomainError::invalid_field(field, format!("'{raw}' is not a valid HH:MM time"))
    })
}

fn validation_to_domain(error: crate::domain::BookingValidationError) -> DomainError {
    DomainError::invalid_field(error.field(), error.message())
}

/// Map store port errors to stable domain error categories.
fn map_store_error(error: BookingStoreError) -> DomainError {
    match error {
        BookingStoreError::Conflict { kind, booking_id } => {
            DomainError::conflict(format!("booking conflicts with {booking_id} ({kind})"))
                .with_details(json!({
                    "kind": kind.as_str(),
                    "conflictingBookingId": booking_id,
                }))
        }
        BookingStoreError::ParticipantInactive { role, person_id } => {
            DomainError::invalid_request(format!("{role} {person_id} is not active"))
                .with_details(json!({ "field": format!("{role}_id") }))
        }
        BookingStoreError::ReferenceMissing { message } => DomainError::reference_missing(message),
        BookingStoreError::InvariantViolation { message } => {
            DomainError::invariant_violation(message)
        }
        BookingStoreError::InvalidMerge { field, message } => {
            DomainError::invalid_request(message).with_details(json!({ "field": field }))
        }
        BookingStoreError::NotFound { booking_id } => {
            DomainError::not_found(format!("booking {booking_id} not found"))
        }
        BookingStoreError::Connection { message } => {
            DomainError::service_unavailable(format!("booking store unavailable: {message}"))
        }
        BookingStoreError::Query { message } => {
            DomainError::internal(format!("booking store error: {message}"))
        }
    }
}

#[cfg(test)]
#[path = "booking_service_tests.rs"]
mod tests;
