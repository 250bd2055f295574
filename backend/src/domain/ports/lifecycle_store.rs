//! Port for the status lifecycle job's batch transitions.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::domain::BookingStatus;

use super::define_port_error;

define_port_error! {
    /// Errors raised by lifecycle store adapters.
    pub enum LifecycleStoreError {
        /// Store connection could not be established or was lost mid-flight.
        Connection { message: String } =>
            "lifecycle store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "lifecycle store query failed: {message}",
    }
}

impl LifecycleStoreError {
    /// Whether retrying the batch can plausibly succeed.
    ///
    /// Only connection-level failures are transient; query failures are
    /// deterministic and retrying them would just repeat the error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// The point in time a booking must have elapsed to be due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueCutoff {
    /// The current date.
    pub today: NaiveDate,
    /// The current time of day.
    pub now: NaiveTime,
}

/// One booking the store transitioned during a batch claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedTransition {
    /// The transitioned booking.
    pub booking_id: Uuid,
    /// Status the booking held before the job touched it.
    pub previous_status: BookingStatus,
}

/// Port for claiming and transitioning due bookings in bounded batches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LifecycleStore: Send + Sync {
    /// Atomically complete up to `limit` due bookings and append one audit
    /// row per transition tagged with `run_id`.
    ///
    /// Due means `status IN (pending, confirmed)`, no tombstone, and a
    /// session date/end-time earlier than `cutoff`. The predicate is
    /// re-checked inside the claiming `UPDATE` itself, so concurrent runs
    /// cannot double-process a row. Rows are claimed in ascending session
    /// date order; an empty return means the backlog is drained.
    async fn claim_due_batch(
        &self,
        cutoff: DueCutoff,
        run_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CompletedTransition>, LifecycleStoreError>;
}
