//! Port for per-person availability persistence and discovery reads.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{DayAvailability, Role, SessionWindow, SlotSelector};

use super::define_port_error;

define_port_error! {
    /// Errors raised by availability store adapters.
    pub enum AvailabilityStoreError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "availability store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "availability store query failed: {message}",
    }
}

/// What a day-level write ended up doing in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityWriteOutcome {
    /// The day's row was inserted or updated.
    Stored,
    /// The day lost its last true slot and the row was deleted.
    Removed,
}

/// Port for availability rows and the discovery reads built on them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Existing rows for `person_id` between `from` and `to` inclusive.
    ///
    /// Days without a row are simply absent; interpreting gaps is the
    /// caller's concern.
    async fn list(
        &self,
        role: Role,
        person_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DayAvailability>, AvailabilityStoreError>;

    /// Upsert one resolved day, deleting the row instead when no slot
    /// remains true.
    async fn upsert_day(
        &self,
        role: Role,
        person_id: Uuid,
        day: DayAvailability,
    ) -> Result<AvailabilityWriteOutcome, AvailabilityStoreError>;

    /// Switch the selected slots off across a date range, deleting rows that
    /// end up all-false. Returns the number of rows touched.
    async fn clear_range(
        &self,
        role: Role,
        person_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        slots: SlotSelector,
    ) -> Result<u64, AvailabilityStoreError>;

    /// Persons declared available for every slot `window` spans on `day`,
    /// excluding anyone with an active booking intersecting the window.
    async fn find_available(
        &self,
        role: Role,
        day: NaiveDate,
        window: SessionWindow,
    ) -> Result<Vec<Uuid>, AvailabilityStoreError>;
}
