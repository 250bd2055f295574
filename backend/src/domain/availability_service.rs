//! Availability read/write services and discovery queries.
//!
//! Writes normalize heterogeneous client slot values before they reach the
//! store; reads return only rows that exist, leaving gap interpretation to
//! the caller. Discovery translates a requested window into required slots
//! and delegates the person scan to the store.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::domain::ports::{
    AvailabilityStore, AvailabilityStoreError, AvailabilityWriteOutcome,
};
use crate::domain::{
    DayAvailability, DayAvailabilityUpdate, DomainError, Role, SessionWindow, SlotSelector,
};

/// Outcome counts of a batched availability write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetAvailabilityResponse {
    /// Days whose row was inserted or updated.
    pub stored: usize,
    /// Days whose row was deleted after losing its last slot.
    pub removed: usize,
    /// Updates skipped because no supplied value was recognized.
    pub ignored: usize,
}

/// Availability service implementing slot reads, writes, and discovery.
#[derive(Clone)]
pub struct AvailabilityService<S> {
    store: Arc<S>,
}

impl<S> AvailabilityService<S> {
    /// Create a service around `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> AvailabilityService<S>
where
    S: AvailabilityStore,
{
    /// Existing availability rows for the person in the inclusive range.
    pub async fn get_availability(
        &self,
        role: Role,
        person_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DayAvailability>, DomainError> {
        if to < from {
            return Err(DomainError::invalid_field(
                "date_range",
                "range end must not precede range start",
            ));
        }
        self.store
            .list(role, person_id, from, to)
            .await
            .map_err(map_store_error)
    }

    /// Apply a batch of per-day slot updates.
    ///
    /// Each update is resolved over the currently stored day (or an all-false
    /// default when none exists); updates whose values are all unrecognized
    /// are ignored without error, and days that end up with no true slot are
    /// deleted rather than stored as zeroed rows.
    pub async fn set_availability(
        &self,
        role: Role,
        person_id: Uuid,
        updates: Vec<DayAvailabilityUpdate>,
    ) -> Result<SetAvailabilityResponse, DomainError> {
        let Some((from, to)) = day_bounds(&updates) else {
            return Ok(SetAvailabilityResponse::default());
        };

        let current: BTreeMap<NaiveDate, DayAvailability> = self
            .store
            .list(role, person_id, from, to)
            .await
            .map_err(map_store_error)?
            .into_iter()
            .map(|day| (day.day, day))
            .collect();

        let mut response = SetAvailabilityResponse::default();
        for update in &updates {
            if !update.has_recognized_slot() {
                response.ignored = response.ignored.saturating_add(1);
                continue;
            }

            let base = current
                .get(&update.day)
                .copied()
                .unwrap_or_else(|| DayAvailability::closed(update.day));
            let resolved = update.resolve_over(base);

            match self
                .store
                .upsert_day(role, person_id, resolved)
                .await
                .map_err(map_store_error)?
            {
                AvailabilityWriteOutcome::Stored => {
                    response.stored = response.stored.saturating_add(1);
                }
                AvailabilityWriteOutcome::Removed => {
                    response.removed = response.removed.saturating_add(1);
                }
            }
        }

        info!(
            %role,
            person_id = %person_id,
            stored = response.stored,
            removed = response.removed,
            ignored = response.ignored,
            "availability updated"
        );
        Ok(response)
    }

    /// Switch the selected slots off across a date range.
    pub async fn delete_availability(
        &self,
        role: Role,
        person_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        slots: SlotSelector,
    ) -> Result<u64, DomainError> {
        if to < from {
            return Err(DomainError::invalid_field(
                "date_range",
                "range end must not precede range start",
            ));
        }
        let cleared = self
            .store
            .clear_range(role, person_id, from, to, slots)
            .await
            .map_err(map_store_error)?;

        info!(%role, person_id = %person_id, cleared, "availability cleared");
        Ok(cleared)
    }

    /// Persons available for a window on a day, for discovery UIs.
    ///
    /// Advisory only: nothing here is re-checked when a booking is written.
    pub async fn find_available(
        &self,
        role: Role,
        day: NaiveDate,
        start_time: &str,
        end_time: &str,
    ) -> Result<Vec<Uuid>, DomainError> {
        let window = SessionWindow::parse(start_time, end_time)
            .map_err(|err| DomainError::invalid_field(err.field(), err.message()))?;

        self.store
            .find_available(role, day, window)
            .await
            .map_err(map_store_error)
    }
}

/// Smallest and largest day named by the updates.
fn day_bounds(updates: &[DayAvailabilityUpdate]) -> Option<(NaiveDate, NaiveDate)> {
    let from = updates.iter().map(|update| update.day).min()?;
    let to = updates.iter().map(|update| update.day).max()?;
    Some((from, to))
}

fn map_store_error(error: AvailabilityStoreError) -> DomainError {
    match error {
        AvailabilityStoreError::Connection { message } => {
            DomainError::service_unavailable(format!("availability store unavailable: {message}"))
        }
        AvailabilityStoreError::Query { message } => {
            DomainError::internal(format!("availability store error: {message}"))
        }
    }
}

#[cfg(test)]
#[path = "availability_service_tests.rs"]
mod tests;
