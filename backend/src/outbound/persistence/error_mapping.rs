//! Shared Diesel error mapping for the persistence adapters.
//!
//! Raw database error codes stop here: adapters translate them into the
//! stable port error categories before anything crosses the hexagonal
//! boundary.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::{AvailabilityStoreError, BookingStoreError, LifecycleStoreError};

use super::pool::PoolError;

fn pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

fn log_diesel_error(error: &DieselError) {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(
            error_type = %std::any::type_name_of_val(other),
            "diesel operation failed"
        ),
    }
}

/// Map pool checkout failures for the booking store.
pub(crate) fn map_booking_pool_error(error: PoolError) -> BookingStoreError {
    BookingStoreError::connection(pool_error_message(error))
}

/// Map Diesel failures for the booking store.
///
/// Foreign-key and check-constraint violations keep their own categories so
/// callers can distinguish "referenced entity missing" from "violates a
/// database invariant".
pub(crate) fn map_booking_diesel_error(error: DieselError) -> BookingStoreError {
    log_diesel_error(&error);

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            BookingStoreError::reference_missing(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
            BookingStoreError::invariant_violation(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            BookingStoreError::connection("database connection error")
        }
        DieselError::NotFound => BookingStoreError::query("record not found"),
        _ => BookingStoreError::query("database error"),
    }
}

/// Map pool checkout failures for the availability store.
pub(crate) fn map_availability_pool_error(error: PoolError) -> AvailabilityStoreError {
    AvailabilityStoreError::connection(pool_error_message(error))
}

/// Map Diesel failures for the availability store.
pub(crate) fn map_availability_diesel_error(error: DieselError) -> AvailabilityStoreError {
    log_diesel_error(&error);

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            AvailabilityStoreError::connection("database connection error")
        }
        _ => AvailabilityStoreError::query("database error"),
    }
}

/// Map pool checkout failures for the lifecycle store.
///
/// Checkout failures are transient by definition and feed the job's retry
/// policy.
pub(crate) fn map_lifecycle_pool_error(error: PoolError) -> LifecycleStoreError {
    LifecycleStoreError::connection(pool_error_message(error))
}

/// Map Diesel failures for the lifecycle store.
pub(crate) fn map_lifecycle_diesel_error(error: DieselError) -> LifecycleStoreError {
    log_diesel_error(&error);

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            LifecycleStoreError::connection("database connection error")
        }
        DieselError::DatabaseError(_, info) => {
            LifecycleStoreError::query(info.message().to_owned())
        }
        _ => LifecycleStoreError::query("database error"),
    }
}
