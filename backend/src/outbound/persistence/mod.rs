//! PostgreSQL persistence adapters for the domain ports.

mod diesel_availability_store;
mod diesel_booking_store;
mod diesel_lifecycle_store;
mod error_mapping;
mod models;
mod pool;
mod schema;
mod session_date;

pub use diesel_availability_store::DieselAvailabilityStore;
pub use diesel_booking_store::DieselBookingStore;
pub use diesel_lifecycle_store::DieselLifecycleStore;
pub use pool::{DbPool, PoolError, PoolSettings};
pub use session_date::{
    DEFAULT_DATE_COLUMN, SESSION_DATE_CANDIDATES, SchemaCapabilities, SchemaProbe,
};
