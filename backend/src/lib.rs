//! Booking core library modules.

pub mod domain;
pub mod outbound;
pub mod server;
