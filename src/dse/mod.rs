//! Design-space exploration: enumerates every combination of the pending
//! synthesis decisions.

pub use explorer::*;
pub use observer::*;
pub use odometer::*;

pub mod explorer;
pub mod observer;
pub mod odometer;
