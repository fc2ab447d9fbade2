pub mod engine;
pub mod guards;

pub use engine::{BookingEngine, ReserveRequest};

#[cfg(test)]
mod engine_tests;
