//! Shared test mocks and utilities for the Fable story platform.

mod clock;
mod repository;

pub use clock::{FixedClock, SteppingClock};
pub use repository::{FailingAggregateRepository, InMemoryAggregateRepository};
