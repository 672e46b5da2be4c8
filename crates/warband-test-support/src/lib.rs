//! Shared test mocks and utilities for the Warband service.

mod clock;
mod registry;
mod repository;

pub use clock::{FixedClock, fixed_now};
pub use registry::{CountingProfileRegistry, profile};
pub use repository::{EmptyEventRepository, FailingEventRepository, RecordingEventRepository};
