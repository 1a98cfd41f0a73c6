//! Ride-hailing fleet simulation on a wrap-around city grid.
//!
//! A run is a bevy [`World`](bevy_ecs::prelude::World) populated by
//! [`scenario::build_scenario`] and driven one block at a time by the
//! schedule from [`runner::simulation_schedule`].

pub mod clock;
pub mod ecs;
pub mod equilibration;
pub mod matching;
pub mod pricing;
pub mod runner;
pub mod scenario;
pub mod spatial;
pub mod summary;
pub mod systems;
pub mod telemetry;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;
