//! Test helpers for common test setup and utilities.
//!
//! This module provides shared test utilities to reduce duplication across test files.

use bevy_ecs::prelude::World;

use crate::ecs::{Trip, Vehicle};
use crate::scenario::{build_scenario, ScenarioParams};
use crate::telemetry::SimSnapshotConfig;

/// Seed shared by tests that do not care about a particular random stream.
pub const TEST_SEED: u64 = 0x5EED;

/// A small city with no initial fleet and no demand, so tests place every
/// vehicle and trip themselves.
pub fn quiet_params(city_size: u32) -> ScenarioParams {
    ScenarioParams::default()
        .with_seed(TEST_SEED)
        .with_city_size(city_size)
        .with_vehicle_count(0)
        .with_base_demand(0.0)
        .with_idle_turn_probability(0.0)
        .with_snapshots(SimSnapshotConfig::default())
}

/// Builds a world from `params`.
///
/// # Panics
///
/// Panics if `params` do not validate.
pub fn create_test_world(params: ScenarioParams) -> World {
    let mut world = World::new();
    build_scenario(&mut world, params).expect("test scenario params should validate");
    world
}

/// Every vehicle, cloned and ordered by id.
pub fn vehicles_by_id(world: &mut World) -> Vec<Vehicle> {
    let mut vehicles: Vec<Vehicle> = world.query::<&Vehicle>().iter(world).cloned().collect();
    vehicles.sort_unstable_by_key(|vehicle| vehicle.id);
    vehicles
}

/// Every live trip, cloned and ordered by id.
pub fn trips_by_id(world: &mut World) -> Vec<Trip> {
    let mut trips: Vec<Trip> = world.query::<&Trip>().iter(world).cloned().collect();
    trips.sort_unstable_by_key(|trip| trip.id);
    trips
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::FleetTarget;

    #[test]
    fn quiet_world_is_empty() {
        let mut world = create_test_world(quiet_params(6));
        assert!(vehicles_by_id(&mut world).is_empty());
        assert!(trips_by_id(&mut world).is_empty());
        assert_eq!(world.resource::<FleetTarget>().0, 0);
    }
}
