use bevy_ecs::prelude::{Entity, World};
use rand::Rng;
use tracing::info;

use crate::clock::{SimulationClock, SimulationEndBlock, StopRequested};
use crate::ecs::{IdAllocator, Trip, Vehicle};
use crate::scenario::changes::PendingChanges;
use crate::scenario::error::ScenarioError;
use crate::scenario::params::{
    DemandConfig, FleetTarget, IdleMovementConfig, ScenarioParams, SimRng, TripLifecycleConfig,
};
use crate::spatial::{City, Direction, Location, SpatialIndex};
use crate::telemetry::{History, SimSnapshots, SimTelemetry};

/// Validates `params` and populates `world` with every resource and the
/// initial fleet. Nothing is inserted when validation fails.
pub fn build_scenario(world: &mut World, params: ScenarioParams) -> Result<(), ScenarioError> {
    params.validate()?;

    let city = City::new(params.city_size)
        .with_inhomogeneity(params.inhomogeneity, params.inhomogeneous_destinations)
        .with_trip_distance(params.min_trip_distance, params.max_trip_distance);

    world.insert_resource(SimulationClock::default());
    world.insert_resource(SimulationEndBlock(params.time_blocks));
    world.insert_resource(StopRequested::default());
    world.insert_resource(SimTelemetry::default());
    world.insert_resource(History::new(params.smoothing_window, params.results_window));
    world.insert_resource(params.snapshots);
    world.insert_resource(SimSnapshots::default());
    world.insert_resource(SpatialIndex::default());
    world.insert_resource(params.dispatch_config());
    world.insert_resource(params.pricing);
    world.insert_resource(DemandConfig::new(params.base_demand, &params.pricing));
    world.insert_resource(params.equilibration);
    world.insert_resource(IdleMovementConfig {
        turn_probability: params.idle_turn_probability,
    });
    world.insert_resource(TripLifecycleConfig {
        request_timeout_blocks: params.request_timeout_blocks,
        retention_blocks: params.trip_retention_blocks,
    });
    world.insert_resource(FleetTarget(params.vehicle_count));
    world.insert_resource(PendingChanges::default());

    let mut rng = SimRng::seeded(params.seed);
    let mut ids = IdAllocator::default();
    for _ in 0..params.vehicle_count {
        world.spawn(new_vehicle(&city, &mut ids, &mut rng.0));
    }

    info!(
        city_size = params.city_size,
        vehicles = params.vehicle_count,
        base_demand = params.base_demand,
        dispatch = params.dispatch.label(),
        seed = params.seed,
        "scenario built"
    );

    world.insert_resource(rng);
    world.insert_resource(ids);
    world.insert_resource(city);
    Ok(())
}

/// An IDLE vehicle at a uniformly random intersection and heading.
pub fn new_vehicle<R: Rng + ?Sized>(city: &City, ids: &mut IdAllocator, rng: &mut R) -> Vehicle {
    let location = city.uniform_location(rng);
    let heading = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
    Vehicle::new(ids.next_vehicle(), location, heading)
}

/// Places an IDLE vehicle by hand. The fleet target grows with it so the
/// reconciler keeps it.
pub fn spawn_vehicle(world: &mut World, location: Location, heading: Direction) -> Entity {
    let location = world.resource::<City>().wrap(location);
    let id = world.resource_mut::<IdAllocator>().next_vehicle();
    world.resource_mut::<FleetTarget>().0 += 1;
    world.spawn(Vehicle::new(id, location, heading)).id()
}

/// Requests a trip by hand in the current block.
pub fn request_trip(world: &mut World, origin: Location, destination: Location) -> Entity {
    let city = world.resource::<City>();
    let (origin, destination) = (city.wrap(origin), city.wrap(destination));
    let distance = city.distance(origin, destination);
    let now = world.resource::<SimulationClock>().now();
    let id = world.resource_mut::<IdAllocator>().next_trip();
    world.resource_mut::<SimTelemetry>().current.requests += 1;
    world.spawn(Trip::new(id, origin, destination, distance, now)).id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::VehiclePhase;

    #[test]
    fn build_spawns_initial_idle_fleet() {
        let mut world = World::new();
        let params = ScenarioParams::default().with_vehicle_count(7).with_seed(3);
        build_scenario(&mut world, params).expect("valid params");

        let mut query = world.query::<&Vehicle>();
        let vehicles: Vec<_> = query.iter(&world).collect();
        assert_eq!(vehicles.len(), 7);
        assert!(vehicles.iter().all(|vehicle| vehicle.phase() == VehiclePhase::Idle));
        let city = world.resource::<City>();
        assert!(vehicles.iter().all(|vehicle| city.contains(vehicle.location)));
        assert_eq!(world.resource::<FleetTarget>().0, 7);
    }

    #[test]
    fn invalid_params_build_nothing() {
        let mut world = World::new();
        let result = build_scenario(&mut world, ScenarioParams::default().with_city_size(0));
        assert_eq!(result, Err(ScenarioError::CitySize(0)));
        assert!(world.get_resource::<City>().is_none());
        assert!(world.get_resource::<SimulationClock>().is_none());
    }

    #[test]
    fn manual_placement_wraps_into_city() {
        let mut world = World::new();
        build_scenario(&mut world, ScenarioParams::default().with_city_size(4).with_vehicle_count(0))
            .expect("valid params");
        let vehicle = spawn_vehicle(&mut world, Location::new(5, 1), Direction::East);
        let trip = request_trip(&mut world, Location::new(1, 1), Location::new(7, 1));
        assert_eq!(world.get::<Vehicle>(vehicle).map(|v| v.location), Some(Location::new(1, 1)));
        let trip = world.get::<Trip>(trip).expect("trip spawned");
        assert_eq!(trip.destination, Location::new(3, 1));
        assert_eq!(trip.distance, 2);
        assert_eq!(world.resource::<FleetTarget>().0, 1);
    }
}
