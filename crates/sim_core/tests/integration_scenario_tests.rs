mod support;

use bevy_ecs::prelude::World;
use sim_core::clock::SimulationClock;
use sim_core::ecs::{Trip, TripPhase, Vehicle, VehiclePhase};
use sim_core::runner::{run_until_done_with_hook, simulation_schedule};
use sim_core::scenario::ScenarioParams;
use sim_core::spatial::{Direction, Location};
use sim_core::telemetry::{History, SimSnapshots, SimTelemetry};
use sim_core::test_helpers::{trips_by_id, vehicles_by_id};
use support::schedule::ScheduleRunner;
use support::world::TestWorldBuilder;

#[test]
fn empty_demand_keeps_every_vehicle_idle() {
    let mut world = TestWorldBuilder::new()
        .with_fleet(5)
        .with_demand(0.0)
        .with_time_blocks(50)
        .build();
    let mut schedule = simulation_schedule();

    let mut checked = 0;
    let blocks = run_until_done_with_hook(&mut world, &mut schedule, 1_000, |world, _| {
        let stats = world.resource::<History>().latest().copied().expect("recorded block");
        assert_eq!((stats.vehicles, stats.idle), (5, 5));
        assert_eq!(stats.events.requests, 0);
        checked += 1;
    });

    assert_eq!(blocks, 50);
    assert_eq!(checked, 50);
    assert!(trips_by_id(&mut world).is_empty());
    let totals = world.resource::<SimTelemetry>().totals;
    assert_eq!(totals.idle_blocks, 250);
    assert_eq!(totals.events.requests, 0);
}

#[test]
fn zero_fleet_cancels_every_request_on_timeout() {
    let mut world = TestWorldBuilder::new()
        .with_fleet(0)
        .with_demand(1.0)
        .with_request_timeout(Some(10))
        .with_time_blocks(20)
        .build();
    let mut schedule = simulation_schedule();

    run_until_done_with_hook(&mut world, &mut schedule, 1_000, |world, block| {
        let snapshot = world.resource::<SimSnapshots>().latest().expect("snapshot").clone();
        assert_eq!(snapshot.block, block);
        for trip in &snapshot.trips {
            match trip.phase {
                TripPhase::Unassigned => assert!(block - trip.requested_at < 10),
                TripPhase::Cancelled => assert_eq!(trip.cancelled_at, Some(trip.requested_at + 10)),
                phase => panic!("trip {:?} reached {phase:?} without a fleet", trip.id),
            }
        }
    });

    let totals = world.resource::<SimTelemetry>().totals;
    assert_eq!(totals.events.requests, 20);
    assert_eq!(totals.events.cancellations, 10);
    assert_eq!(totals.events.assignments, 0);
}

#[test]
fn single_vehicle_serves_single_trip() {
    let (mut world, vehicles, trips) = TestWorldBuilder::new()
        .with_city_size(4)
        .with_vehicle(0, 0, Direction::East)
        .with_trip((2, 0), (3, 1))
        .build_with_entities();
    let (vehicle, trip) = (vehicles[0], trips[0]);
    let mut runner = ScheduleRunner::new();

    let state = |world: &World| {
        let vehicle = world.get::<Vehicle>(vehicle).expect("vehicle").clone();
        let trip = world.get::<Trip>(trip).expect("trip").clone();
        (vehicle, trip)
    };

    assert!(runner.run_one(&mut world));
    let (v, t) = state(&world);
    assert_eq!((v.phase(), v.location), (VehiclePhase::Dispatched, Location::new(1, 0)));
    assert_eq!((t.phase(), t.assigned_at), (TripPhase::Waiting, Some(0)));

    assert!(runner.run_one(&mut world));
    let (v, t) = state(&world);
    assert_eq!((v.phase(), v.location), (VehiclePhase::Occupied, Location::new(2, 0)));
    assert_eq!((t.phase(), t.picked_up_at), (TripPhase::Riding, Some(1)));

    assert!(runner.run_one(&mut world));
    let (v, _) = state(&world);
    assert_eq!((v.phase(), v.location), (VehiclePhase::Occupied, Location::new(3, 0)));

    assert!(runner.run_one(&mut world));
    let (v, t) = state(&world);
    assert_eq!((v.phase(), v.location), (VehiclePhase::Idle, Location::new(3, 1)));
    assert_eq!(t.phase(), TripPhase::Completed);
    assert_eq!(t.completed_at, Some(3));
    assert_eq!(t.ride_time(), Some(u64::from(t.distance)));

    let totals = world.resource::<SimTelemetry>().totals;
    assert_eq!(totals.dispatched_blocks, 1);
    assert_eq!(totals.occupied_blocks, 2);
    assert_eq!(totals.events.wait_blocks, 1);
    assert_eq!(totals.events.ride_blocks, 2);
}

#[test]
fn retired_trips_are_collected_after_retention() {
    let (mut world, _, trips) = TestWorldBuilder::new()
        .with_city_size(4)
        .with_vehicle(0, 0, Direction::East)
        .with_trip((2, 0), (3, 1))
        .build_with_entities();
    let mut runner = ScheduleRunner::new();

    // Completed in block 3, retained through block 4.
    runner.run_blocks(&mut world, 5);
    assert!(world.get::<Trip>(trips[0]).is_some());
    runner.run_one(&mut world);
    assert!(world.get::<Trip>(trips[0]).is_none());
    assert_eq!(world.resource::<SimulationClock>().now(), 6);
}

fn snapshot_json(params: ScenarioParams) -> String {
    let mut world = TestWorldBuilder::from_params(params).build();
    ScheduleRunner::new().run_full(&mut world);
    let snapshots = world.resource::<SimSnapshots>();
    assert_eq!(snapshots.snapshots.len(), 150);
    serde_json::to_string(&snapshots.snapshots).expect("serialize snapshots")
}

#[test]
fn identical_seeds_reproduce_identical_snapshots() {
    let params = ScenarioParams::default()
        .with_city_size(12)
        .with_vehicle_count(15)
        .with_base_demand(1.5)
        .with_request_timeout(Some(30))
        .with_time_blocks(150)
        .with_seed(7);

    let first = snapshot_json(params.clone());
    let second = snapshot_json(params.clone());
    assert_eq!(first, second);

    let other = snapshot_json(params.with_seed(8));
    assert_ne!(first, other);
}

#[test]
fn vehicles_stay_on_the_grid() {
    let mut world = TestWorldBuilder::new()
        .with_city_size(9)
        .with_fleet(12)
        .with_demand(1.0)
        .with_time_blocks(100)
        .build();
    ScheduleRunner::new().run_full(&mut world);
    let city_size = 9;
    for vehicle in vehicles_by_id(&mut world) {
        assert!(vehicle.location.x < city_size && vehicle.location.y < city_size);
    }
}
