use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::SimulationClock;
use crate::ecs::{Trip, Vehicle};
use crate::scenario::{DemandConfig, FleetTarget};
use crate::spatial::City;
use crate::telemetry::{
    validate_block_snapshot, BlockSnapshot, History, SimSnapshotConfig, SimSnapshots, TripSnapshot,
    VehicleSnapshot,
};

#[allow(clippy::too_many_arguments)]
pub fn capture_snapshot_system(
    clock: Res<SimulationClock>,
    config: Res<SimSnapshotConfig>,
    mut snapshots: ResMut<SimSnapshots>,
    history: Res<History>,
    city: Res<City>,
    target: Res<FleetTarget>,
    demand: Res<DemandConfig>,
    vehicle_query: Query<&Vehicle>,
    trip_query: Query<&Trip>,
) {
    let mut vehicles: Vec<VehicleSnapshot> = vehicle_query
        .iter()
        .map(|vehicle| VehicleSnapshot {
            id: vehicle.id,
            location: vehicle.location,
            heading: vehicle.heading,
            phase: vehicle.phase(),
            trip: vehicle.trip().and_then(|entity| trip_query.get(entity).ok()).map(|trip| trip.id),
        })
        .collect();
    vehicles.sort_unstable_by_key(|vehicle| vehicle.id);

    let mut trips: Vec<TripSnapshot> = trip_query
        .iter()
        .map(|trip| TripSnapshot {
            id: trip.id,
            origin: trip.origin,
            destination: trip.destination,
            distance: trip.distance,
            phase: trip.phase(),
            vehicle: trip.vehicle().and_then(|entity| vehicle_query.get(entity).ok()).map(|vehicle| vehicle.id),
            requested_at: trip.requested_at,
            assigned_at: trip.assigned_at,
            picked_up_at: trip.picked_up_at,
            completed_at: trip.completed_at,
            cancelled_at: trip.cancelled_at,
            wait_time: trip.wait_time(),
            unassigned_time: trip.unassigned_time(),
        })
        .collect();
    trips.sort_unstable_by_key(|trip| trip.id);

    let snapshot = BlockSnapshot {
        block: clock.now(),
        city_size: city.size(),
        fleet_target: target.0,
        effective_demand: demand.effective_demand,
        stats: history.latest().copied().unwrap_or_default(),
        smoothed: history.smoothed(),
        vehicles,
        trips,
    };
    debug_assert_eq!(validate_block_snapshot(&snapshot), None);
    snapshots.push(snapshot, config.max_snapshots);
}
