//! Moves every vehicle one block and handles arrivals.
//!
//! A vehicle that reaches its target (or starts the block on it) changes
//! phase in that block: a pickup or a drop-off uses up the block, so a
//! vehicle never picks up and starts driving in the same block.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut};

use crate::clock::SimulationClock;
use crate::ecs::{Trip, Vehicle, VehicleId, VehicleState};
use crate::scenario::{IdleMovementConfig, SimRng};
use crate::spatial::City;
use crate::telemetry::SimTelemetry;

pub fn movement_system(
    clock: Res<SimulationClock>,
    city: Res<City>,
    idle_movement: Res<IdleMovementConfig>,
    mut rng: ResMut<SimRng>,
    mut telemetry: ResMut<SimTelemetry>,
    mut vehicles: Query<(Entity, &mut Vehicle)>,
    mut trips: Query<&mut Trip>,
) {
    let now = clock.now();
    // Id order keeps random draws reproducible.
    let mut order: Vec<(VehicleId, Entity)> = vehicles.iter().map(|(entity, vehicle)| (vehicle.id, entity)).collect();
    order.sort_unstable();

    for (_, entity) in order {
        let Ok((_, mut vehicle)) = vehicles.get_mut(entity) else {
            continue;
        };
        match vehicle.state() {
            VehicleState::Idle => vehicle.wander(&city, idle_movement.turn_probability, &mut rng.0),
            VehicleState::Dispatched { trip } => {
                let Ok(mut trip) = trips.get_mut(trip) else {
                    continue;
                };
                let origin = trip.origin;
                if vehicle.location == origin || vehicle.advance_toward(&city, origin) {
                    vehicle.pick_up();
                    telemetry.current.wait_blocks += trip.pick_up(now);
                }
            }
            VehicleState::Occupied { trip } => {
                let Ok(mut trip) = trips.get_mut(trip) else {
                    continue;
                };
                let destination = trip.destination;
                if vehicle.location == destination || vehicle.advance_toward(&city, destination) {
                    vehicle.drop_off();
                    trip.complete(now);
                    let events = &mut telemetry.current;
                    events.completions += 1;
                    events.unassigned_blocks += trip.unassigned_time();
                    events.ride_blocks += trip.ride_time().unwrap_or(0);
                    events.trip_distance += u64::from(trip.distance);
                }
            }
        }
    }
}
