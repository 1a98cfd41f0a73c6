//! Dispatch system: gathers UNASSIGNED trips and eligible vehicles, plans
//! the matching and applies the decisions in order.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut};
use tracing::trace;

use crate::clock::SimulationClock;
use crate::ecs::{Trip, TripPhase, Vehicle, VehicleState};
use crate::matching::{plan_dispatch, Candidate, Decision, DispatchConfig, DispatchRequest, EnRouteCandidate};
use crate::scenario::SimRng;
use crate::spatial::{City, SpatialIndex};
use crate::telemetry::SimTelemetry;

fn candidate(entity: Entity, vehicle: &Vehicle) -> Candidate {
    Candidate {
        entity,
        id: vehicle.id,
        location: vehicle.location,
        heading: vehicle.heading,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn dispatch_system(
    clock: Res<SimulationClock>,
    city: Res<City>,
    config: Res<DispatchConfig>,
    mut index: ResMut<SpatialIndex>,
    mut rng: ResMut<SimRng>,
    mut telemetry: ResMut<SimTelemetry>,
    mut vehicles: Query<(Entity, &mut Vehicle)>,
    mut trips: Query<(Entity, &mut Trip)>,
) {
    let mut requests: Vec<DispatchRequest> = trips
        .iter()
        .filter(|(_, trip)| trip.phase() == TripPhase::Unassigned)
        .map(|(entity, trip)| DispatchRequest {
            trip: entity,
            id: trip.id,
            origin: trip.origin,
        })
        .collect();
    if requests.is_empty() {
        return;
    }
    requests.sort_unstable_by_key(|request| request.id);

    let forward = config.strategy.uses_forward_dispatch();
    let mut idle = Vec::new();
    let mut en_route = Vec::new();
    for (entity, vehicle) in &vehicles {
        match vehicle.state() {
            VehicleState::Idle => idle.push(candidate(entity, vehicle)),
            VehicleState::Dispatched { trip } if forward && vehicle.can_forward_dispatch() => {
                let Ok((_, current)) = trips.get(trip) else {
                    continue;
                };
                en_route.push(EnRouteCandidate {
                    vehicle: candidate(entity, vehicle),
                    current: DispatchRequest {
                        trip,
                        id: current.id,
                        origin: current.origin,
                    },
                });
            }
            _ => {}
        }
    }

    let decisions = plan_dispatch(&config, &city, &mut index, &mut rng.0, requests, idle, en_route);

    let now = clock.now();
    for decision in decisions {
        let Ok((_, mut vehicle)) = vehicles.get_mut(decision.vehicle()) else {
            continue;
        };
        match decision {
            Decision::Assign {
                trip: trip_entity,
                vehicle: vehicle_entity,
                distance,
            } => {
                let Ok((_, mut trip)) = trips.get_mut(trip_entity) else {
                    continue;
                };
                vehicle.dispatch(trip_entity);
                trip.assign(vehicle_entity, now);
                trace!(trip = ?trip.id, vehicle = ?vehicle.id, distance, "dispatched");
            }
            Decision::Redirect {
                trip: trip_entity,
                vehicle: vehicle_entity,
                released,
                distance,
            } => {
                let previous = vehicle.redirect(trip_entity);
                debug_assert_eq!(previous, released);
                if let Ok((_, mut released)) = trips.get_mut(released) {
                    telemetry.current.wait_blocks += released.release(now);
                }
                let Ok((_, mut trip)) = trips.get_mut(trip_entity) else {
                    continue;
                };
                trip.assign(vehicle_entity, now);
                telemetry.current.forward_dispatches += 1;
                trace!(trip = ?trip.id, vehicle = ?vehicle.id, distance, "forward dispatched");
            }
        }
        telemetry.current.assignments += 1;
    }
}
