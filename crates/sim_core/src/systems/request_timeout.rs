//! Expiry of trips nobody was dispatched to.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::SimulationClock;
use crate::ecs::{Trip, TripPhase};
use crate::scenario::TripLifecycleConfig;
use crate::telemetry::SimTelemetry;

/// Cancels UNASSIGNED trips whose time spent UNASSIGNED has reached the
/// request timeout. A trip released by forward dispatch starts a fresh
/// stretch. Trips that already have a vehicle on the way are left alone.
pub fn request_timeout_system(
    clock: Res<SimulationClock>,
    lifecycle: Res<TripLifecycleConfig>,
    mut telemetry: ResMut<SimTelemetry>,
    mut trips: Query<&mut Trip>,
) {
    let Some(timeout) = lifecycle.request_timeout_blocks else {
        return;
    };
    let now = clock.now();
    for mut trip in &mut trips {
        if trip.phase() == TripPhase::Unassigned && trip.unassigned_for(now) >= timeout {
            trip.cancel(now);
            telemetry.current.cancellations += 1;
        }
    }
}
