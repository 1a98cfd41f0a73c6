//! End-of-block bookkeeping: phase counts plus the block's events become one
//! [`BlockStats`] record.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::SimulationClock;
use crate::ecs::{Trip, TripPhase, Vehicle};
use crate::telemetry::{BlockStats, History, SimTelemetry};

pub fn record_history_system(
    clock: Res<SimulationClock>,
    mut telemetry: ResMut<SimTelemetry>,
    mut history: ResMut<History>,
    vehicles: Query<&Vehicle>,
    trips: Query<&Trip>,
) {
    let mut stats = BlockStats {
        block: clock.now(),
        unassigned_trips: trips
            .iter()
            .filter(|trip| trip.phase() == TripPhase::Unassigned)
            .count() as u64,
        events: std::mem::take(&mut telemetry.current),
        ..BlockStats::default()
    };
    for vehicle in &vehicles {
        stats.count_vehicle(vehicle.phase());
    }
    telemetry.totals.record(&stats);
    history.push(stats);
}
