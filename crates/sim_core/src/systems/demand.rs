//! Trip requests for the current block.

use bevy_ecs::prelude::{Commands, Res, ResMut};
use rand::Rng;

use crate::clock::SimulationClock;
use crate::ecs::{IdAllocator, Trip};
use crate::scenario::{DemandConfig, SimRng};
use crate::spatial::City;
use crate::telemetry::SimTelemetry;

/// Number of requests arriving in one block at `rate` expected requests per
/// block: the integer part always arrives, the fractional part arrives with
/// that probability.
pub fn requests_this_block<R: Rng + ?Sized>(rate: f64, rng: &mut R) -> u64 {
    if rate <= 0.0 {
        return 0;
    }
    let whole = rate.floor();
    let fraction = rate - whole;
    let extra = fraction > 0.0 && rng.gen_bool(fraction);
    whole as u64 + u64::from(extra)
}

pub fn demand_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    city: Res<City>,
    demand: Res<DemandConfig>,
    mut rng: ResMut<SimRng>,
    mut ids: ResMut<IdAllocator>,
    mut telemetry: ResMut<SimTelemetry>,
) {
    let now = clock.now();
    let requests = requests_this_block(demand.effective_demand, &mut rng.0);
    for _ in 0..requests {
        let origin = city.sample_location(&mut rng.0);
        let destination = city.sample_trip_destination(&mut rng.0, origin);
        let distance = city.distance(origin, destination);
        commands.spawn(Trip::new(ids.next_trip(), origin, destination, distance, now));
    }
    telemetry.current.requests += requests;
}
