//! End-of-run summary: results-window metrics, run totals and the
//! conservation checks between fleet phase time and passenger time.

use bevy_ecs::prelude::World;
use serde::{Deserialize, Serialize};

use crate::clock::SimulationClock;
use crate::ecs::Vehicle;
use crate::matching::DispatchConfig;
use crate::pricing::PricingConfig;
use crate::scenario::{DemandConfig, FleetTarget};
use crate::spatial::City;
use crate::telemetry::{History, RunTotals, SimTelemetry, WindowMetrics};

/// Identities that hold exactly over a long enough window: all three should
/// be close to 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    /// `P1 + P2 + P3` over the results window.
    pub phase_fraction_sum: f64,
    /// `n·P3 / (r·L)` over the results window; `None` before any completion.
    pub busy_time_ratio: Option<f64>,
    /// `n·P2 / (r·W)` over the results window.
    pub dispatch_time_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub blocks: u64,
    pub city_size: u32,
    pub dispatch: String,
    pub final_vehicle_count: usize,
    pub fleet_target: usize,
    pub effective_demand: f64,
    /// Driver utility at the results-window busy fraction.
    pub driver_utility: f64,
    pub results: WindowMetrics,
    pub totals: RunTotals,
    pub validation: ValidationMetrics,
}

/// Summarises a world built by [`crate::scenario::build_scenario`].
pub fn summarize(world: &mut World) -> RunSummary {
    let history = world.resource::<History>();
    let results = history.results();
    let window = RunTotals::from_stats(history.recent(history.results_window()));
    let validation = ValidationMetrics {
        phase_fraction_sum: results.phase_fraction_sum(),
        busy_time_ratio: window.busy_time_ratio(),
        dispatch_time_ratio: window.dispatch_time_ratio(),
    };
    let pricing = *world.resource::<PricingConfig>();
    let final_vehicle_count = world.query::<&Vehicle>().iter(world).count();

    RunSummary {
        blocks: world.resource::<SimulationClock>().now(),
        city_size: world.resource::<City>().size(),
        dispatch: world.resource::<DispatchConfig>().strategy.label().to_string(),
        final_vehicle_count,
        fleet_target: world.resource::<FleetTarget>().0,
        effective_demand: world.resource::<DemandConfig>().effective_demand,
        driver_utility: pricing.driver_utility(results.occupied_fraction),
        results,
        totals: world.resource::<SimTelemetry>().totals,
        validation,
    }
}
