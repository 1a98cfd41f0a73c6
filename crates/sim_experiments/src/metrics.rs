//! Metrics extraction from completed simulation runs.
//!
//! A [SimulationResult] is one flat row: the swept parameters of the run next
//! to its results-window metrics, run totals and validation ratios.

use serde::{Deserialize, Serialize};
use sim_core::summary::RunSummary;

use crate::parameters::ParameterSet;

/// Aggregated metrics from a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub experiment_id: String,
    pub run_id: usize,
    pub seed: u64,

    // Swept parameters.
    pub city_size: u32,
    pub initial_vehicle_count: usize,
    pub base_demand: f64,
    pub price: f64,
    pub platform_commission: f64,
    pub reservation_wage: f64,
    pub dispatch: String,

    pub blocks: u64,
    pub final_vehicle_count: usize,
    pub effective_demand: f64,

    // Results window.
    pub mean_vehicle_count: f64,
    pub idle_fraction: f64,
    pub dispatched_fraction: f64,
    pub occupied_fraction: f64,
    pub request_rate: f64,
    pub completion_rate: f64,
    pub mean_wait_time: f64,
    pub mean_ride_time: f64,
    pub mean_trip_distance: f64,
    pub forward_dispatch_fraction: f64,
    pub cancellation_fraction: f64,
    /// Driver income per block less the reservation wage.
    pub driver_utility: f64,
    /// Platform commission per block across the fleet.
    pub platform_revenue_rate: f64,

    // Whole run.
    pub total_requests: u64,
    pub total_completions: u64,
    pub total_cancellations: u64,

    pub phase_fraction_sum: f64,
    pub busy_time_ratio: Option<f64>,
    pub dispatch_time_ratio: Option<f64>,
}

impl SimulationResult {
    /// Combines the swept parameters of `set` with the run's summary.
    pub fn from_summary(set: &ParameterSet, summary: &RunSummary) -> Self {
        let params = &set.params;
        let results = &summary.results;
        let events = &summary.totals.events;
        let platform_revenue_rate =
            params.pricing.price * params.pricing.platform_commission * results.occupied_fraction * results.mean_vehicle_count;

        Self {
            experiment_id: set.experiment_id.clone(),
            run_id: set.run_id,
            seed: params.seed,
            city_size: params.city_size,
            initial_vehicle_count: params.vehicle_count,
            base_demand: params.base_demand,
            price: params.pricing.price,
            platform_commission: params.pricing.platform_commission,
            reservation_wage: params.pricing.reservation_wage,
            dispatch: summary.dispatch.clone(),
            blocks: summary.blocks,
            final_vehicle_count: summary.final_vehicle_count,
            effective_demand: summary.effective_demand,
            mean_vehicle_count: results.mean_vehicle_count,
            idle_fraction: results.idle_fraction,
            dispatched_fraction: results.dispatched_fraction,
            occupied_fraction: results.occupied_fraction,
            request_rate: results.request_rate,
            completion_rate: results.completion_rate,
            mean_wait_time: results.mean_wait_time,
            mean_ride_time: results.mean_ride_time,
            mean_trip_distance: results.mean_trip_distance,
            forward_dispatch_fraction: results.forward_dispatch_fraction,
            cancellation_fraction: results.cancellation_fraction,
            driver_utility: summary.driver_utility,
            platform_revenue_rate,
            total_requests: events.requests,
            total_completions: events.completions,
            total_cancellations: events.cancellations,
            phase_fraction_sum: summary.validation.phase_fraction_sum,
            busy_time_ratio: summary.validation.busy_time_ratio,
            dispatch_time_ratio: summary.validation.dispatch_time_ratio,
        }
    }

    /// Fraction of requests in the whole run that ended in a completed trip.
    pub fn completion_fraction(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_completions as f64 / self.total_requests as f64
        }
    }
}

/// Index of the result with the highest driver utility among runs whose
/// fleet did not collapse to zero.
pub fn find_best_result_index(results: &[SimulationResult]) -> Option<usize> {
    results
        .iter()
        .enumerate()
        .filter(|(_, result)| result.final_vehicle_count > 0)
        .max_by(|(_, a), (_, b)| a.driver_utility.total_cmp(&b.driver_utility))
        .map(|(index, _)| index)
}
