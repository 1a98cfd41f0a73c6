//! Run a mid-sized city with supply equilibration and print the summary.
//!
//! Run with: cargo run -p sim_core --example scenario_run

use bevy_ecs::prelude::World;
use sim_core::equilibration::EquilibrationConfig;
use sim_core::matching::{DispatchStrategy, ForwardDispatchPolicy};
use sim_core::pricing::PricingConfig;
use sim_core::runner::{run_until_done_with_hook, simulation_schedule};
use sim_core::scenario::{build_scenario, ScenarioParams};
use sim_core::summary::summarize;
use sim_core::telemetry::History;

fn main() {
    const CITY_SIZE: u32 = 24;
    const TIME_BLOCKS: u64 = 4_000;

    let params = ScenarioParams::default()
        .with_seed(123)
        .with_city_size(CITY_SIZE)
        .with_vehicle_count(60)
        .with_base_demand(6.0)
        .with_dispatch(DispatchStrategy::ForwardDispatch(ForwardDispatchPolicy::default()))
        .with_pricing(PricingConfig {
            price: 1.2,
            platform_commission: 0.25,
            reservation_wage: 0.45,
            ..PricingConfig::default()
        })
        .with_equilibration(EquilibrationConfig::supply(10))
        .with_windows(50, 1_000)
        .with_time_blocks(TIME_BLOCKS);

    let mut world = World::new();
    if let Err(error) = build_scenario(&mut world, params) {
        eprintln!("invalid scenario: {error}");
        std::process::exit(1);
    }

    let mut schedule = simulation_schedule();
    let blocks = run_until_done_with_hook(&mut world, &mut schedule, TIME_BLOCKS, |world, block| {
        if block % 500 == 0 {
            let smoothed = world.resource::<History>().smoothed();
            println!(
                "block {block:>5}  vehicles {:>6.1}  P1 {:.3}  P2 {:.3}  P3 {:.3}  wait {:.2}",
                smoothed.mean_vehicle_count,
                smoothed.idle_fraction,
                smoothed.dispatched_fraction,
                smoothed.occupied_fraction,
                smoothed.mean_wait_time,
            );
        }
    });

    let summary = summarize(&mut world);
    let results = &summary.results;
    println!("--- Scenario run ({CITY_SIZE}x{CITY_SIZE} city, {blocks} blocks, seed 123) ---");
    println!("Dispatch: {}", summary.dispatch);
    println!("Final fleet: {} (target {})", summary.final_vehicle_count, summary.fleet_target);
    println!("Completed trips per block: {:.3}", results.completion_rate);
    println!("Mean wait: {:.2} blocks, mean ride: {:.2} blocks", results.mean_wait_time, results.mean_ride_time);
    println!("Forward-dispatch fraction: {:.3}", results.forward_dispatch_fraction);
    println!("Driver utility: {:.4}", summary.driver_utility);
    println!(
        "Validation: phase sum {:.6}, busy-time ratio {:?}, dispatch-time ratio {:?}",
        summary.validation.phase_fraction_sum, summary.validation.busy_time_ratio, summary.validation.dispatch_time_ratio,
    );
}
