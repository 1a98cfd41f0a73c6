//! Example: sweep fleet size against demand and compare dispatch strategies.
//!
//! Pass a JSON scenario file as the first argument to change the base
//! parameters; every field left out keeps its default.

use sim_core::matching::{DispatchStrategy, ForwardDispatchPolicy};
use sim_core::scenario::ScenarioParams;
use sim_experiments::{
    export_to_csv, export_to_jsonl, find_best_result_index, load_scenario_params, run_parallel_experiments,
    ParameterSpace, SimulationResult,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base = match std::env::args().nth(1) {
        Some(path) => load_scenario_params(path)?,
        None => ScenarioParams::default()
            .with_city_size(16)
            .with_time_blocks(2_000)
            .with_windows(20, 1_000),
    };

    let space = ParameterSpace::grid()
        .with_base(base)
        .vehicle_count(vec![10, 20, 40, 80])
        .base_demand(vec![0.5, 1.0, 2.0])
        .dispatch(vec![
            DispatchStrategy::NearestAvailable,
            DispatchStrategy::ForwardDispatch(ForwardDispatchPolicy::default()),
        ])
        .seeds(vec![1, 2, 3]);

    let parameter_sets = space.generate();
    println!("Running {} simulations...", parameter_sets.len());

    let mut results: Vec<SimulationResult> = Vec::with_capacity(parameter_sets.len());
    for outcome in run_parallel_experiments(parameter_sets, None) {
        match outcome {
            Ok(result) => results.push(result),
            Err(error) => eprintln!("skipped run: {error}"),
        }
    }
    println!("Completed {} simulations", results.len());

    println!(
        "\n{:<10} {:<18} {:>8} {:>8} {:>6} {:>6} {:>6} {:>8} {:>8}",
        "experiment", "dispatch", "vehicles", "demand", "P1", "P2", "P3", "wait", "utility"
    );
    for result in results.iter().filter(|result| result.run_id == 0) {
        println!(
            "{:<10} {:<18} {:>8} {:>8.2} {:>6.3} {:>6.3} {:>6.3} {:>8.2} {:>8.3}",
            result.experiment_id,
            result.dispatch,
            result.initial_vehicle_count,
            result.base_demand,
            result.idle_fraction,
            result.dispatched_fraction,
            result.occupied_fraction,
            result.mean_wait_time,
            result.driver_utility,
        );
    }

    if let Some(best) = find_best_result_index(&results) {
        let best = &results[best];
        println!(
            "\nBest driver utility: {:.3} ({} vehicles, demand {:.2}, {})",
            best.driver_utility, best.initial_vehicle_count, best.base_demand, best.dispatch
        );
    }

    export_to_csv(&results, "experiment_results.csv")?;
    export_to_jsonl(&results, "experiment_results.jsonl")?;
    println!("\nExported to experiment_results.csv and experiment_results.jsonl");

    Ok(())
}
