//! Parallel simulation execution using rayon.
//!
//! Each run owns its own world and RNG, so runs are independent and the
//! result of a parameter set does not depend on how many run beside it.

use bevy_ecs::prelude::World;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use sim_core::runner::{run_until_done, simulation_schedule};
use sim_core::scenario::build_scenario;
use sim_core::summary::summarize;

use crate::metrics::SimulationResult;
use crate::parameters::ParameterSet;

/// Run a single simulation to its configured end block and extract metrics.
///
/// Fails only when the parameters do not describe a runnable scenario.
pub fn run_single_simulation(param_set: &ParameterSet) -> Result<SimulationResult, String> {
    let mut world = World::new();
    let params = param_set.params.clone();
    let time_blocks = params.time_blocks;

    build_scenario(&mut world, params)
        .map_err(|error| format!("{}/{}: {error}", param_set.experiment_id, param_set.run_id))?;

    let mut schedule = simulation_schedule();
    run_until_done(&mut world, &mut schedule, time_blocks);

    let summary = summarize(&mut world);
    Ok(SimulationResult::from_summary(param_set, &summary))
}

/// Run multiple simulations in parallel with a progress bar.
///
/// Results come back in the order of `parameter_sets`. `num_threads` of
/// `None` uses rayon's default pool size.
pub fn run_parallel_experiments(
    parameter_sets: Vec<ParameterSet>,
    num_threads: Option<usize>,
) -> Vec<Result<SimulationResult, String>> {
    run_parallel_experiments_with_progress(parameter_sets, num_threads, true)
}

pub fn run_parallel_experiments_with_progress(
    parameter_sets: Vec<ParameterSet>,
    num_threads: Option<usize>,
    show_progress: bool,
) -> Vec<Result<SimulationResult, String>> {
    let total = parameter_sets.len();
    let pb = if show_progress && total > 0 {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Some(bar)
    } else {
        None
    };

    let run_all = || -> Vec<Result<SimulationResult, String>> {
        parameter_sets
            .par_iter()
            .map(|param_set| {
                let result = run_single_simulation(param_set);
                if let Some(progress_bar) = &pb {
                    progress_bar.inc(1);
                }
                result
            })
            .collect()
    };

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = num_threads {
        builder = builder.num_threads(threads);
    }
    // Fall back to the global pool when a dedicated one cannot be built.
    let results = match builder.build() {
        Ok(pool) => pool.install(run_all),
        Err(_) => run_all(),
    };

    if let Some(progress_bar) = &pb {
        progress_bar.finish_with_message("Completed");
    }

    results
}
