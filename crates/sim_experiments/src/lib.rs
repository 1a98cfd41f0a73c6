//! Parallel parameter sweeps over the ride-hailing fleet simulation.
//!
//! Runs many independent simulations with varying fleet size, demand, city
//! size, pricing and dispatch strategy, and collects one flat metrics row per
//! run for export and comparison.
//!
//! # Quick Start
//!
//! ```no_run
//! use sim_experiments::{run_parallel_experiments, export_to_csv, ParameterSpace};
//!
//! let space = ParameterSpace::grid()
//!     .vehicle_count(vec![10, 20, 40])
//!     .base_demand(vec![0.5, 1.0])
//!     .seeds(vec![1, 2, 3]);
//!
//! let parameter_sets = space.generate();
//! let results: Vec<_> = run_parallel_experiments(parameter_sets, None)
//!     .into_iter()
//!     .filter_map(Result::ok)
//!     .collect();
//! export_to_csv(&results, "sweep.csv").unwrap();
//! ```
//!
//! - [`parameters`]: parameter spaces (grid search, random sampling) and
//!   scenario files
//! - [`runner`]: parallel execution using rayon
//! - [`metrics`]: per-run metrics rows
//! - [`export`]: JSON, JSON lines and CSV output

pub mod export;
pub mod metrics;
pub mod parameters;
pub mod runner;

pub use export::{export_to_csv, export_to_json, export_to_jsonl};
pub use metrics::{find_best_result_index, SimulationResult};
pub use parameters::{load_scenario_params, ParameterSet, ParameterSpace};
pub use runner::{run_parallel_experiments, run_single_simulation};
