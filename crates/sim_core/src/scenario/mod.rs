//! Scenario setup: validated parameters, world construction and the
//! pending-change channel for parameters that may move during a run.

mod build;
mod changes;
mod error;
mod params;

pub use build::{build_scenario, new_vehicle, request_trip, spawn_vehicle};
pub use changes::PendingChanges;
pub use error::ScenarioError;
pub use params::{
    DemandConfig, FleetTarget, IdleMovementConfig, ScenarioParams, SimRng, TripLifecycleConfig,
};
pub(crate) use params::{
    validate_city_size, validate_dispatch, validate_equilibration, validate_non_negative, validate_pricing,
    validate_request_timeout, validate_trip_distance, validate_unit,
};
