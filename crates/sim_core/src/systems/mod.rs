//! Per-block systems, in the order [`crate::runner::simulation_schedule`]
//! chains them.

pub mod parameter_changes;
pub mod fleet;
pub mod demand;
pub mod request_timeout;
pub mod dispatch;
pub mod movement;
pub mod equilibration;
pub mod garbage_collection;
pub mod history;
pub mod telemetry_snapshot;
