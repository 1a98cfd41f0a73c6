//! Simulation runner: one schedule run per block, then the clock advances.
//!
//! Clock progression happens here, outside systems. Every system reads the
//! block being processed from [SimulationClock]; once the schedule has run,
//! [run_next_block] moves the clock to the next block.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::clock::{SimulationClock, SimulationEndBlock, StopRequested};
use crate::equilibration::EquilibrationConfig;
use crate::systems::{
    demand::demand_system, dispatch::dispatch_system, equilibration::equilibration_system,
    fleet::reconcile_fleet_system, garbage_collection::garbage_collection_system,
    history::record_history_system, movement::movement_system,
    parameter_changes::apply_pending_changes_system, request_timeout::request_timeout_system,
    telemetry_snapshot::capture_snapshot_system,
};
use crate::telemetry::{SimSnapshotConfig, SimSnapshots};

/// Condition: an equilibration step falls in the current block.
fn is_equilibration_due(clock: Option<Res<SimulationClock>>, config: Option<Res<EquilibrationConfig>>) -> bool {
    match (clock, config) {
        (Some(clock), Some(config)) => config.is_due(clock.now()),
        _ => false,
    }
}

/// Condition: snapshots are enabled and the capture interval has elapsed.
fn should_capture_snapshot(
    clock: Option<Res<SimulationClock>>,
    config: Option<Res<SimSnapshotConfig>>,
    snapshots: Option<Res<SimSnapshots>>,
) -> bool {
    let Some(clock) = clock else {
        return false;
    };
    let Some(config) = config else {
        return false;
    };
    let Some(snapshots) = snapshots else {
        return false;
    };
    if !config.enabled {
        return false;
    }

    match snapshots.last_snapshot_at {
        None => true,
        Some(last) => clock.since(last) >= config.interval.max(1),
    }
}

/// Whether the run is over: the end block has been reached or a stop was
/// requested.
pub fn is_finished(world: &World) -> bool {
    let stopped = world.get_resource::<StopRequested>().is_some_and(|stop| stop.0);
    let now = world.get_resource::<SimulationClock>().map_or(0, |clock| clock.now());
    let ended = world
        .get_resource::<SimulationEndBlock>()
        .is_some_and(|end| now >= end.0);
    stopped || ended
}

/// Runs one block and advances the clock. Returns `false` without running
/// anything once the run is finished (see [is_finished]).
pub fn run_next_block(world: &mut World, schedule: &mut Schedule) -> bool {
    run_next_block_with_hook(world, schedule, |_, _| {})
}

/// Runs one block and invokes `hook` with the world and the block index after
/// the schedule completes, before the clock advances.
pub fn run_next_block_with_hook<F>(world: &mut World, schedule: &mut Schedule, mut hook: F) -> bool
where
    F: FnMut(&World, u64),
{
    if is_finished(world) {
        return false;
    }
    let block = world.resource::<SimulationClock>().now();
    schedule.run(world);
    hook(world, block);
    world.resource_mut::<SimulationClock>().advance();
    true
}

/// Runs blocks until the run is finished or `max_blocks` have run.
/// Returns the number of blocks executed.
pub fn run_until_done(world: &mut World, schedule: &mut Schedule, max_blocks: u64) -> u64 {
    run_until_done_with_hook(world, schedule, max_blocks, |_, _| {})
}

/// Runs blocks until done and invokes `hook` after each block.
pub fn run_until_done_with_hook<F>(world: &mut World, schedule: &mut Schedule, max_blocks: u64, mut hook: F) -> u64
where
    F: FnMut(&World, u64),
{
    let mut blocks = 0;
    while blocks < max_blocks && run_next_block_with_hook(world, schedule, &mut hook) {
        blocks += 1;
    }
    blocks
}

/// Builds the per-block schedule. Systems run strictly in this order;
/// [apply_deferred] makes vehicles and trips spawned earlier in the block
/// visible to the systems after it.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.add_systems(
        (
            apply_pending_changes_system,
            reconcile_fleet_system,
            demand_system,
            apply_deferred,
            request_timeout_system,
            dispatch_system,
            movement_system,
            equilibration_system.run_if(is_equilibration_due),
            garbage_collection_system,
            apply_deferred,
            record_history_system,
            capture_snapshot_system.run_if(should_capture_snapshot),
        )
            .chain(),
    );

    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{build_scenario, ScenarioParams};

    #[test]
    fn runs_exactly_the_configured_blocks() {
        let mut world = World::new();
        build_scenario(&mut world, ScenarioParams::default().with_time_blocks(12)).expect("valid params");
        let mut schedule = simulation_schedule();

        let mut seen = Vec::new();
        let blocks = run_until_done_with_hook(&mut world, &mut schedule, 100, |_, block| seen.push(block));
        assert_eq!(blocks, 12);
        assert_eq!(seen, (0..12).collect::<Vec<_>>());
        assert!(is_finished(&world));
        assert!(!run_next_block(&mut world, &mut schedule));
    }

    #[test]
    fn stop_request_is_terminal() {
        let mut world = World::new();
        build_scenario(&mut world, ScenarioParams::default()).expect("valid params");
        let mut schedule = simulation_schedule();

        assert!(run_next_block(&mut world, &mut schedule));
        world.resource_mut::<StopRequested>().0 = true;
        assert!(!run_next_block(&mut world, &mut schedule));
        assert_eq!(world.resource::<SimulationClock>().now(), 1);
    }
}
