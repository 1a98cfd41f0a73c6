#![allow(dead_code)]

use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use sim_core::runner::{run_next_block, run_until_done, simulation_schedule};

/// Helper that owns a reusable `Schedule` so tests can step blocks or run to the end.
pub struct ScheduleRunner {
    schedule: Schedule,
}

impl Default for ScheduleRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleRunner {
    /// Create a runner with the default simulation schedule.
    pub fn new() -> Self {
        Self {
            schedule: simulation_schedule(),
        }
    }

    /// Run a single block (returns `true` if a block was processed).
    pub fn run_one(&mut self, world: &mut World) -> bool {
        run_next_block(world, &mut self.schedule)
    }

    /// Run up to `blocks` blocks, returning the number executed.
    pub fn run_blocks(&mut self, world: &mut World, blocks: u64) -> u64 {
        run_until_done(world, &mut self.schedule, blocks)
    }

    /// Drive the simulation until its configured end block.
    pub fn run_full(&mut self, world: &mut World) -> u64 {
        self.run_blocks(world, u64::MAX)
    }
}
