use bevy_ecs::prelude::Resource;

/// Discrete simulation clock. One tick is one block: the time a vehicle needs
/// to drive between two neighbouring intersections.
///
/// `now()` is the index of the block currently being processed; the runner
/// advances it once every system of the block has run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Resource)]
pub struct SimulationClock {
    now: u64,
}

impl SimulationClock {
    pub fn starting_at(block: u64) -> Self {
        Self { now: block }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn advance(&mut self) {
        self.now += 1;
    }

    /// Blocks elapsed since `earlier` (zero if `earlier` lies in the future).
    pub fn since(&self, earlier: u64) -> u64 {
        self.now.saturating_sub(earlier)
    }
}

/// Number of blocks in the run. The runner stops once the clock reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Resource)]
pub struct SimulationEndBlock(pub u64);

/// Set by an external controller to stop the run between blocks.
/// Stopping is terminal: the runner never resumes once this is set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Resource)]
pub struct StopRequested(pub bool);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_advances_one_block_at_a_time() {
        let mut clock = SimulationClock::default();
        assert_eq!(clock.now(), 0);
        clock.advance();
        clock.advance();
        assert_eq!(clock.now(), 2);
        assert_eq!(clock.since(0), 2);
        assert_eq!(clock.since(5), 0);
    }
}
