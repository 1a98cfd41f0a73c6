//! Staged parameter changes, applied once at the start of the next block.

use bevy_ecs::prelude::Resource;

use crate::equilibration::EquilibrationMode;
use crate::matching::DispatchStrategy;

/// One optional slot per parameter that may change during a run. External
/// controllers write here at any time; the first system of every block takes
/// the whole set and applies what validates.
#[derive(Debug, Clone, Default, PartialEq, Resource)]
pub struct PendingChanges {
    pub city_size: Option<u32>,
    pub vehicle_count: Option<usize>,
    pub base_demand: Option<f64>,
    pub equilibration_mode: Option<EquilibrationMode>,
    pub price: Option<f64>,
    pub platform_commission: Option<f64>,
    pub reservation_wage: Option<f64>,
    pub demand_elasticity: Option<f64>,
    pub inhomogeneity: Option<f64>,
    pub max_trip_distance: Option<u32>,
    pub idle_turn_probability: Option<f64>,
    /// `Some(None)` disables the timeout.
    pub request_timeout_blocks: Option<Option<u64>>,
    pub dispatch: Option<DispatchStrategy>,
}

impl PendingChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Empties the channel, returning everything staged so far.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn touches_pricing(&self) -> bool {
        self.price.is_some()
            || self.platform_commission.is_some()
            || self.reservation_wage.is_some()
            || self.demand_elasticity.is_some()
    }
}
