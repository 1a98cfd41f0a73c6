//! Supply equilibration: grow or shrink the fleet until the average driver
//! earns exactly the reservation wage.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::pricing::PricingConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquilibrationMode {
    #[default]
    Off,
    /// Adjust the fleet size; price and demand stay fixed.
    Supply,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct EquilibrationConfig {
    pub mode: EquilibrationMode,
    /// Blocks between adjustments.
    pub interval: u64,
    /// Fraction of the indicated correction applied per adjustment, in `(0, 1]`.
    pub damping: f64,
    /// Utility magnitude treated as equilibrium (no adjustment).
    pub tolerance: f64,
}

impl Default for EquilibrationConfig {
    fn default() -> Self {
        Self {
            mode: EquilibrationMode::Off,
            interval: 10,
            damping: 0.4,
            tolerance: 0.005,
        }
    }
}

impl EquilibrationConfig {
    pub fn supply(interval: u64) -> Self {
        Self {
            mode: EquilibrationMode::Supply,
            interval,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != EquilibrationMode::Off && self.interval > 0
    }

    /// Whether an adjustment is due in `block`. Block 0 never adjusts.
    pub fn is_due(&self, block: u64) -> bool {
        self.is_enabled() && block > 0 && block % self.interval == 0
    }

    /// Signed change in fleet size for a fleet of `vehicle_count` whose
    /// smoothed busy fraction is `busy_fraction`.
    ///
    /// The correction is proportional to utility: removing `k` vehicles from
    /// `n` scales each remaining driver's busy fraction by about `n/(n-k)`,
    /// so the indicated change is `n * utility / driver_price`, damped.
    /// Outside the tolerance band the fleet always moves by at least one
    /// vehicle, and never shrinks below zero.
    pub fn fleet_adjustment(&self, pricing: &PricingConfig, vehicle_count: usize, busy_fraction: f64) -> i64 {
        let utility = pricing.driver_utility(busy_fraction);
        let driver_price = pricing.driver_price();
        if utility.abs() <= self.tolerance || driver_price <= 0.0 {
            return 0;
        }
        let indicated = self.damping * vehicle_count as f64 * utility / driver_price;
        let mut delta = indicated.round() as i64;
        if delta == 0 {
            delta = if utility > 0.0 { 1 } else { -1 };
        }
        delta.max(-(vehicle_count as i64))
    }
}
