//! Trip price, platform commission and the demand response to price.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

/// Economic parameters shared by demand generation and supply equilibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct PricingConfig {
    /// Price a passenger pays per block of ride.
    pub price: f64,
    /// Fraction of the price retained by the platform, in `[0, 1]`.
    pub platform_commission: f64,
    /// Driver income per block below which driving is not worth it.
    pub reservation_wage: f64,
    /// Demand elasticity with respect to price; 0 disables the response.
    pub demand_elasticity: f64,
    /// Price at which effective demand equals base demand.
    pub reference_price: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            price: 1.0,
            platform_commission: 0.25,
            reservation_wage: 0.35,
            demand_elasticity: 0.0,
            reference_price: 1.0,
        }
    }
}

impl PricingConfig {
    /// Price net of commission, i.e. what the driver keeps per ride block.
    pub fn driver_price(&self) -> f64 {
        self.price * (1.0 - self.platform_commission)
    }

    /// Requests per block after applying the price response to `base_demand`.
    ///
    /// `effective = base * (reference / price) ^ elasticity`.
    pub fn effective_demand(&self, base_demand: f64) -> f64 {
        if self.demand_elasticity == 0.0 {
            return base_demand;
        }
        base_demand * (self.reference_price / self.price).powf(self.demand_elasticity)
    }

    /// Per-block driver utility for a given busy (P3) fraction.
    pub fn driver_utility(&self, busy_fraction: f64) -> f64 {
        self.driver_price() * busy_fraction - self.reservation_wage
    }

    /// Busy fraction at which driver utility is zero.
    pub fn break_even_busy_fraction(&self) -> Option<f64> {
        let driver_price = self.driver_price();
        (driver_price > 0.0).then(|| self.reservation_wage / driver_price)
    }
}
