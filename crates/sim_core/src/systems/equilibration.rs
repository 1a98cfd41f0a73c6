//! Periodic supply equilibration.

use bevy_ecs::prelude::{Commands, Entity, Query, Res, ResMut};
use tracing::debug;

use crate::clock::SimulationClock;
use crate::ecs::{IdAllocator, Vehicle};
use crate::equilibration::EquilibrationConfig;
use crate::pricing::PricingConfig;
use crate::scenario::{DemandConfig, FleetTarget, SimRng};
use crate::spatial::City;
use crate::systems::fleet::reconcile_fleet;
use crate::telemetry::History;

/// Fleet change for one equilibration step. An empty fleet has no busy
/// fraction to measure, so it restarts with one vehicle whenever there is
/// demand and a fully busy driver would beat the reservation wage.
pub fn equilibration_step(
    config: &EquilibrationConfig,
    pricing: &PricingConfig,
    demand: &DemandConfig,
    vehicle_count: usize,
    busy_fraction: f64,
) -> i64 {
    if vehicle_count == 0 {
        let worthwhile = demand.effective_demand > 0.0 && pricing.driver_utility(1.0) > config.tolerance;
        return i64::from(worthwhile);
    }
    config.fleet_adjustment(pricing, vehicle_count, busy_fraction)
}

/// Runs when [`EquilibrationConfig::is_due`]: refreshes the price response
/// of demand, then moves the fleet target by the indicated adjustment and
/// reconciles the fleet straight away.
#[allow(clippy::too_many_arguments)]
pub fn equilibration_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    config: Res<EquilibrationConfig>,
    pricing: Res<PricingConfig>,
    history: Res<History>,
    city: Res<City>,
    mut demand: ResMut<DemandConfig>,
    mut target: ResMut<FleetTarget>,
    mut rng: ResMut<SimRng>,
    mut ids: ResMut<IdAllocator>,
    vehicles: Query<(Entity, &Vehicle)>,
) {
    demand.refresh(&pricing);

    let vehicle_count = vehicles.iter().count();
    let busy_fraction = history.smoothed().occupied_fraction;
    let delta = equilibration_step(&config, &pricing, &demand, vehicle_count, busy_fraction);
    if delta == 0 {
        return;
    }
    target.0 = (vehicle_count as i64 + delta).max(0) as usize;
    let change = reconcile_fleet(&mut commands, target.0, &city, &mut rng.0, &mut ids, &vehicles);
    debug!(
        block = clock.now(),
        busy_fraction,
        utility = pricing.driver_utility(busy_fraction),
        delta,
        target = target.0,
        added = change.added,
        retired = change.retired,
        "equilibration step"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pricing() -> PricingConfig {
        PricingConfig {
            price: 1.0,
            platform_commission: 0.0,
            reservation_wage: 0.5,
            ..PricingConfig::default()
        }
    }

    #[test]
    fn empty_fleet_restarts_only_with_demand() {
        let config = EquilibrationConfig::supply(10);
        let pricing = pricing();
        let busy = DemandConfig::new(2.0, &pricing);
        let quiet = DemandConfig::new(0.0, &pricing);
        assert_eq!(equilibration_step(&config, &pricing, &busy, 0, 0.0), 1);
        assert_eq!(equilibration_step(&config, &pricing, &quiet, 0, 0.0), 0);

        let unprofitable = PricingConfig {
            reservation_wage: 2.0,
            ..pricing
        };
        assert_eq!(equilibration_step(&config, &unprofitable, &busy, 0, 0.0), 0);
    }

    #[test]
    fn non_empty_fleet_follows_utility() {
        let config = EquilibrationConfig::supply(10);
        let pricing = pricing();
        let demand = DemandConfig::new(1.0, &pricing);
        assert!(equilibration_step(&config, &pricing, &demand, 10, 0.9) > 0);
        assert!(equilibration_step(&config, &pricing, &demand, 10, 0.1) < 0);
        assert_eq!(equilibration_step(&config, &pricing, &demand, 10, 0.5), 0);
    }
}
