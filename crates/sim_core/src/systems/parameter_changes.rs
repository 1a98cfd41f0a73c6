//! First system of every block: take staged parameter changes and apply the
//! ones that validate.

use bevy_ecs::prelude::{Query, ResMut};
use tracing::{info, warn};

use crate::ecs::{Trip, Vehicle};
use crate::equilibration::EquilibrationConfig;
use crate::matching::DispatchConfig;
use crate::pricing::PricingConfig;
use crate::scenario::{
    validate_city_size, validate_dispatch, validate_equilibration, validate_non_negative, validate_pricing,
    validate_request_timeout, validate_trip_distance, validate_unit, DemandConfig, FleetTarget,
    IdleMovementConfig, PendingChanges, ScenarioError, TripLifecycleConfig,
};
use crate::spatial::City;

fn accept<T>(parameter: &str, result: Result<(), ScenarioError>, value: T) -> Option<T> {
    match result {
        Ok(()) => Some(value),
        Err(error) => {
            warn!(parameter, %error, "rejected parameter change");
            None
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn apply_pending_changes_system(
    mut pending: ResMut<PendingChanges>,
    mut city: ResMut<City>,
    mut fleet_target: ResMut<FleetTarget>,
    mut demand: ResMut<DemandConfig>,
    mut pricing: ResMut<PricingConfig>,
    mut equilibration: ResMut<EquilibrationConfig>,
    mut idle_movement: ResMut<IdleMovementConfig>,
    mut lifecycle: ResMut<TripLifecycleConfig>,
    mut dispatch: ResMut<DispatchConfig>,
    mut vehicles: Query<&mut Vehicle>,
    mut trips: Query<&mut Trip>,
) {
    if pending.is_empty() {
        return;
    }
    let changes = pending.take();

    if changes.city_size.is_some() || changes.max_trip_distance.is_some() {
        let size = changes.city_size.unwrap_or(city.size());
        let result = validate_city_size(size).and_then(|()| match changes.max_trip_distance {
            Some(max) => validate_trip_distance(size, city.requested_min_trip_distance(), Some(max)),
            None => Ok(()),
        });
        if let Some(size) = accept("city_size/max_trip_distance", result, size) {
            if size != city.size() {
                city.resize(size);
                for mut vehicle in &mut vehicles {
                    vehicle.location = city.wrap(vehicle.location);
                }
                for mut trip in &mut trips {
                    trip.origin = city.wrap(trip.origin);
                    trip.destination = city.wrap(trip.destination);
                    trip.distance = city.distance(trip.origin, trip.destination);
                }
                info!(city_size = size, "city resized");
            }
            if let Some(max) = changes.max_trip_distance {
                city.set_max_trip_distance(Some(max));
            }
        }
    }

    if let Some(inhomogeneity) = changes.inhomogeneity {
        if let Some(value) = accept("inhomogeneity", validate_unit("inhomogeneity", inhomogeneity), inhomogeneity) {
            city.set_inhomogeneity(value);
        }
    }

    if let Some(count) = changes.vehicle_count {
        fleet_target.0 = count;
    }

    if let Some(probability) = changes.idle_turn_probability {
        let result = validate_unit("idle_turn_probability", probability);
        if let Some(value) = accept("idle_turn_probability", result, probability) {
            idle_movement.turn_probability = value;
        }
    }

    if let Some(timeout) = changes.request_timeout_blocks {
        if let Some(value) = accept("request_timeout_blocks", validate_request_timeout(timeout), timeout) {
            lifecycle.request_timeout_blocks = value;
        }
    }

    if let Some(strategy) = changes.dispatch {
        if let Some(strategy) = accept("dispatch", validate_dispatch(&strategy), strategy) {
            dispatch.strategy = strategy;
        }
    }

    let mode = changes.equilibration_mode.unwrap_or(equilibration.mode);
    if changes.touches_pricing() || changes.equilibration_mode.is_some() {
        let candidate = PricingConfig {
            price: changes.price.unwrap_or(pricing.price),
            platform_commission: changes.platform_commission.unwrap_or(pricing.platform_commission),
            reservation_wage: changes.reservation_wage.unwrap_or(pricing.reservation_wage),
            demand_elasticity: changes.demand_elasticity.unwrap_or(pricing.demand_elasticity),
            reference_price: pricing.reference_price,
        };
        let next_equilibration = EquilibrationConfig {
            mode,
            ..*equilibration
        };
        let result = validate_pricing(&candidate, mode).and_then(|()| validate_equilibration(&next_equilibration));
        if let Some((candidate, next)) = accept("pricing/equilibration_mode", result, (candidate, next_equilibration)) {
            *pricing = candidate;
            *equilibration = next;
        }
    }

    if let Some(base_demand) = changes.base_demand {
        if let Some(value) = accept("base_demand", validate_non_negative("base_demand", base_demand), base_demand) {
            demand.base_demand = value;
        }
    }
    demand.refresh(&pricing);
}
