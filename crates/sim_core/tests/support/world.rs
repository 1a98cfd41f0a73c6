#![allow(dead_code)]

use bevy_ecs::prelude::{Entity, World};
use sim_core::equilibration::EquilibrationConfig;
use sim_core::matching::DispatchStrategy;
use sim_core::pricing::PricingConfig;
use sim_core::scenario::{build_scenario, request_trip, spawn_vehicle, ScenarioParams};
use sim_core::spatial::{Direction, Location};
use sim_core::test_helpers::quiet_params;

/// Builder for reproducible test worlds: scenario parameters plus vehicles
/// and trips placed by hand before block 0.
#[derive(Clone, Debug)]
pub struct TestWorldBuilder {
    params: ScenarioParams,
    vehicles: Vec<(Location, Direction)>,
    trips: Vec<(Location, Location)>,
}

impl Default for TestWorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorldBuilder {
    /// A quiet 8×8 city: no random fleet, no random demand.
    pub fn new() -> Self {
        Self::from_params(quiet_params(8))
    }

    pub fn from_params(params: ScenarioParams) -> Self {
        Self {
            params,
            vehicles: Vec::new(),
            trips: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params = self.params.with_seed(seed);
        self
    }

    pub fn with_city_size(mut self, city_size: u32) -> Self {
        self.params = self.params.with_city_size(city_size);
        self
    }

    /// Randomly placed initial fleet.
    pub fn with_fleet(mut self, vehicle_count: usize) -> Self {
        self.params = self.params.with_vehicle_count(vehicle_count);
        self
    }

    pub fn with_demand(mut self, base_demand: f64) -> Self {
        self.params = self.params.with_base_demand(base_demand);
        self
    }

    pub fn with_request_timeout(mut self, blocks: Option<u64>) -> Self {
        self.params = self.params.with_request_timeout(blocks);
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchStrategy) -> Self {
        self.params = self.params.with_dispatch(dispatch);
        self
    }

    /// Enable or disable spatial indexing (defaults to enabled).
    pub fn enable_spatial_index(mut self, enabled: bool) -> Self {
        self.params = self.params.with_spatial_index(enabled);
        self
    }

    pub fn with_pricing(mut self, pricing: PricingConfig) -> Self {
        self.params = self.params.with_pricing(pricing);
        self
    }

    pub fn with_equilibration(mut self, equilibration: EquilibrationConfig) -> Self {
        self.params = self.params.with_equilibration(equilibration);
        self
    }

    pub fn with_time_blocks(mut self, time_blocks: u64) -> Self {
        self.params = self.params.with_time_blocks(time_blocks);
        self
    }

    pub fn with_windows(mut self, smoothing_window: usize, results_window: usize) -> Self {
        self.params = self.params.with_windows(smoothing_window, results_window);
        self
    }

    /// An IDLE vehicle placed by hand, in addition to the random fleet.
    pub fn with_vehicle(mut self, x: u32, y: u32, heading: Direction) -> Self {
        self.vehicles.push((Location::new(x, y), heading));
        self
    }

    /// A trip requested in block 0.
    pub fn with_trip(mut self, origin: (u32, u32), destination: (u32, u32)) -> Self {
        self.trips.push((
            Location::new(origin.0, origin.1),
            Location::new(destination.0, destination.1),
        ));
        self
    }

    pub fn params(&self) -> &ScenarioParams {
        &self.params
    }

    /// Build the ECS world; returns the hand-placed vehicles and trips in
    /// the order they were added.
    pub fn build_with_entities(self) -> (World, Vec<Entity>, Vec<Entity>) {
        let mut world = World::new();
        build_scenario(&mut world, self.params).expect("test params should validate");
        let vehicles = self
            .vehicles
            .into_iter()
            .map(|(location, heading)| spawn_vehicle(&mut world, location, heading))
            .collect();
        let trips = self
            .trips
            .into_iter()
            .map(|(origin, destination)| request_trip(&mut world, origin, destination))
            .collect();
        (world, vehicles, trips)
    }

    pub fn build(self) -> World {
        self.build_with_entities().0
    }
}
