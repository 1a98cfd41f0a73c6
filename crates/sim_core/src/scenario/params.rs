use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::equilibration::{EquilibrationConfig, EquilibrationMode};
use crate::matching::{DispatchConfig, DispatchStrategy};
use crate::pricing::PricingConfig;
use crate::scenario::error::ScenarioError;
use crate::telemetry::SimSnapshotConfig;

/// The single seeded generator every random draw of a run goes through.
#[derive(Debug, Clone, Resource)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

/// Expected requests per block, before and after the price response.
#[derive(Debug, Clone, Copy, PartialEq, Resource)]
pub struct DemandConfig {
    pub base_demand: f64,
    pub effective_demand: f64,
}

impl DemandConfig {
    pub fn new(base_demand: f64, pricing: &PricingConfig) -> Self {
        Self {
            base_demand,
            effective_demand: pricing.effective_demand(base_demand),
        }
    }

    pub fn refresh(&mut self, pricing: &PricingConfig) {
        self.effective_demand = pricing.effective_demand(self.base_demand);
    }
}

/// Number of vehicles the fleet reconciler drives the fleet towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Resource)]
pub struct FleetTarget(pub usize);

/// Random walk of IDLE vehicles.
#[derive(Debug, Clone, Copy, PartialEq, Resource)]
pub struct IdleMovementConfig {
    /// Probability per block that an idle vehicle turns left or right.
    pub turn_probability: f64,
}

/// Request expiry and retention of retired trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Resource)]
pub struct TripLifecycleConfig {
    /// UNASSIGNED trips this many blocks old are cancelled. `None` keeps them
    /// waiting forever.
    pub request_timeout_blocks: Option<u64>,
    /// Completed or cancelled trips are despawned once retired for longer
    /// than this many blocks.
    pub retention_blocks: u64,
}

/// Parameters for building a simulation scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    /// Side length of the square torus, in blocks.
    pub city_size: u32,
    /// Vehicles at block 0.
    pub vehicle_count: usize,
    /// Expected trip requests per block at the reference price.
    pub base_demand: f64,
    pub min_trip_distance: u32,
    /// `None` allows the longest distance the city holds.
    pub max_trip_distance: Option<u32>,
    /// Weight in `[0, 1]` pulling trip origins towards the city centre.
    pub inhomogeneity: f64,
    /// Whether destinations follow the same central bias as origins.
    pub inhomogeneous_destinations: bool,
    pub idle_turn_probability: f64,
    pub request_timeout_blocks: Option<u64>,
    pub trip_retention_blocks: u64,
    pub dispatch: DispatchStrategy,
    pub use_spatial_index: bool,
    pub equilibration: EquilibrationConfig,
    pub pricing: PricingConfig,
    pub seed: u64,
    /// Blocks in the run.
    pub time_blocks: u64,
    /// Blocks averaged by equilibration.
    pub smoothing_window: usize,
    /// Trailing blocks summarised at the end of a run.
    pub results_window: usize,
    pub snapshots: SimSnapshotConfig,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            city_size: 16,
            vehicle_count: 20,
            base_demand: 1.0,
            min_trip_distance: 0,
            max_trip_distance: None,
            inhomogeneity: 0.0,
            inhomogeneous_destinations: false,
            idle_turn_probability: 0.25,
            request_timeout_blocks: None,
            trip_retention_blocks: 1,
            dispatch: DispatchStrategy::NearestAvailable,
            use_spatial_index: true,
            equilibration: EquilibrationConfig::default(),
            pricing: PricingConfig::default(),
            seed: 0,
            time_blocks: 1_000,
            smoothing_window: 20,
            results_window: 200,
            snapshots: SimSnapshotConfig::default(),
        }
    }
}

impl ScenarioParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_city_size(mut self, city_size: u32) -> Self {
        self.city_size = city_size;
        self
    }

    pub fn with_vehicle_count(mut self, vehicle_count: usize) -> Self {
        self.vehicle_count = vehicle_count;
        self
    }

    pub fn with_base_demand(mut self, base_demand: f64) -> Self {
        self.base_demand = base_demand;
        self
    }

    pub fn with_trip_distance(mut self, min: u32, max: Option<u32>) -> Self {
        self.min_trip_distance = min;
        self.max_trip_distance = max;
        self
    }

    pub fn with_inhomogeneity(mut self, inhomogeneity: f64, destinations: bool) -> Self {
        self.inhomogeneity = inhomogeneity;
        self.inhomogeneous_destinations = destinations;
        self
    }

    pub fn with_idle_turn_probability(mut self, probability: f64) -> Self {
        self.idle_turn_probability = probability;
        self
    }

    pub fn with_request_timeout(mut self, blocks: Option<u64>) -> Self {
        self.request_timeout_blocks = blocks;
        self
    }

    pub fn with_trip_retention(mut self, blocks: u64) -> Self {
        self.trip_retention_blocks = blocks;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchStrategy) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_spatial_index(mut self, enabled: bool) -> Self {
        self.use_spatial_index = enabled;
        self
    }

    pub fn with_equilibration(mut self, equilibration: EquilibrationConfig) -> Self {
        self.equilibration = equilibration;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingConfig) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_time_blocks(mut self, time_blocks: u64) -> Self {
        self.time_blocks = time_blocks;
        self
    }

    pub fn with_windows(mut self, smoothing_window: usize, results_window: usize) -> Self {
        self.smoothing_window = smoothing_window;
        self.results_window = results_window;
        self
    }

    pub fn with_snapshots(mut self, snapshots: SimSnapshotConfig) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            strategy: self.dispatch,
            use_spatial_index: self.use_spatial_index,
        }
    }

    /// Rejects every malformed field before any state is built.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        validate_city_size(self.city_size)?;
        validate_trip_distance(self.city_size, self.min_trip_distance, self.max_trip_distance)?;
        validate_non_negative("base_demand", self.base_demand)?;
        validate_unit("inhomogeneity", self.inhomogeneity)?;
        validate_unit("idle_turn_probability", self.idle_turn_probability)?;
        validate_request_timeout(self.request_timeout_blocks)?;
        validate_dispatch(&self.dispatch)?;
        validate_pricing(&self.pricing, self.equilibration.mode)?;
        validate_equilibration(&self.equilibration)?;
        if self.time_blocks == 0 {
            return Err(ScenarioError::ZeroCount { field: "time_blocks" });
        }
        if self.smoothing_window == 0 {
            return Err(ScenarioError::ZeroCount { field: "smoothing_window" });
        }
        if self.results_window == 0 {
            return Err(ScenarioError::ZeroCount { field: "results_window" });
        }
        if self.snapshots.enabled && self.snapshots.max_snapshots == 0 {
            return Err(ScenarioError::ZeroCount { field: "snapshots.max_snapshots" });
        }
        if self.snapshots.enabled && self.snapshots.interval == 0 {
            return Err(ScenarioError::ZeroCount { field: "snapshots.interval" });
        }
        Ok(())
    }
}

pub(crate) fn validate_city_size(city_size: u32) -> Result<(), ScenarioError> {
    if city_size < 2 {
        return Err(ScenarioError::CitySize(city_size));
    }
    Ok(())
}

pub(crate) fn validate_trip_distance(city_size: u32, min: u32, max: Option<u32>) -> Result<(), ScenarioError> {
    let limit = 2 * (city_size / 2);
    if let Some(max) = max {
        if max > limit {
            return Err(ScenarioError::TripDistanceTooLong { max, limit, city_size });
        }
    }
    let max = max.unwrap_or(limit);
    if min > max {
        return Err(ScenarioError::TripDistanceBounds { min, max });
    }
    Ok(())
}

pub(crate) fn validate_unit(field: &'static str, value: f64) -> Result<(), ScenarioError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ScenarioError::OutOfUnitRange { field, value });
    }
    Ok(())
}

pub(crate) fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ScenarioError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ScenarioError::Negative { field, value });
    }
    Ok(())
}

pub(crate) fn validate_positive(field: &'static str, value: f64) -> Result<(), ScenarioError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ScenarioError::NonPositive { field, value });
    }
    Ok(())
}

pub(crate) fn validate_request_timeout(timeout: Option<u64>) -> Result<(), ScenarioError> {
    if timeout == Some(0) {
        return Err(ScenarioError::ZeroCount {
            field: "request_timeout_blocks",
        });
    }
    Ok(())
}

pub(crate) fn validate_dispatch(dispatch: &DispatchStrategy) -> Result<(), ScenarioError> {
    if let DispatchStrategy::ForwardDispatch(policy) = dispatch {
        if !policy.bias.is_finite() {
            return Err(ScenarioError::NotFinite {
                field: "dispatch.bias",
                value: policy.bias,
            });
        }
    }
    Ok(())
}

pub(crate) fn validate_pricing(pricing: &PricingConfig, mode: EquilibrationMode) -> Result<(), ScenarioError> {
    validate_non_negative("pricing.price", pricing.price)?;
    validate_unit("pricing.platform_commission", pricing.platform_commission)?;
    validate_non_negative("pricing.reservation_wage", pricing.reservation_wage)?;
    validate_non_negative("pricing.demand_elasticity", pricing.demand_elasticity)?;
    validate_positive("pricing.reference_price", pricing.reference_price)?;
    if pricing.demand_elasticity > 0.0 {
        validate_positive("pricing.price", pricing.price)?;
    }
    if mode != EquilibrationMode::Off {
        validate_positive("pricing.price", pricing.price)?;
        if pricing.platform_commission >= 1.0 {
            return Err(ScenarioError::CommissionTakesAll(pricing.platform_commission));
        }
    }
    Ok(())
}

pub(crate) fn validate_equilibration(config: &EquilibrationConfig) -> Result<(), ScenarioError> {
    if config.mode == EquilibrationMode::Off {
        return Ok(());
    }
    if config.interval == 0 {
        return Err(ScenarioError::ZeroCount {
            field: "equilibration.interval",
        });
    }
    if !(config.damping > 0.0 && config.damping <= 1.0) {
        return Err(ScenarioError::OutOfUnitRange {
            field: "equilibration.damping",
            value: config.damping,
        });
    }
    validate_non_negative("equilibration.tolerance", config.tolerance)
}
