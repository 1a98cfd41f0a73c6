//! Parameter variation framework for sweeping the simulation over a grid.
//!
//! A [ParameterSpace] holds one vector of candidate values per swept
//! dimension. [ParameterSpace::generate] expands them into every combination
//! (Cartesian product); [ParameterSpace::sample_random] draws a subset.
//! Combinations that fail scenario validation are dropped.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sim_core::matching::DispatchStrategy;
use sim_core::scenario::ScenarioParams;

/// A single parameter configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    /// Complete scenario parameters, seed included.
    pub params: ScenarioParams,
    /// Identifies the parameter combination; shared by all seeds of it.
    pub experiment_id: String,
    /// Index of the seed within the experiment.
    pub run_id: usize,
}

impl ParameterSet {
    pub fn new(params: ScenarioParams, experiment_id: String, run_id: usize) -> Self {
        Self {
            params,
            experiment_id,
            run_id,
        }
    }

    pub fn seed(&self) -> u64 {
        self.params.seed
    }
}

/// One combination of the swept dimensions, seed excluded.
#[derive(Debug, Clone, Copy)]
struct Combination {
    vehicle_count: usize,
    base_demand: f64,
    city_size: u32,
    price: f64,
    platform_commission: f64,
    reservation_wage: f64,
    dispatch: DispatchStrategy,
}

impl Combination {
    fn apply(&self, base: &ScenarioParams, seed: u64) -> ScenarioParams {
        let mut params = base.clone();
        params.vehicle_count = self.vehicle_count;
        params.base_demand = self.base_demand;
        params.city_size = self.city_size;
        params.pricing.price = self.price;
        params.pricing.platform_commission = self.platform_commission;
        params.pricing.reservation_wage = self.reservation_wage;
        params.dispatch = self.dispatch;
        params.seed = seed;
        params
    }
}

/// Candidate values per dimension, with empty dimensions filled from the base.
struct Dimensions {
    vehicle_counts: Vec<usize>,
    base_demands: Vec<f64>,
    city_sizes: Vec<u32>,
    prices: Vec<f64>,
    platform_commissions: Vec<f64>,
    reservation_wages: Vec<f64>,
    dispatches: Vec<DispatchStrategy>,
    seeds: Vec<u64>,
}

fn or_base<T: Clone>(values: &[T], base: T) -> Vec<T> {
    if values.is_empty() {
        vec![base]
    } else {
        values.to_vec()
    }
}

impl Dimensions {
    fn from_space(space: &ParameterSpace) -> Self {
        let base = &space.base;
        Self {
            vehicle_counts: or_base(&space.vehicle_counts, base.vehicle_count),
            base_demands: or_base(&space.base_demands, base.base_demand),
            city_sizes: or_base(&space.city_sizes, base.city_size),
            prices: or_base(&space.prices, base.pricing.price),
            platform_commissions: or_base(&space.platform_commissions, base.pricing.platform_commission),
            reservation_wages: or_base(&space.reservation_wages, base.pricing.reservation_wage),
            dispatches: or_base(&space.dispatches, base.dispatch),
            seeds: or_base(&space.seeds, base.seed),
        }
    }

    fn radices(&self) -> [usize; 7] {
        [
            self.vehicle_counts.len(),
            self.base_demands.len(),
            self.city_sizes.len(),
            self.prices.len(),
            self.platform_commissions.len(),
            self.reservation_wages.len(),
            self.dispatches.len(),
        ]
    }

    fn combination_count(&self) -> usize {
        self.radices().iter().product()
    }

    fn combination(&self, digits: [usize; 7]) -> Combination {
        Combination {
            vehicle_count: self.vehicle_counts[digits[0]],
            base_demand: self.base_demands[digits[1]],
            city_size: self.city_sizes[digits[2]],
            price: self.prices[digits[3]],
            platform_commission: self.platform_commissions[digits[4]],
            reservation_wage: self.reservation_wages[digits[5]],
            dispatch: self.dispatches[digits[6]],
        }
    }

    /// Decodes `index` into per-dimension digits; the last dimension varies
    /// fastest.
    fn digits(&self, mut index: usize) -> [usize; 7] {
        let radices = self.radices();
        let mut digits = [0; 7];
        for position in (0..radices.len()).rev() {
            digits[position] = index % radices[position];
            index /= radices[position];
        }
        digits
    }
}

/// Defines a parameter space for exploration.
///
/// Dimensions left empty take their value from the base parameters.
#[derive(Debug, Clone, Default)]
pub struct ParameterSpace {
    base: ScenarioParams,
    vehicle_counts: Vec<usize>,
    base_demands: Vec<f64>,
    city_sizes: Vec<u32>,
    prices: Vec<f64>,
    platform_commissions: Vec<f64>,
    reservation_wages: Vec<f64>,
    dispatches: Vec<DispatchStrategy>,
    seeds: Vec<u64>,
}

impl ParameterSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new parameter space for grid search.
    pub fn grid() -> Self {
        Self::new()
    }

    /// Set base parameters (used for every dimension not swept).
    pub fn with_base(mut self, base: ScenarioParams) -> Self {
        self.base = base;
        self
    }

    pub fn vehicle_count(mut self, counts: Vec<usize>) -> Self {
        self.vehicle_counts = counts;
        self
    }

    pub fn base_demand(mut self, demands: Vec<f64>) -> Self {
        self.base_demands = demands;
        self
    }

    pub fn city_size(mut self, sizes: Vec<u32>) -> Self {
        self.city_sizes = sizes;
        self
    }

    pub fn price(mut self, prices: Vec<f64>) -> Self {
        self.prices = prices;
        self
    }

    pub fn platform_commission(mut self, commissions: Vec<f64>) -> Self {
        self.platform_commissions = commissions;
        self
    }

    pub fn reservation_wage(mut self, wages: Vec<f64>) -> Self {
        self.reservation_wages = wages;
        self
    }

    pub fn dispatch(mut self, strategies: Vec<DispatchStrategy>) -> Self {
        self.dispatches = strategies;
        self
    }

    /// Seeds to run for every combination; each becomes one `run_id`.
    pub fn seeds(mut self, seeds: Vec<u64>) -> Self {
        self.seeds = seeds;
        self
    }

    /// Generate all parameter sets using grid search (Cartesian product).
    ///
    /// Experiment ids number the valid combinations in generation order, so
    /// they stay dense when invalid combinations are skipped.
    pub fn generate(&self) -> Vec<ParameterSet> {
        let dimensions = Dimensions::from_space(self);
        let combinations = (0..dimensions.combination_count())
            .map(|index| dimensions.combination(dimensions.digits(index)));
        self.expand(&dimensions, combinations)
    }

    /// Generate random parameter sets (Monte Carlo sampling).
    ///
    /// Draws up to `count` distinct combinations, each expanded over every
    /// seed. Returns fewer when the space holds fewer valid combinations.
    pub fn sample_random(&self, count: usize, seed: u64) -> Vec<ParameterSet> {
        let dimensions = Dimensions::from_space(self);
        let total = dimensions.combination_count();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut seen = HashSet::new();
        let mut picked = Vec::new();

        while picked.len() < count.min(total) {
            let index = rng.gen_range(0..total);
            if seen.insert(index) {
                picked.push(index);
            }
        }

        let combinations = picked
            .into_iter()
            .map(|index| dimensions.combination(dimensions.digits(index)));
        self.expand(&dimensions, combinations)
    }

    fn expand(&self, dimensions: &Dimensions, combinations: impl Iterator<Item = Combination>) -> Vec<ParameterSet> {
        let mut sets = Vec::new();
        let mut experiment = 0;

        for combination in combinations {
            let candidate = combination.apply(&self.base, 0);
            if candidate.validate().is_err() {
                continue;
            }
            let experiment_id = format!("exp_{}", experiment);
            experiment += 1;
            for (run_id, &seed) in dimensions.seeds.iter().enumerate() {
                sets.push(ParameterSet::new(
                    combination.apply(&self.base, seed),
                    experiment_id.clone(),
                    run_id,
                ));
            }
        }

        sets
    }
}

/// Reads a JSON-encoded [ScenarioParams]; missing fields take their defaults.
pub fn load_scenario_params(path: impl AsRef<Path>) -> Result<ScenarioParams, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    let params: ScenarioParams = serde_json::from_str(&contents)?;
    params.validate()?;
    Ok(params)
}
