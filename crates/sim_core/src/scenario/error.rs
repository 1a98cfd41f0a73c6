use thiserror::Error;

/// A scenario parameter that cannot describe a runnable simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScenarioError {
    #[error("city_size must be at least 2, got {0}")]
    CitySize(u32),

    #[error("min_trip_distance {min} exceeds max_trip_distance {max}")]
    TripDistanceBounds { min: u32, max: u32 },

    #[error("max_trip_distance {max} exceeds the largest distance {limit} in a city of size {city_size}")]
    TripDistanceTooLong { max: u32, limit: u32, city_size: u32 },

    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    #[error("{field} must be finite and non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be finite and positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },

    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },

    #[error("platform_commission {0} leaves drivers no income; equilibration needs it below 1")]
    CommissionTakesAll(f64),
}
