//! Dispatch: pair UNASSIGNED trips with vehicles once per block.
//!
//! Matching is planned on plain data ([`DispatchRequest`], [`Candidate`])
//! and returned as an ordered list of [`Decision`]s; the dispatch system
//! applies them to the world in that order.

pub mod forward;
pub mod pool;
pub mod types;

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ecs::VehiclePhase;
use crate::spatial::{City, SpatialIndex};

pub use forward::{best_redirect, ForwardDispatchPolicy, ForwardDispatchRule, Redirect};
pub use pool::IdlePool;
pub use types::{Candidate, Decision, DispatchRequest, EnRouteCandidate};

/// Matching strategy, selected per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum DispatchStrategy {
    /// Nearest IDLE vehicle by dispatch distance.
    #[default]
    NearestAvailable,
    /// Uniformly random IDLE vehicle; a distance-blind baseline.
    Random,
    /// Nearest-available by plain linear scan, never redirecting.
    IdleOnlyLegacy,
    /// Nearest-available, plus redirecting DISPATCHED vehicles.
    ForwardDispatch(ForwardDispatchPolicy),
}

impl DispatchStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchStrategy::NearestAvailable => "nearest_available",
            DispatchStrategy::Random => "random",
            DispatchStrategy::IdleOnlyLegacy => "idle_only_legacy",
            DispatchStrategy::ForwardDispatch(_) => "forward_dispatch",
        }
    }

    pub fn uses_forward_dispatch(&self) -> bool {
        matches!(self, DispatchStrategy::ForwardDispatch(_))
    }

    fn may_use_index(&self) -> bool {
        matches!(
            self,
            DispatchStrategy::NearestAvailable | DispatchStrategy::ForwardDispatch(_)
        )
    }
}

/// Dispatch configuration resource.
#[derive(Debug, Clone, Copy, PartialEq, Resource)]
pub struct DispatchConfig {
    pub strategy: DispatchStrategy,
    pub use_spatial_index: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            strategy: DispatchStrategy::NearestAvailable,
            use_spatial_index: true,
        }
    }
}

/// Matches `requests` (in the given order) against `idle` and, for forward
/// dispatch, `en_route` vehicles.
///
/// A trip released by a redirect rejoins the back of the queue and may be
/// matched again in the same pass. Each en-route vehicle is redirected at
/// most once, so the pass always terminates.
pub fn plan_dispatch<R: Rng + ?Sized>(
    config: &DispatchConfig,
    city: &City,
    index: &mut SpatialIndex,
    rng: &mut R,
    requests: Vec<DispatchRequest>,
    idle: Vec<Candidate>,
    mut en_route: Vec<EnRouteCandidate>,
) -> Vec<Decision> {
    let mut pool = if config.use_spatial_index && config.strategy.may_use_index() {
        IdlePool::indexed(idle, city, index)
    } else {
        IdlePool::new(idle)
    };
    if !config.strategy.uses_forward_dispatch() {
        en_route.clear();
    }
    en_route.sort_unstable_by_key(|candidate| candidate.vehicle.id);

    let mut queue: VecDeque<DispatchRequest> = requests.into();
    let mut decisions = Vec::new();
    while let Some(request) = queue.pop_front() {
        if pool.is_empty() && en_route.is_empty() {
            break;
        }
        let idle_match = match config.strategy {
            DispatchStrategy::Random => pool.random(rng).and_then(|candidate| {
                city.dispatch_distance(
                    candidate.location,
                    candidate.heading,
                    request.origin,
                    VehiclePhase::Idle,
                    u32::MAX,
                )
                .map(|distance| (candidate, distance))
            }),
            DispatchStrategy::IdleOnlyLegacy => pool.scan(city, request.origin),
            DispatchStrategy::NearestAvailable | DispatchStrategy::ForwardDispatch(_) => {
                pool.nearest(city, request.origin)
            }
        };

        if let DispatchStrategy::ForwardDispatch(policy) = &config.strategy {
            let idle_distance = idle_match.map(|(_, distance)| distance);
            if let Some(redirect) = best_redirect(policy, city, &request, idle_distance, &en_route, &pool) {
                let candidate = en_route.remove(redirect.candidate);
                decisions.push(Decision::Redirect {
                    trip: request.trip,
                    vehicle: candidate.vehicle.entity,
                    released: candidate.current.trip,
                    distance: redirect.distance,
                });
                queue.push_back(candidate.current);
                continue;
            }
        }

        if let Some((candidate, distance)) = idle_match {
            pool.take(&candidate);
            decisions.push(Decision::Assign {
                trip: request.trip,
                vehicle: candidate.entity,
                distance,
            });
        }
    }
    decisions
}
