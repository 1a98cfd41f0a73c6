//! Forward dispatch: hand a new trip to a vehicle that is already on its way
//! to another pickup, when that shortens waiting.

use serde::{Deserialize, Serialize};

use super::pool::IdlePool;
use super::types::{DispatchRequest, EnRouteCandidate};
use crate::ecs::VehiclePhase;
use crate::spatial::City;

/// Which waits are compared when deciding on a redirect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardDispatchRule {
    /// Only the new trip: redirect when the dispatched vehicle reaches it
    /// sooner than the best idle vehicle.
    PickupDistance,
    /// Both passengers: the new trip's pickup plus the released trip's idle
    /// re-pickup against the idle pickup plus the current passenger's
    /// remaining wait.
    #[default]
    SystemWait,
}

/// Redirect when `forward_cost + bias < stay_cost`. A positive bias makes
/// redirects rarer; a negative one makes them more eager.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardDispatchPolicy {
    pub rule: ForwardDispatchRule,
    pub bias: f64,
}

impl Default for ForwardDispatchPolicy {
    fn default() -> Self {
        Self {
            rule: ForwardDispatchRule::SystemWait,
            bias: 1.0,
        }
    }
}

/// A chosen redirect: index into the en-route list and the pickup distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    pub candidate: usize,
    pub distance: u32,
}

/// Picks the en-route vehicle to redirect to `request`, if any beats waiting
/// for the idle match (`idle_distance`, `None` when no idle vehicle exists).
/// Among qualifying vehicles the lowest forward cost wins, then the lowest id.
pub fn best_redirect(
    policy: &ForwardDispatchPolicy,
    city: &City,
    request: &DispatchRequest,
    idle_distance: Option<u32>,
    en_route: &[EnRouteCandidate],
    idle: &IdlePool<'_>,
) -> Option<Redirect> {
    let horizon = city.dispatch_horizon();
    let idle_cost = idle_distance.unwrap_or(horizon);
    let mut best: Option<(u32, Redirect)> = None;
    for (position, candidate) in en_route.iter().enumerate() {
        let vehicle = &candidate.vehicle;
        let Some(forward) = city.dispatch_distance(
            vehicle.location,
            vehicle.heading,
            request.origin,
            VehiclePhase::Dispatched,
            horizon,
        ) else {
            continue;
        };
        let (forward_cost, stay_cost) = match policy.rule {
            ForwardDispatchRule::PickupDistance => (forward, idle_cost),
            ForwardDispatchRule::SystemWait => {
                let remaining = city.distance(vehicle.location, candidate.current.origin);
                let stay_cost = idle_cost + remaining;
                // The released passenger needs at least one block.
                if f64::from(forward + 1) + policy.bias >= f64::from(stay_cost) {
                    continue;
                }
                let release = idle
                    .nearest(city, candidate.current.origin)
                    .map_or(horizon, |(_, distance)| distance);
                (forward + release, stay_cost)
            }
        };
        if f64::from(forward_cost) + policy.bias >= f64::from(stay_cost) {
            continue;
        }
        if best.map_or(true, |(cost, _)| forward_cost < cost) {
            best = Some((
                forward_cost,
                Redirect {
                    candidate: position,
                    distance: forward,
                },
            ));
        }
    }
    best.map(|(_, redirect)| redirect)
}
