use bevy_ecs::prelude::Entity;

use crate::ecs::{TripId, VehicleId};
use crate::spatial::{Direction, Location};

/// An UNASSIGNED trip waiting for a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRequest {
    pub trip: Entity,
    pub id: TripId,
    pub origin: Location,
}

/// A vehicle that may be matched, as seen by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub entity: Entity,
    pub id: VehicleId,
    pub location: Location,
    pub heading: Direction,
}

/// A DISPATCHED vehicle still eligible for forward dispatch, together with
/// the trip it is currently heading to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnRouteCandidate {
    pub vehicle: Candidate,
    pub current: DispatchRequest,
}

/// Outcome of matching one trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// An idle vehicle is dispatched to the trip.
    Assign {
        trip: Entity,
        vehicle: Entity,
        distance: u32,
    },
    /// A dispatched vehicle drops `released` and heads to `trip` instead.
    Redirect {
        trip: Entity,
        vehicle: Entity,
        released: Entity,
        distance: u32,
    },
}

impl Decision {
    pub fn trip(&self) -> Entity {
        match *self {
            Decision::Assign { trip, .. } | Decision::Redirect { trip, .. } => trip,
        }
    }

    pub fn vehicle(&self) -> Entity {
        match *self {
            Decision::Assign { vehicle, .. } | Decision::Redirect { vehicle, .. } => vehicle,
        }
    }

    pub fn distance(&self) -> u32 {
        match *self {
            Decision::Assign { distance, .. } | Decision::Redirect { distance, .. } => distance,
        }
    }
}
