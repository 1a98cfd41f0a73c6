use bevy_ecs::prelude::{Component, Entity, Resource};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::spatial::{City, Direction, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TripId(pub u64);

/// Monotonic id source. Ids are never reused within a run.
#[derive(Debug, Default, Clone, Resource)]
pub struct IdAllocator {
    next_vehicle: u64,
    next_trip: u64,
}

impl IdAllocator {
    pub fn next_vehicle(&mut self) -> VehicleId {
        let id = VehicleId(self.next_vehicle);
        self.next_vehicle += 1;
        id
    }

    pub fn next_trip(&mut self) -> TripId {
        let id = TripId(self.next_trip);
        self.next_trip += 1;
        id
    }
}

/// Vehicle phase as reported in history and snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehiclePhase {
    /// P1: available, cruising.
    Idle,
    /// P2: heading to a pickup.
    Dispatched,
    /// P3: carrying a passenger.
    Occupied,
}

/// Vehicle state. The trip reference lives inside the phase, so a vehicle has
/// a trip exactly when it is dispatched or occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    Idle,
    Dispatched { trip: Entity },
    Occupied { trip: Entity },
}

#[derive(Debug, Clone, PartialEq, Eq, Component)]
pub struct Vehicle {
    pub id: VehicleId,
    pub location: Location,
    pub heading: Direction,
    state: VehicleState,
    /// Set when the vehicle was redirected while dispatched; cleared at pickup.
    forward_dispatched: bool,
}

impl Vehicle {
    pub fn new(id: VehicleId, location: Location, heading: Direction) -> Self {
        Self {
            id,
            location,
            heading,
            state: VehicleState::Idle,
            forward_dispatched: false,
        }
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    pub fn phase(&self) -> VehiclePhase {
        match self.state {
            VehicleState::Idle => VehiclePhase::Idle,
            VehicleState::Dispatched { .. } => VehiclePhase::Dispatched,
            VehicleState::Occupied { .. } => VehiclePhase::Occupied,
        }
    }

    pub fn trip(&self) -> Option<Entity> {
        match self.state {
            VehicleState::Idle => None,
            VehicleState::Dispatched { trip } | VehicleState::Occupied { trip } => Some(trip),
        }
    }

    pub fn forward_dispatched(&self) -> bool {
        self.forward_dispatched
    }

    /// Whether forward dispatch may still redirect this vehicle.
    pub fn can_forward_dispatch(&self) -> bool {
        matches!(self.state, VehicleState::Dispatched { .. }) && !self.forward_dispatched
    }

    /// IDLE -> DISPATCHED.
    pub fn dispatch(&mut self, trip: Entity) {
        assert!(
            self.state == VehicleState::Idle,
            "vehicle {:?} dispatched from {:?}",
            self.id,
            self.phase()
        );
        self.state = VehicleState::Dispatched { trip };
    }

    /// DISPATCHED -> DISPATCHED towards a different trip. Returns the trip
    /// the vehicle gave up.
    pub fn redirect(&mut self, trip: Entity) -> Entity {
        let VehicleState::Dispatched { trip: released } = self.state else {
            panic!("vehicle {:?} redirected from {:?}", self.id, self.phase());
        };
        assert!(!self.forward_dispatched, "vehicle {:?} redirected twice", self.id);
        self.state = VehicleState::Dispatched { trip };
        self.forward_dispatched = true;
        released
    }

    /// DISPATCHED -> OCCUPIED.
    pub fn pick_up(&mut self) {
        let VehicleState::Dispatched { trip } = self.state else {
            panic!("vehicle {:?} picked up from {:?}", self.id, self.phase());
        };
        self.state = VehicleState::Occupied { trip };
        self.forward_dispatched = false;
    }

    /// OCCUPIED -> IDLE. Returns the finished trip.
    pub fn drop_off(&mut self) -> Entity {
        let VehicleState::Occupied { trip } = self.state else {
            panic!("vehicle {:?} dropped off from {:?}", self.id, self.phase());
        };
        self.state = VehicleState::Idle;
        trip
    }

    /// One block towards `target`. A reversal is spent turning in place.
    /// Returns whether the vehicle is at the target afterwards.
    pub fn advance_toward(&mut self, city: &City, target: Location) -> bool {
        if let Some(next) = city.next_heading(self.location, self.heading, target) {
            if next != self.heading.reverse() {
                self.location = city.step(self.location, next);
            }
            self.heading = next;
        }
        self.location == target
    }

    /// Idle cruising: turn left or right with probability `turn_probability`,
    /// then drive one block.
    pub fn wander<R: Rng + ?Sized>(&mut self, city: &City, turn_probability: f64, rng: &mut R) {
        if rng.gen_bool(turn_probability) {
            self.heading = if rng.gen_bool(0.5) {
                self.heading.turn_left()
            } else {
                self.heading.turn_right()
            };
        }
        self.location = city.step(self.location, self.heading);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TripPhase {
    Unassigned,
    Waiting,
    Riding,
    Completed,
    Cancelled,
}

impl TripPhase {
    pub fn can_transition_to(self, next: TripPhase) -> bool {
        use TripPhase::*;
        matches!(
            (self, next),
            (Unassigned, Waiting)
                | (Unassigned, Cancelled)
                | (Waiting, Riding)
                | (Waiting, Unassigned)
                | (Waiting, Cancelled)
                | (Riding, Completed)
        )
    }

    pub fn is_retired(self) -> bool {
        matches!(self, TripPhase::Completed | TripPhase::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Component)]
pub struct Trip {
    pub id: TripId,
    pub origin: Location,
    pub destination: Location,
    /// Wrap-around distance from origin to destination at request time.
    pub distance: u32,
    phase: TripPhase,
    vehicle: Option<Entity>,
    pub requested_at: u64,
    /// Block of the latest assignment.
    pub assigned_at: Option<u64>,
    pub picked_up_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub cancelled_at: Option<u64>,
    unassigned_since: u64,
    unassigned_blocks: u64,
    waiting_blocks: u64,
}

impl Trip {
    pub fn new(id: TripId, origin: Location, destination: Location, distance: u32, requested_at: u64) -> Self {
        Self {
            id,
            origin,
            destination,
            distance,
            phase: TripPhase::Unassigned,
            vehicle: None,
            requested_at,
            assigned_at: None,
            picked_up_at: None,
            completed_at: None,
            cancelled_at: None,
            unassigned_since: requested_at,
            unassigned_blocks: 0,
            waiting_blocks: 0,
        }
    }

    pub fn phase(&self) -> TripPhase {
        self.phase
    }

    pub fn vehicle(&self) -> Option<Entity> {
        self.vehicle
    }

    /// Blocks spent WAITING for a vehicle, summed over every assignment.
    pub fn wait_time(&self) -> u64 {
        self.waiting_blocks
    }

    /// Blocks spent UNASSIGNED, summed over every release.
    pub fn unassigned_time(&self) -> u64 {
        self.unassigned_blocks
    }

    /// Blocks spent UNASSIGNED up to `now`, counting the open stretch of an
    /// UNASSIGNED trip.
    pub fn unassigned_for(&self, now: u64) -> u64 {
        match self.phase {
            TripPhase::Unassigned => self.unassigned_blocks + now.saturating_sub(self.unassigned_since),
            _ => self.unassigned_blocks,
        }
    }

    pub fn ride_time(&self) -> Option<u64> {
        Some(self.completed_at? - self.picked_up_at?)
    }

    pub fn retired_at(&self) -> Option<u64> {
        self.completed_at.or(self.cancelled_at)
    }

    pub fn assign(&mut self, vehicle: Entity, block: u64) {
        self.transition(TripPhase::Waiting);
        self.unassigned_blocks += block - self.unassigned_since;
        self.vehicle = Some(vehicle);
        self.assigned_at = Some(block);
    }

    /// WAITING -> UNASSIGNED after forward dispatch took the vehicle away.
    /// Returns the blocks waited under the lost assignment.
    pub fn release(&mut self, block: u64) -> u64 {
        self.transition(TripPhase::Unassigned);
        let waited = block - self.assigned_block();
        self.waiting_blocks += waited;
        self.vehicle = None;
        self.unassigned_since = block;
        waited
    }

    /// Returns the blocks waited under the final assignment.
    pub fn pick_up(&mut self, block: u64) -> u64 {
        self.transition(TripPhase::Riding);
        let waited = block - self.assigned_block();
        self.waiting_blocks += waited;
        self.picked_up_at = Some(block);
        waited
    }

    pub fn complete(&mut self, block: u64) {
        self.transition(TripPhase::Completed);
        self.vehicle = None;
        self.completed_at = Some(block);
    }

    pub fn cancel(&mut self, block: u64) {
        match self.phase {
            TripPhase::Unassigned => self.unassigned_blocks += block - self.unassigned_since,
            TripPhase::Waiting => self.waiting_blocks += block - self.assigned_block(),
            _ => {}
        }
        self.transition(TripPhase::Cancelled);
        self.vehicle = None;
        self.cancelled_at = Some(block);
    }

    fn assigned_block(&self) -> u64 {
        self.assigned_at.unwrap_or(self.requested_at)
    }

    fn transition(&mut self, next: TripPhase) {
        assert!(
            self.phase.can_transition_to(next),
            "trip {:?}: illegal transition {:?} -> {:?}",
            self.id,
            self.phase,
            next
        );
        self.phase = next;
    }
}
