//! Fleet reconciliation: grow or shrink the fleet towards [`FleetTarget`].

use bevy_ecs::prelude::{Commands, Entity, Query, Res, ResMut};
use rand::rngs::StdRng;
use tracing::debug;

use crate::ecs::{IdAllocator, Vehicle, VehicleId, VehiclePhase};
use crate::scenario::{new_vehicle, FleetTarget, SimRng};
use crate::spatial::City;

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetChange {
    pub added: usize,
    pub retired: usize,
    /// Vehicles that should have been retired but were busy.
    pub shortfall: usize,
}

impl FleetChange {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Spawns idle vehicles at random locations, or retires idle vehicles
/// (newest first), until the fleet matches `target`. Busy vehicles are never
/// retired; the remainder is left for a later block.
pub(crate) fn reconcile_fleet(
    commands: &mut Commands,
    target: usize,
    city: &City,
    rng: &mut StdRng,
    ids: &mut IdAllocator,
    vehicles: &Query<(Entity, &Vehicle)>,
) -> FleetChange {
    let current = vehicles.iter().count();
    let mut change = FleetChange::default();
    if current < target {
        for _ in current..target {
            commands.spawn(new_vehicle(city, ids, rng));
        }
        change.added = target - current;
    } else if current > target {
        let excess = current - target;
        let mut idle: Vec<(VehicleId, Entity)> = vehicles
            .iter()
            .filter(|(_, vehicle)| vehicle.phase() == VehiclePhase::Idle)
            .map(|(entity, vehicle)| (vehicle.id, entity))
            .collect();
        idle.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        for (_, entity) in idle.iter().take(excess) {
            commands.entity(*entity).despawn();
        }
        change.retired = excess.min(idle.len());
        change.shortfall = excess - change.retired;
    }
    change
}

pub fn reconcile_fleet_system(
    mut commands: Commands,
    target: Res<FleetTarget>,
    city: Res<City>,
    mut rng: ResMut<SimRng>,
    mut ids: ResMut<IdAllocator>,
    vehicles: Query<(Entity, &Vehicle)>,
) {
    let change = reconcile_fleet(&mut commands, target.0, &city, &mut rng.0, &mut ids, &vehicles);
    if !change.is_noop() {
        debug!(
            target = target.0,
            added = change.added,
            retired = change.retired,
            shortfall = change.shortfall,
            "fleet reconciled"
        );
    }
}
