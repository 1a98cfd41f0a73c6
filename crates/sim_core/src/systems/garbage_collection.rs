use bevy_ecs::prelude::{Commands, Entity, Query, Res};

use crate::clock::SimulationClock;
use crate::ecs::Trip;
use crate::scenario::TripLifecycleConfig;

/// Despawns completed and cancelled trips once they have been retired for
/// longer than the retention window.
pub fn garbage_collection_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    lifecycle: Res<TripLifecycleConfig>,
    trips: Query<(Entity, &Trip)>,
) {
    for (entity, trip) in &trips {
        if let Some(retired_at) = trip.retired_at() {
            if clock.since(retired_at) > lifecycle.retention_blocks {
                commands.entity(entity).despawn();
            }
        }
    }
}
