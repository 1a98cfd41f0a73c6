use rand::Rng;

use super::types::Candidate;
use crate::ecs::{VehicleId, VehiclePhase};
use crate::spatial::{City, Location, SpatialIndex};

/// Idle vehicles still available in the current dispatch pass, kept in id
/// order. Optionally mirrored into a [`SpatialIndex`].
pub struct IdlePool<'a> {
    vehicles: Vec<Candidate>,
    index: Option<&'a mut SpatialIndex>,
}

impl<'a> IdlePool<'a> {
    /// Linear-scan pool.
    pub fn new(mut vehicles: Vec<Candidate>) -> Self {
        vehicles.sort_unstable_by_key(|candidate| candidate.id);
        Self {
            vehicles,
            index: None,
        }
    }

    /// Pool backed by `index`, rebuilt from `vehicles`. The index only pays
    /// off once there are at least as many idle vehicles as the city is wide;
    /// below that the pool scans linearly and leaves the index empty.
    pub fn indexed(vehicles: Vec<Candidate>, city: &City, index: &'a mut SpatialIndex) -> Self {
        let mut pool = Self::new(vehicles);
        index.clear();
        if pool.vehicles.len() >= city.size() as usize {
            for candidate in &pool.vehicles {
                index.insert(candidate.location, candidate.id, candidate.entity, candidate.heading);
            }
            pool.index = Some(index);
        }
        pool
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Smallest dispatch distance to `target`, lowest id on ties.
    pub fn nearest(&self, city: &City, target: Location) -> Option<(Candidate, u32)> {
        match &self.index {
            Some(index) => {
                let (_, id, distance) = index.nearest(city, target)?;
                let position = self.position(id)?;
                Some((self.vehicles[position], distance))
            }
            None => self.scan(city, target),
        }
    }

    /// Linear scan in id order with a shrinking threshold, stopping at the
    /// smallest possible dispatch distance.
    pub fn scan(&self, city: &City, target: Location) -> Option<(Candidate, u32)> {
        let mut threshold = city.dispatch_horizon();
        let mut best = None;
        for candidate in &self.vehicles {
            let Some(distance) = city.dispatch_distance(
                candidate.location,
                candidate.heading,
                target,
                VehiclePhase::Idle,
                threshold,
            ) else {
                continue;
            };
            threshold = distance;
            best = Some((*candidate, distance));
            if distance == 1 {
                break;
            }
        }
        best
    }

    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Candidate> {
        if self.vehicles.is_empty() {
            return None;
        }
        Some(self.vehicles[rng.gen_range(0..self.vehicles.len())])
    }

    /// Removes a matched vehicle from the pool.
    pub fn take(&mut self, candidate: &Candidate) {
        if let Some(position) = self.position(candidate.id) {
            self.vehicles.remove(position);
        }
        if let Some(index) = self.index.as_deref_mut() {
            index.remove(candidate.location, candidate.id);
        }
    }

    fn position(&self, id: VehicleId) -> Option<usize> {
        self.vehicles.binary_search_by_key(&id, |candidate| candidate.id).ok()
    }
}
