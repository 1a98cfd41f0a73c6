//! City geometry: a square torus of intersections.
//!
//! Coordinates wrap in both axes, so every distance is a wrap-around
//! Manhattan distance. On each axis the signed offset from one coordinate to
//! another is normalised into `(-C/2, C/2]`; on an even-sized city the
//! offset `C/2` is "half way round" and either direction shortens it.
//!
//! This module also owns location and trip sampling, the route step used by
//! moving vehicles and a bucketed index of idle vehicles for dispatch.

use std::collections::HashMap;

use bevy_ecs::prelude::{Entity, Resource};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ecs::{VehicleId, VehiclePhase};

/// Maximum trip length for which destinations are drawn by enumerating every
/// admissible offset instead of by rejection sampling.
pub const ENUMERATION_MAX_DISTANCE: u32 = 16;

const MAX_REJECTION_ATTEMPTS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub x: u32,
    pub y: u32,
}

impl Location {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Compass heading. North is +y, east is +x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn turn_left(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    pub fn turn_right(self) -> Self {
        self.turn_left().reverse()
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Unit step `(dx, dy)` taken when moving one block in this direction.
    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::East | Direction::West)
    }

    /// Splits an `(dx, dy)` offset into the component along this heading and
    /// the component across it, plus the sign of forward travel.
    fn decompose(self, dx: i64, dy: i64) -> (i64, i64, i64) {
        let (hx, hy) = self.offset();
        if self.is_horizontal() {
            (dx, dy, hx)
        } else {
            (dy, dx, hy)
        }
    }
}

/// The square, wrap-around grid every vehicle and trip lives on.
///
/// Besides its size the city carries the spatial shape of demand: how
/// concentrated trip origins are and which trip lengths are admissible.
#[derive(Debug, Clone, PartialEq, Resource)]
pub struct City {
    size: u32,
    /// Probability that a sampled location is drawn from the central zone.
    inhomogeneity: f64,
    /// Whether destinations are drawn with the same central bias as origins.
    inhomogeneous_destinations: bool,
    min_trip_distance: u32,
    /// Requested upper bound; `None` allows any distance the city holds.
    max_trip_distance: Option<u32>,
}

impl City {
    /// Homogeneous city whose admissible trip lengths span the whole torus.
    pub fn new(size: u32) -> Self {
        assert!(size >= 2, "city size must be at least 2, got {size}");
        Self {
            size,
            inhomogeneity: 0.0,
            inhomogeneous_destinations: false,
            min_trip_distance: 0,
            max_trip_distance: None,
        }
    }

    pub fn with_inhomogeneity(mut self, inhomogeneity: f64, destinations: bool) -> Self {
        self.inhomogeneity = inhomogeneity;
        self.inhomogeneous_destinations = destinations;
        self
    }

    /// Restricts trip lengths to `[min, max]`. Both bounds are capped at the
    /// largest distance the city can hold, so they follow later resizes.
    pub fn with_trip_distance(mut self, min: u32, max: Option<u32>) -> Self {
        self.set_trip_distance(min, max);
        self
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn inhomogeneity(&self) -> f64 {
        self.inhomogeneity
    }

    pub fn inhomogeneous_destinations(&self) -> bool {
        self.inhomogeneous_destinations
    }

    pub fn min_trip_distance(&self) -> u32 {
        self.min_trip_distance.min(self.max_trip_distance())
    }

    /// The minimum as configured, before capping.
    pub(crate) fn requested_min_trip_distance(&self) -> u32 {
        self.min_trip_distance
    }

    pub fn max_trip_distance(&self) -> u32 {
        let limit = self.max_distance();
        self.max_trip_distance.map_or(limit, |max| max.min(limit))
    }

    /// Largest wrap-around distance between two intersections.
    pub fn max_distance(&self) -> u32 {
        max_distance_for(self.size)
    }

    /// Initial dispatch threshold: strictly larger than any dispatch distance.
    pub fn dispatch_horizon(&self) -> u32 {
        self.max_distance() + 1
    }

    pub(crate) fn resize(&mut self, size: u32) {
        assert!(size >= 2, "city size must be at least 2, got {size}");
        self.size = size;
    }

    pub(crate) fn set_inhomogeneity(&mut self, inhomogeneity: f64) {
        self.inhomogeneity = inhomogeneity;
    }

    pub(crate) fn set_inhomogeneous_destinations(&mut self, destinations: bool) {
        self.inhomogeneous_destinations = destinations;
    }

    pub(crate) fn set_trip_distance(&mut self, min: u32, max: Option<u32>) {
        self.min_trip_distance = min;
        self.max_trip_distance = max;
    }

    pub(crate) fn set_max_trip_distance(&mut self, max: Option<u32>) {
        self.max_trip_distance = max;
    }

    pub fn contains(&self, location: Location) -> bool {
        location.x < self.size && location.y < self.size
    }

    /// Maps any location (e.g. one from a larger city) onto this torus.
    pub fn wrap(&self, location: Location) -> Location {
        Location::new(location.x % self.size, location.y % self.size)
    }

    /// The intersection one block from `from` in direction `heading`.
    pub fn step(&self, from: Location, heading: Direction) -> Location {
        let (dx, dy) = heading.offset();
        Location::new(self.wrap_coord(from.x as i64 + dx), self.wrap_coord(from.y as i64 + dy))
    }

    /// Signed per-axis offset from `from` to `to`, normalised into `(-C/2, C/2]`.
    pub fn offset(&self, from: Location, to: Location) -> (i64, i64) {
        (self.axis_offset(from.x, to.x), self.axis_offset(from.y, to.y))
    }

    /// Wrap-around Manhattan distance.
    pub fn distance(&self, from: Location, to: Location) -> u32 {
        let (dx, dy) = self.offset(from, to);
        (dx.unsigned_abs() + dy.unsigned_abs()) as u32
    }

    /// Effective distance used to rank a vehicle for a pickup at `to`.
    ///
    /// Occupied vehicles are never candidates. Otherwise the result is the
    /// wrap-around distance plus one block when the target lies straight
    /// behind the vehicle (the U-turn it needs), floored at 1.
    ///
    /// The computation gives up as soon as the partial sum reaches
    /// `threshold`: a result is only returned when it is strictly smaller.
    pub fn dispatch_distance(
        &self,
        from: Location,
        heading: Direction,
        to: Location,
        phase: VehiclePhase,
        threshold: u32,
    ) -> Option<u32> {
        if phase == VehiclePhase::Occupied {
            return None;
        }
        let dx = self.axis_offset(from.x, to.x);
        let partial = dx.unsigned_abs() as u32;
        if partial >= threshold {
            return None;
        }
        let dy = self.axis_offset(from.y, to.y);
        let raw = partial + dy.unsigned_abs() as u32;
        if raw >= threshold {
            return None;
        }
        let distance = (raw + self.reversal_penalty(heading, dx, dy)).max(1);
        (distance < threshold).then_some(distance)
    }

    /// Heading for the next block on the way from `from` to `to`, or `None`
    /// once there.
    ///
    /// The current heading is kept while it shortens the trip, then left and
    /// right turns are tried. Reversing is the last resort and, when
    /// returned, costs the vehicle a block turning in place.
    pub fn next_heading(&self, from: Location, heading: Direction, to: Location) -> Option<Direction> {
        if from == to {
            return None;
        }
        let (dx, dy) = self.offset(from, to);
        [heading, heading.turn_left(), heading.turn_right()]
            .into_iter()
            .find(|candidate| self.shortens(*candidate, dx, dy))
            .or(Some(heading.reverse()))
    }

    /// Samples an origin: from the central zone with probability
    /// `inhomogeneity`, uniformly over the city otherwise.
    pub fn sample_location<R: Rng + ?Sized>(&self, rng: &mut R) -> Location {
        if self.inhomogeneity > 0.0 && rng.gen_bool(self.inhomogeneity) {
            let low = self.size / 4;
            let span = (self.size / 2).max(1);
            Location::new(low + rng.gen_range(0..span), low + rng.gen_range(0..span))
        } else {
            self.uniform_location(rng)
        }
    }

    pub fn uniform_location<R: Rng + ?Sized>(&self, rng: &mut R) -> Location {
        Location::new(rng.gen_range(0..self.size), rng.gen_range(0..self.size))
    }

    /// Samples a destination whose distance from `origin` lies within the
    /// admissible trip length range.
    ///
    /// Homogeneous destinations are uniform over every admissible
    /// intersection, with no directional bias: short ranges enumerate the
    /// candidates, long ranges use rejection sampling on uniform offsets.
    /// Inhomogeneous destinations reuse `sample_location` and reject
    /// out-of-range candidates. Both fall back to enumeration.
    pub fn sample_trip_destination<R: Rng + ?Sized>(&self, rng: &mut R, origin: Location) -> Location {
        if self.inhomogeneous_destinations && self.inhomogeneity > 0.0 {
            for _ in 0..MAX_REJECTION_ATTEMPTS {
                let candidate = self.sample_location(rng);
                if self.is_admissible_trip(self.distance(origin, candidate)) {
                    return candidate;
                }
            }
        } else if self.max_trip_distance() > ENUMERATION_MAX_DISTANCE {
            let (low, high) = self.axis_range();
            for _ in 0..MAX_REJECTION_ATTEMPTS {
                let dx = rng.gen_range(low..=high);
                let dy = rng.gen_range(low..=high);
                if self.is_admissible_trip((dx.unsigned_abs() + dy.unsigned_abs()) as u32) {
                    return self.translate(origin, dx, dy);
                }
            }
        }
        self.enumerated_destination(rng, origin).unwrap_or(origin)
    }

    pub fn is_admissible_trip(&self, distance: u32) -> bool {
        (self.min_trip_distance()..=self.max_trip_distance()).contains(&distance)
    }

    /// Every intersection at exactly `radius` from `center`, each listed once.
    pub fn ring(&self, center: Location, radius: u32) -> Vec<Location> {
        let (low, high) = self.axis_range();
        let radius = radius as i64;
        let mut ring = Vec::new();
        for dx in (-radius).max(low)..=radius.min(high) {
            let rest = radius - dx.abs();
            for dy in [rest, -rest] {
                if (low..=high).contains(&dy) {
                    ring.push(self.translate(center, dx, dy));
                }
                if rest == 0 {
                    break;
                }
            }
        }
        ring
    }

    fn enumerated_destination<R: Rng + ?Sized>(&self, rng: &mut R, origin: Location) -> Option<Location> {
        let (low, high) = self.axis_range();
        let reach = self.max_trip_distance() as i64;
        let mut candidates = Vec::new();
        for dx in low.max(-reach)..=high.min(reach) {
            for dy in low.max(-reach)..=high.min(reach) {
                if self.is_admissible_trip((dx.unsigned_abs() + dy.unsigned_abs()) as u32) {
                    candidates.push((dx, dy));
                }
            }
        }
        if candidates.is_empty() {
            return None;
        }
        let (dx, dy) = candidates[rng.gen_range(0..candidates.len())];
        Some(self.translate(origin, dx, dy))
    }

    fn translate(&self, origin: Location, dx: i64, dy: i64) -> Location {
        Location::new(self.wrap_coord(origin.x as i64 + dx), self.wrap_coord(origin.y as i64 + dy))
    }

    fn wrap_coord(&self, value: i64) -> u32 {
        value.rem_euclid(self.size as i64) as u32
    }

    /// Inclusive range of normalised axis offsets.
    fn axis_range(&self) -> (i64, i64) {
        let size = self.size as i64;
        (-((size - 1) / 2), size / 2)
    }

    fn axis_offset(&self, from: u32, to: u32) -> i64 {
        let size = self.size as i64;
        let delta = (to as i64 - from as i64).rem_euclid(size);
        if delta > size / 2 {
            delta - size
        } else {
            delta
        }
    }

    fn is_half_way(&self, offset: i64) -> bool {
        self.size % 2 == 0 && offset.unsigned_abs() == u64::from(self.size / 2)
    }

    fn shortens(&self, heading: Direction, dx: i64, dy: i64) -> bool {
        let (along, _, forward) = heading.decompose(dx, dy);
        along != 0 && (along.signum() == forward || self.is_half_way(along))
    }

    fn reversal_penalty(&self, heading: Direction, dx: i64, dy: i64) -> u32 {
        let (along, across, forward) = heading.decompose(dx, dy);
        let behind = along != 0 && along.signum() != forward && !self.is_half_way(along);
        u32::from(across == 0 && behind)
    }
}

fn max_distance_for(size: u32) -> u32 {
    2 * (size / 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IndexedVehicle {
    id: VehicleId,
    entity: Entity,
    heading: Direction,
}

/// Idle vehicles bucketed by intersection.
///
/// Searching rings of increasing radius around a pickup gives the same
/// answer as a linear scan over vehicles in id order: the smallest dispatch
/// distance, ties broken by the lowest id.
#[derive(Debug, Default, Resource)]
pub struct SpatialIndex {
    buckets: HashMap<Location, Vec<IndexedVehicle>>,
    len: usize,
}

impl SpatialIndex {
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, location: Location, id: VehicleId, entity: Entity, heading: Direction) {
        let bucket = self.buckets.entry(location).or_default();
        let position = bucket.partition_point(|entry| entry.id < id);
        bucket.insert(position, IndexedVehicle { id, entity, heading });
        self.len += 1;
    }

    pub fn remove(&mut self, location: Location, id: VehicleId) -> bool {
        let Some(bucket) = self.buckets.get_mut(&location) else {
            return false;
        };
        let Ok(position) = bucket.binary_search_by_key(&id, |entry| entry.id) else {
            return false;
        };
        bucket.remove(position);
        if bucket.is_empty() {
            self.buckets.remove(&location);
        }
        self.len -= 1;
        true
    }

    /// Idle vehicle with the smallest dispatch distance to `target`.
    pub fn nearest(&self, city: &City, target: Location) -> Option<(Entity, VehicleId, u32)> {
        let mut best: Option<(u32, VehicleId, Entity)> = None;
        for radius in 0..=city.max_distance() {
            // A vehicle on ring `r` is at least `r` away once penalties apply.
            if matches!(best, Some((distance, _, _)) if radius > distance) {
                break;
            }
            for location in city.ring(target, radius) {
                let Some(bucket) = self.buckets.get(&location) else {
                    continue;
                };
                for entry in bucket {
                    let Some(distance) = city.dispatch_distance(
                        location,
                        entry.heading,
                        target,
                        VehiclePhase::Idle,
                        u32::MAX,
                    ) else {
                        continue;
                    };
                    let better = match best {
                        None => true,
                        Some((best_distance, best_id, _)) => (distance, entry.id) < (best_distance, best_id),
                    };
                    if better {
                        best = Some((distance, entry.id, entry.entity));
                    }
                }
            }
        }
        best.map(|(distance, id, entity)| (entity, id, distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn axis_offsets_are_normalised_into_half_open_range() {
        let even = City::new(8);
        assert_eq!(even.offset(Location::new(0, 0), Location::new(4, 7)), (4, -1));
        assert_eq!(even.offset(Location::new(4, 0), Location::new(0, 0)), (4, 0));
        let odd = City::new(5);
        assert_eq!(odd.offset(Location::new(0, 0), Location::new(3, 2)), (-2, 2));
    }

    #[test]
    fn distance_wraps_around_both_axes() {
        let city = City::new(10);
        assert_eq!(city.distance(Location::new(0, 0), Location::new(9, 9)), 2);
        assert_eq!(city.distance(Location::new(2, 3), Location::new(7, 3)), 5);
        assert_eq!(city.max_distance(), 10);
        assert_eq!(City::new(5).max_distance(), 4);
    }

    #[test]
    fn distance_is_a_metric_on_small_cities() {
        for size in [2, 3, 4, 5, 7, 8] {
            let city = City::new(size);
            let points: Vec<Location> = (0..size)
                .flat_map(|x| (0..size).map(move |y| Location::new(x, y)))
                .collect();
            for &a in &points {
                assert_eq!(city.distance(a, a), 0);
                for &b in &points {
                    let d = city.distance(a, b);
                    assert_eq!(d, city.distance(b, a), "size {size}: {a:?} {b:?}");
                    assert_eq!(d == 0, a == b);
                    assert!(d <= size && d <= city.max_distance());
                    let (dx, dy) = city.offset(a, b);
                    assert!(dx.unsigned_abs() <= u64::from(size / 2) && dy.unsigned_abs() <= u64::from(size / 2));
                    for &c in &points {
                        assert!(d <= city.distance(a, c) + city.distance(c, b), "size {size}: {a:?} {b:?} {c:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn step_wraps_at_city_edge() {
        let city = City::new(4);
        assert_eq!(city.step(Location::new(3, 0), Direction::East), Location::new(0, 0));
        assert_eq!(city.step(Location::new(0, 0), Direction::South), Location::new(0, 3));
    }

    #[test]
    fn turns_compose() {
        for heading in Direction::ALL {
            assert_eq!(heading.turn_left().turn_right(), heading);
            assert_eq!(heading.turn_left().turn_left(), heading.reverse());
        }
        assert_eq!(Direction::North.turn_right(), Direction::East);
    }

    #[test]
    fn dispatch_distance_adds_penalty_only_for_straight_behind() {
        let city = City::new(10);
        let origin = Location::new(5, 5);
        let horizon = city.dispatch_horizon();
        let ahead = city.dispatch_distance(origin, Direction::East, Location::new(7, 5), VehiclePhase::Idle, horizon);
        let behind = city.dispatch_distance(origin, Direction::East, Location::new(3, 5), VehiclePhase::Idle, horizon);
        let diagonal = city.dispatch_distance(origin, Direction::East, Location::new(3, 6), VehiclePhase::Idle, horizon);
        assert_eq!(ahead, Some(2));
        assert_eq!(behind, Some(3));
        assert_eq!(diagonal, Some(3));
    }

    #[test]
    fn dispatch_distance_is_floored_and_skips_occupied() {
        let city = City::new(6);
        let here = Location::new(1, 1);
        let horizon = city.dispatch_horizon();
        assert_eq!(city.dispatch_distance(here, Direction::North, here, VehiclePhase::Idle, horizon), Some(1));
        assert_eq!(city.dispatch_distance(here, Direction::North, here, VehiclePhase::Occupied, horizon), None);
        assert_eq!(
            city.dispatch_distance(here, Direction::North, Location::new(1, 2), VehiclePhase::Dispatched, horizon),
            Some(1)
        );
    }

    #[test]
    fn dispatch_distance_respects_threshold_strictly() {
        let city = City::new(10);
        let from = Location::new(0, 0);
        let to = Location::new(2, 1);
        assert_eq!(city.dispatch_distance(from, Direction::East, to, VehiclePhase::Idle, 4), Some(3));
        assert_eq!(city.dispatch_distance(from, Direction::East, to, VehiclePhase::Idle, 3), None);
        assert_eq!(city.dispatch_distance(from, Direction::East, to, VehiclePhase::Idle, 2), None);
    }

    #[test]
    fn half_way_round_is_never_behind() {
        let city = City::new(8);
        let from = Location::new(0, 0);
        let opposite = Location::new(4, 0);
        for heading in [Direction::East, Direction::West] {
            assert_eq!(
                city.dispatch_distance(from, heading, opposite, VehiclePhase::Idle, city.dispatch_horizon()),
                Some(4)
            );
            assert_eq!(city.next_heading(from, heading, opposite), Some(heading));
        }
    }

    #[test]
    fn route_prefers_heading_then_turns_then_reverses() {
        let city = City::new(10);
        let from = Location::new(5, 5);
        assert_eq!(city.next_heading(from, Direction::East, Location::new(8, 7)), Some(Direction::East));
        assert_eq!(city.next_heading(from, Direction::East, Location::new(5, 7)), Some(Direction::North));
        assert_eq!(city.next_heading(from, Direction::East, Location::new(5, 2)), Some(Direction::South));
        assert_eq!(city.next_heading(from, Direction::East, Location::new(2, 5)), Some(Direction::West));
        assert_eq!(city.next_heading(from, Direction::East, from), None);
    }

    #[test]
    fn route_length_matches_dispatch_distance() {
        let city = City::new(7);
        let start = Location::new(3, 3);
        for heading in Direction::ALL {
            for target in (0..7).flat_map(|x| (0..7).map(move |y| Location::new(x, y))) {
                let mut location = start;
                let mut current = heading;
                let mut blocks = 0;
                while let Some(next) = city.next_heading(location, current, target) {
                    if next != current.reverse() {
                        location = city.step(location, next);
                    }
                    current = next;
                    blocks += 1;
                    assert!(blocks <= 20, "route to {target:?} does not converge");
                }
                let expected = city
                    .dispatch_distance(start, heading, target, VehiclePhase::Idle, city.dispatch_horizon())
                    .expect("idle vehicle always has a distance");
                assert_eq!(blocks.max(1), expected, "heading {heading:?} target {target:?}");
            }
        }
    }

    #[test]
    fn ring_lists_each_intersection_once() {
        let city = City::new(6);
        let center = Location::new(2, 2);
        let mut seen = std::collections::HashSet::new();
        for radius in 0..=city.max_distance() {
            for location in city.ring(center, radius) {
                assert_eq!(city.distance(center, location), radius);
                assert!(seen.insert(location), "{location:?} listed twice");
            }
        }
        assert_eq!(seen.len(), 36);
    }

    #[test]
    fn sampled_trips_respect_distance_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        for city in [
            City::new(9).with_trip_distance(2, Some(3)),
            City::new(40).with_trip_distance(10, None),
            City::new(12).with_inhomogeneity(0.8, true).with_trip_distance(1, Some(4)),
        ] {
            for _ in 0..200 {
                let origin = city.sample_location(&mut rng);
                assert!(city.contains(origin));
                let destination = city.sample_trip_destination(&mut rng, origin);
                assert!(city.contains(destination));
                assert!(city.is_admissible_trip(city.distance(origin, destination)));
            }
        }
    }

    #[test]
    fn inhomogeneous_origins_cluster_in_central_zone() {
        let city = City::new(20).with_inhomogeneity(1.0, false);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let location = city.sample_location(&mut rng);
            assert!((5..15).contains(&location.x) && (5..15).contains(&location.y));
        }
    }

    #[test]
    fn homogeneous_destinations_have_no_directional_bias() {
        let city = City::new(11).with_trip_distance(1, Some(1));
        let mut rng = StdRng::seed_from_u64(5);
        let origin = Location::new(5, 5);
        let mut counts = HashMap::new();
        for _ in 0..4000 {
            *counts.entry(city.sample_trip_destination(&mut rng, origin)).or_insert(0) += 1;
        }
        assert_eq!(counts.len(), 4);
        for count in counts.values() {
            assert!((800..1200).contains(count), "counts {counts:?}");
        }
    }

    #[test]
    fn resize_caps_trip_bounds() {
        let mut city = City::new(20).with_trip_distance(12, Some(18));
        city.resize(8);
        assert_eq!(city.max_trip_distance(), 8);
        assert_eq!(city.min_trip_distance(), 8);
        assert_eq!(city.wrap(Location::new(13, 9)), Location::new(5, 1));
    }

    #[test]
    fn spatial_index_matches_linear_scan() {
        let city = City::new(9);
        let mut rng = StdRng::seed_from_u64(21);
        let mut index = SpatialIndex::default();
        let mut vehicles = Vec::new();
        for raw in 0..12u32 {
            let location = city.uniform_location(&mut rng);
            let heading = Direction::ALL[rng.gen_range(0..4)];
            let id = VehicleId(u64::from(raw));
            let entity = Entity::from_raw(raw);
            index.insert(location, id, entity, heading);
            vehicles.push((id, entity, location, heading));
        }
        for target in (0..9).flat_map(|x| (0..9).map(move |y| Location::new(x, y))) {
            let mut threshold = city.dispatch_horizon();
            let mut linear = None;
            for (id, entity, location, heading) in &vehicles {
                if let Some(distance) =
                    city.dispatch_distance(*location, *heading, target, VehiclePhase::Idle, threshold)
                {
                    threshold = distance;
                    linear = Some((*entity, *id, distance));
                }
            }
            assert_eq!(index.nearest(&city, target), linear, "target {target:?}");
        }
    }

    #[test]
    fn spatial_index_remove_keeps_len_in_sync() {
        let mut index = SpatialIndex::default();
        let here = Location::new(1, 1);
        index.insert(here, VehicleId(2), Entity::from_raw(2), Direction::North);
        index.insert(here, VehicleId(1), Entity::from_raw(1), Direction::North);
        assert_eq!(index.len(), 2);
        assert!(index.remove(here, VehicleId(2)));
        assert!(!index.remove(here, VehicleId(2)));
        assert_eq!(index.len(), 1);
        let nearest = index.nearest(&City::new(4), here);
        assert_eq!(nearest, Some((Entity::from_raw(1), VehicleId(1), 1)));
    }
}
