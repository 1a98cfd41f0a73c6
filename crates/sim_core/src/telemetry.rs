//! Telemetry / KPIs: per-block statistics, rolling history windows and
//! state snapshots.

use std::collections::VecDeque;
use std::ops::AddAssign;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::ecs::{TripId, TripPhase, VehicleId, VehiclePhase};
use crate::spatial::{Direction, Location};

/// Event counters for one block. Waiting is recorded as each assignment ends,
/// at pickup or at release by forward dispatch; the other per-trip durations
/// are recorded when the trip completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEvents {
    pub requests: u64,
    pub assignments: u64,
    /// Assignments that redirected an already dispatched vehicle.
    pub forward_dispatches: u64,
    pub cancellations: u64,
    pub completions: u64,
    pub wait_blocks: u64,
    pub unassigned_blocks: u64,
    pub ride_blocks: u64,
    pub trip_distance: u64,
}

impl AddAssign for BlockEvents {
    fn add_assign(&mut self, other: Self) {
        self.requests += other.requests;
        self.assignments += other.assignments;
        self.forward_dispatches += other.forward_dispatches;
        self.cancellations += other.cancellations;
        self.completions += other.completions;
        self.wait_blocks += other.wait_blocks;
        self.unassigned_blocks += other.unassigned_blocks;
        self.ride_blocks += other.ride_blocks;
        self.trip_distance += other.trip_distance;
    }
}

/// One history record: phase counts observed at the end of a block plus the
/// events of that block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStats {
    pub block: u64,
    pub vehicles: u64,
    pub idle: u64,
    pub dispatched: u64,
    pub occupied: u64,
    /// Trips still UNASSIGNED at the end of the block.
    pub unassigned_trips: u64,
    #[serde(flatten)]
    pub events: BlockEvents,
}

impl BlockStats {
    pub fn count_vehicle(&mut self, phase: VehiclePhase) {
        self.vehicles += 1;
        match phase {
            VehiclePhase::Idle => self.idle += 1,
            VehiclePhase::Dispatched => self.dispatched += 1,
            VehiclePhase::Occupied => self.occupied += 1,
        }
    }
}

/// Running sums over any span of blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    pub blocks: u64,
    pub vehicle_blocks: u64,
    pub idle_blocks: u64,
    pub dispatched_blocks: u64,
    pub occupied_blocks: u64,
    pub unassigned_trip_blocks: u64,
    #[serde(flatten)]
    pub events: BlockEvents,
}

impl RunTotals {
    pub fn record(&mut self, stats: &BlockStats) {
        self.blocks += 1;
        self.vehicle_blocks += stats.vehicles;
        self.idle_blocks += stats.idle;
        self.dispatched_blocks += stats.dispatched;
        self.occupied_blocks += stats.occupied;
        self.unassigned_trip_blocks += stats.unassigned_trips;
        self.events += stats.events;
    }

    pub fn from_stats<'a>(stats: impl IntoIterator<Item = &'a BlockStats>) -> Self {
        let mut totals = Self::default();
        for record in stats {
            totals.record(record);
        }
        totals
    }

    /// Vehicle-time in OCCUPIED over the summed ride time of completed trips
    /// (`n·P3 / (r·L)`); close to 1 in steady state.
    pub fn busy_time_ratio(&self) -> Option<f64> {
        ratio(self.occupied_blocks, self.events.ride_blocks)
    }

    /// Vehicle-time in DISPATCHED over the summed wait time of every ended
    /// assignment (`n·P2 / (r·W)`); close to 1 in steady state.
    pub fn dispatch_time_ratio(&self) -> Option<f64> {
        ratio(self.dispatched_blocks, self.events.wait_blocks)
    }
}

/// Cumulative counters for the whole run plus the tally of the block in
/// progress, which systems add to as events happen.
#[derive(Debug, Default, Resource)]
pub struct SimTelemetry {
    pub current: BlockEvents,
    pub totals: RunTotals,
}

/// Fixed-capacity ring buffer; the oldest value is overwritten once full.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    slots: Vec<T>,
    capacity: usize,
    next: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "rolling window needs a positive capacity");
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn push(&mut self, value: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(value);
        } else {
            self.slots[self.next] = value;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    pub fn latest(&self) -> Option<&T> {
        self.recent(1).next()
    }

    /// The last `count` values, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &T> + '_ {
        let len = self.slots.len();
        let count = count.min(len);
        let start = if len == 0 { 0 } else { (self.next + len - count) % len };
        (0..count).map(move |offset| &self.slots[(start + offset) % len])
    }
}

/// Per-block statistics for the most recent blocks. Capacity covers both the
/// smoothing window used by equilibration and the results window.
#[derive(Debug, Clone, Resource)]
pub struct History {
    records: RollingWindow<BlockStats>,
    smoothing_window: usize,
    results_window: usize,
}

impl History {
    pub fn new(smoothing_window: usize, results_window: usize) -> Self {
        let smoothing_window = smoothing_window.max(1);
        let results_window = results_window.max(1);
        Self {
            records: RollingWindow::new(smoothing_window.max(results_window)),
            smoothing_window,
            results_window,
        }
    }

    pub fn push(&mut self, stats: BlockStats) {
        self.records.push(stats);
    }

    pub fn recorded(&self) -> usize {
        self.records.len()
    }

    pub fn latest(&self) -> Option<&BlockStats> {
        self.records.latest()
    }

    pub fn smoothing_window(&self) -> usize {
        self.smoothing_window
    }

    pub fn results_window(&self) -> usize {
        self.results_window
    }

    pub fn recent(&self, blocks: usize) -> impl Iterator<Item = &BlockStats> + '_ {
        self.records.recent(blocks)
    }

    /// Metrics over the last `blocks` recorded blocks (fewer early in a run).
    pub fn window_metrics(&self, blocks: usize) -> WindowMetrics {
        WindowMetrics::from_totals(&RunTotals::from_stats(self.recent(blocks)))
    }

    pub fn smoothed(&self) -> WindowMetrics {
        self.window_metrics(self.smoothing_window)
    }

    pub fn results(&self) -> WindowMetrics {
        self.window_metrics(self.results_window)
    }
}

/// Averages over a span of blocks. Rates are per block; durations are in
/// blocks per completed trip; fractions are of vehicle-time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub blocks: u64,
    pub mean_vehicle_count: f64,
    pub idle_fraction: f64,
    pub dispatched_fraction: f64,
    pub occupied_fraction: f64,
    pub request_rate: f64,
    pub completion_rate: f64,
    pub mean_wait_time: f64,
    pub mean_unassigned_time: f64,
    pub mean_ride_time: f64,
    pub mean_trip_distance: f64,
    pub mean_unassigned_trips: f64,
    pub forward_dispatch_fraction: f64,
    pub cancellation_fraction: f64,
}

impl WindowMetrics {
    pub fn from_totals(totals: &RunTotals) -> Self {
        let events = &totals.events;
        Self {
            blocks: totals.blocks,
            mean_vehicle_count: mean(totals.vehicle_blocks, totals.blocks),
            idle_fraction: mean(totals.idle_blocks, totals.vehicle_blocks),
            dispatched_fraction: mean(totals.dispatched_blocks, totals.vehicle_blocks),
            occupied_fraction: mean(totals.occupied_blocks, totals.vehicle_blocks),
            request_rate: mean(events.requests, totals.blocks),
            completion_rate: mean(events.completions, totals.blocks),
            mean_wait_time: mean(events.wait_blocks, events.completions),
            mean_unassigned_time: mean(events.unassigned_blocks, events.completions),
            mean_ride_time: mean(events.ride_blocks, events.completions),
            mean_trip_distance: mean(events.trip_distance, events.completions),
            mean_unassigned_trips: mean(totals.unassigned_trip_blocks, totals.blocks),
            forward_dispatch_fraction: mean(events.forward_dispatches, events.assignments),
            cancellation_fraction: mean(events.cancellations, events.requests),
        }
    }

    pub fn phase_fraction_sum(&self) -> f64 {
        self.idle_fraction + self.dispatched_fraction + self.occupied_fraction
    }
}

fn mean(sum: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub location: Location,
    pub heading: Direction,
    pub phase: VehiclePhase,
    pub trip: Option<TripId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSnapshot {
    pub id: TripId,
    pub origin: Location,
    pub destination: Location,
    pub distance: u32,
    pub phase: TripPhase,
    pub vehicle: Option<VehicleId>,
    pub requested_at: u64,
    pub assigned_at: Option<u64>,
    pub picked_up_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub cancelled_at: Option<u64>,
    pub wait_time: u64,
    pub unassigned_time: u64,
}

/// Full state at the end of one block. Vehicles and trips are ordered by id
/// so equal states serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub block: u64,
    pub city_size: u32,
    pub fleet_target: usize,
    pub effective_demand: f64,
    pub stats: BlockStats,
    pub smoothed: WindowMetrics,
    pub vehicles: Vec<VehicleSnapshot>,
    pub trips: Vec<TripSnapshot>,
}

/// Snapshot capture configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct SimSnapshotConfig {
    pub enabled: bool,
    /// Capture every `interval` blocks.
    pub interval: u64,
    pub max_snapshots: usize,
}

impl Default for SimSnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 1,
            max_snapshots: 1_000,
        }
    }
}

impl SimSnapshotConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Rolling snapshot buffer.
#[derive(Debug, Default, Resource)]
pub struct SimSnapshots {
    pub snapshots: VecDeque<BlockSnapshot>,
    pub last_snapshot_at: Option<u64>,
}

impl SimSnapshots {
    pub fn latest(&self) -> Option<&BlockSnapshot> {
        self.snapshots.back()
    }

    pub fn push(&mut self, snapshot: BlockSnapshot, max_snapshots: usize) {
        self.last_snapshot_at = Some(snapshot.block);
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > max_snapshots {
            self.snapshots.pop_front();
        }
    }
}

/// Checks the cross-entity invariants of a snapshot. Returns a description
/// of the first violation.
pub fn validate_block_snapshot(snapshot: &BlockSnapshot) -> Option<String> {
    if !snapshot.vehicles.windows(2).all(|pair| pair[0].id < pair[1].id) {
        return Some("vehicles are not ordered by id".to_string());
    }
    if !snapshot.trips.windows(2).all(|pair| pair[0].id < pair[1].id) {
        return Some("trips are not ordered by id".to_string());
    }
    let find_trip = |id: TripId| {
        snapshot
            .trips
            .binary_search_by_key(&id, |trip| trip.id)
            .ok()
            .map(|index| &snapshot.trips[index])
    };
    let find_vehicle = |id: VehicleId| {
        snapshot
            .vehicles
            .binary_search_by_key(&id, |vehicle| vehicle.id)
            .ok()
            .map(|index| &snapshot.vehicles[index])
    };

    let mut counted = BlockStats::default();
    for vehicle in &snapshot.vehicles {
        counted.count_vehicle(vehicle.phase);
        let expected_trip_phase = match vehicle.phase {
            VehiclePhase::Idle => {
                if vehicle.trip.is_some() {
                    return Some(format!("idle vehicle {:?} holds a trip", vehicle.id));
                }
                continue;
            }
            VehiclePhase::Dispatched => TripPhase::Waiting,
            VehiclePhase::Occupied => TripPhase::Riding,
        };
        let Some(trip) = vehicle.trip.and_then(find_trip) else {
            return Some(format!("{:?} vehicle {:?} has no trip", vehicle.phase, vehicle.id));
        };
        if trip.phase != expected_trip_phase || trip.vehicle != Some(vehicle.id) {
            return Some(format!(
                "vehicle {:?} ({:?}) and trip {:?} ({:?}) disagree",
                vehicle.id, vehicle.phase, trip.id, trip.phase
            ));
        }
    }
    if (counted.idle, counted.dispatched, counted.occupied)
        != (snapshot.stats.idle, snapshot.stats.dispatched, snapshot.stats.occupied)
    {
        return Some(format!("phase counts {counted:?} do not match stats {:?}", snapshot.stats));
    }

    for trip in &snapshot.trips {
        let engaged = matches!(trip.phase, TripPhase::Waiting | TripPhase::Riding);
        match (engaged, trip.vehicle) {
            (true, None) => return Some(format!("{:?} trip {:?} has no vehicle", trip.phase, trip.id)),
            (false, Some(_)) => return Some(format!("{:?} trip {:?} holds a vehicle", trip.phase, trip.id)),
            (true, Some(id)) if find_vehicle(id).and_then(|vehicle| vehicle.trip) != Some(trip.id) => {
                return Some(format!("trip {:?} points at vehicle {id:?} serving another trip", trip.id));
            }
            _ => {}
        }
        let ordered = [trip.assigned_at, trip.picked_up_at, trip.completed_at]
            .into_iter()
            .flatten()
            .try_fold(trip.requested_at, |previous, at| (at >= previous).then_some(at))
            .is_some();
        if !ordered {
            return Some(format!("trip {:?} timestamps are out of order", trip.id));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(block: u64, idle: u64, dispatched: u64, occupied: u64) -> BlockStats {
        BlockStats {
            block,
            vehicles: idle + dispatched + occupied,
            idle,
            dispatched,
            occupied,
            ..BlockStats::default()
        }
    }

    #[test]
    fn rolling_window_overwrites_oldest() {
        let mut window = RollingWindow::new(3);
        for value in 0..5 {
            window.push(value);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.recent(10).copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(window.recent(2).copied().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(window.latest(), Some(&4));
    }

    #[test]
    fn rolling_window_before_full() {
        let mut window = RollingWindow::new(4);
        assert_eq!(window.latest(), None::<&u8>);
        window.push(1u8);
        window.push(2);
        assert_eq!(window.recent(4).copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn window_metrics_average_recent_blocks() {
        let mut history = History::new(2, 4);
        history.push(stats(0, 4, 0, 0));
        history.push(stats(1, 2, 1, 1));
        let mut busy = stats(2, 0, 2, 2);
        busy.events.completions = 2;
        busy.events.ride_blocks = 6;
        busy.events.wait_blocks = 2;
        history.push(busy);

        let smoothed = history.smoothed();
        assert_eq!(smoothed.blocks, 2);
        assert!((smoothed.occupied_fraction - 3.0 / 8.0).abs() < 1e-12);
        assert!((smoothed.mean_ride_time - 3.0).abs() < 1e-12);
        assert!((smoothed.phase_fraction_sum() - 1.0).abs() < 1e-12);

        let results = history.results();
        assert_eq!(results.blocks, 3);
        assert!((results.mean_vehicle_count - 4.0).abs() < 1e-12);
    }

    #[test]
    fn empty_window_is_all_zero() {
        let metrics = History::new(5, 5).results();
        assert_eq!(metrics, WindowMetrics::default());
    }

    #[test]
    fn validation_ratios_need_completed_trips() {
        let mut totals = RunTotals::default();
        totals.record(&stats(0, 1, 1, 2));
        assert_eq!(totals.busy_time_ratio(), None);
        totals.events.ride_blocks = 4;
        totals.events.wait_blocks = 2;
        assert_eq!(totals.busy_time_ratio(), Some(0.5));
        assert_eq!(totals.dispatch_time_ratio(), Some(0.5));
    }

    #[test]
    fn snapshot_buffer_is_bounded() {
        let mut snapshots = SimSnapshots::default();
        for block in 0..5 {
            snapshots.push(
                BlockSnapshot {
                    block,
                    city_size: 4,
                    fleet_target: 0,
                    effective_demand: 0.0,
                    stats: BlockStats::default(),
                    smoothed: WindowMetrics::default(),
                    vehicles: Vec::new(),
                    trips: Vec::new(),
                },
                2,
            );
        }
        assert_eq!(snapshots.snapshots.len(), 2);
        assert_eq!(snapshots.latest().map(|s| s.block), Some(4));
        assert_eq!(snapshots.last_snapshot_at, Some(4));
    }

    #[test]
    fn validation_flags_vehicle_trip_mismatch() {
        let trip = TripSnapshot {
            id: TripId(0),
            origin: Location::new(0, 0),
            destination: Location::new(1, 0),
            distance: 1,
            phase: TripPhase::Riding,
            vehicle: Some(VehicleId(0)),
            requested_at: 0,
            assigned_at: Some(0),
            picked_up_at: Some(1),
            completed_at: None,
            cancelled_at: None,
            wait_time: 1,
            unassigned_time: 0,
        };
        let vehicle = VehicleSnapshot {
            id: VehicleId(0),
            location: Location::new(0, 0),
            heading: Direction::East,
            phase: VehiclePhase::Occupied,
            trip: Some(TripId(0)),
        };
        let mut snapshot = BlockSnapshot {
            block: 1,
            city_size: 4,
            fleet_target: 1,
            effective_demand: 0.0,
            stats: stats(1, 0, 0, 1),
            smoothed: WindowMetrics::default(),
            vehicles: vec![vehicle],
            trips: vec![trip],
        };
        assert_eq!(validate_block_snapshot(&snapshot), None);

        snapshot.trips[0].phase = TripPhase::Waiting;
        assert!(validate_block_snapshot(&snapshot).is_some());

        snapshot.trips[0].phase = TripPhase::Riding;
        snapshot.trips[0].picked_up_at = None;
        snapshot.trips[0].completed_at = Some(0);
        snapshot.trips[0].assigned_at = Some(2);
        assert!(validate_block_snapshot(&snapshot).is_some());
    }
}
