//! Mutable traffic state shared by the tick and its notification handlers
//!
//! Lanes and cars live in arenas owned here and refer to each other only by
//! id. Everything in this struct is guarded by the world lock.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::Rng;

use super::car::SimCar;
use super::lane::SimLane;
use super::notifications::{Notification, NotificationBus};
use super::stats::SimStats;
use super::types::{CarId, LaneId};

/// Lanes, cars and counters
#[derive(Debug, Default)]
pub struct TrafficState {
    pub lanes: Vec<SimLane>,
    /// Live cars, keyed by id. Ids grow monotonically so iteration follows
    /// creation order.
    pub cars: BTreeMap<CarId, SimCar>,
    pub stats: SimStats,
    next_car_id: usize,
}

impl TrafficState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lane(&self, id: LaneId) -> Option<&SimLane> {
        self.lanes.get(id.0)
    }

    pub fn lane_mut(&mut self, id: LaneId) -> Option<&mut SimLane> {
        self.lanes.get_mut(id.0)
    }

    pub fn car(&self, id: CarId) -> Option<&SimCar> {
        self.cars.get(&id)
    }

    pub fn car_mut(&mut self, id: CarId) -> Option<&mut SimCar> {
        self.cars.get_mut(&id)
    }

    /// Car sitting at `position` on `lane`, if any
    pub fn find_car_at(&self, lane: LaneId, position: u32) -> Option<CarId> {
        self.lane(lane)?.find_car_at(position, &self.cars)
    }

    /// Whether a car could be placed at position 0 of `lane`
    pub fn is_entry_free(&self, lane: LaneId) -> bool {
        self.lane(lane).is_some() && self.find_car_at(lane, 0).is_none()
    }

    fn next_car_id(&mut self) -> CarId {
        let id = CarId(self.next_car_id);
        self.next_car_id += 1;
        id
    }

    /// Allocate a stopped car at the start of `lane`.
    ///
    /// Returns `None` without allocating when position 0 is taken.
    pub fn spawn_car(&mut self, lane: LaneId) -> Option<CarId> {
        if !self.is_entry_free(lane) {
            return None;
        }
        let id = self.next_car_id();
        let mut car = SimCar::new(id);
        car.lane = Some(lane);
        self.lane_mut(lane)?.add_car(id);
        self.cars.insert(id, car);
        self.stats.cars_spawned += 1;
        Some(id)
    }

    /// Allocate a car at an arbitrary spot, for scenario setup
    pub fn insert_car(&mut self, lane: LaneId, position: u32, speed: u32) -> Result<CarId> {
        let length = self.lane(lane).context("Lane not found")?.length();
        if position > length {
            anyhow::bail!("Position {} is past the end of {} (length {})", position, lane, length);
        }
        if let Some(occupant) = self.find_car_at(lane, position) {
            anyhow::bail!("Position {} on {} is already held by {}", position, lane, occupant);
        }

        let id = self.next_car_id();
        let mut car = SimCar::new(id);
        car.lane = Some(lane);
        car.position = position;
        car.speed = speed;
        self.lane_mut(lane).context("Lane not found")?.add_car(id);
        self.cars.insert(id, car);
        self.stats.cars_spawned += 1;
        Ok(id)
    }

    /// Allocate a car that belongs to no lane yet
    pub fn insert_detached_car(&mut self) -> CarId {
        let id = self.next_car_id();
        self.cars.insert(id, SimCar::new(id));
        self.stats.cars_spawned += 1;
        id
    }

    /// Free a car. Returns `None` for an id that is no longer live.
    pub fn release_car(&mut self, id: CarId) -> Option<SimCar> {
        let car = self.cars.remove(&id)?;
        if let Some(lane) = car.lane.and_then(|lane| self.lanes.get_mut(lane.0)) {
            lane.remove_car(id);
        }
        self.stats.cars_released += 1;
        Some(car)
    }

    /// Take a car off its lane without freeing it
    pub fn detach_car(&mut self, id: CarId) {
        let Some(lane) = self.cars.get_mut(&id).and_then(|car| car.lane.take()) else {
            return;
        };
        if let Some(lane) = self.lanes.get_mut(lane.0) {
            lane.remove_car(id);
        }
    }

    /// Put a car at the start of `lane`. Speed is kept.
    pub fn attach_car(&mut self, id: CarId, lane: LaneId) {
        let Some(car) = self.cars.get_mut(&id) else {
            return;
        };
        car.lane = Some(lane);
        car.reset_position();
        if let Some(lane) = self.lanes.get_mut(lane.0) {
            lane.add_car(id);
        }
    }

    /// Number of cars currently on a lane (excludes cars held by nodes)
    pub fn cars_on_lanes(&self) -> usize {
        self.cars.values().filter(|car| car.lane.is_some()).count()
    }
}

/// Everything a node may touch while it is processed during a tick
pub struct TickContext<'a> {
    pub state: &'a mut TrafficState,
    pub bus: &'a NotificationBus<TrafficState>,
    pub rng: &'a mut Option<StdRng>,
}

impl TickContext<'_> {
    /// Publish a lifecycle notification; handlers run before this returns
    pub fn publish(&mut self, notification: Notification) {
        self.bus.publish(self.state, notification);
    }

    /// Get a random value in the given range, using the seeded RNG if available
    pub fn random_range(&mut self, range: std::ops::RangeInclusive<u32>) -> u32 {
        match self.rng.as_mut() {
            Some(rng) => rng.random_range(range),
            None => rand::rng().random_range(range),
        }
    }
}
