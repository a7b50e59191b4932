//! Lanes: bounded one-dimensional tracks between two nodes

use std::collections::BTreeMap;

use super::car::SimCar;
use super::types::{CarId, LaneId, LanePlacement, NodeId};

/// A one-way lane. Cars enter at position 0 from the `entry` node and leave
/// past `length` into the `exit` node.
#[derive(Debug, Clone)]
pub struct SimLane {
    pub id: LaneId,
    length: u32,
    entry: NodeId,
    exit: NodeId,
    placement: Option<LanePlacement>,
    /// Cars currently on the lane, in the order they arrived
    cars: Vec<CarId>,
}

impl SimLane {
    pub fn new(id: LaneId, entry: NodeId, exit: NodeId, length: u32) -> Self {
        Self {
            id,
            length,
            entry,
            exit,
            placement: None,
            cars: Vec::new(),
        }
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    /// The node that feeds cars into this lane
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// The node that receives cars leaving this lane
    pub fn exit(&self) -> NodeId {
        self.exit
    }

    pub fn placement(&self) -> Option<LanePlacement> {
        self.placement
    }

    pub fn set_placement(&mut self, placement: LanePlacement) {
        self.placement = Some(placement);
    }

    pub fn cars(&self) -> &[CarId] {
        &self.cars
    }

    pub fn add_car(&mut self, car: CarId) {
        if !self.cars.contains(&car) {
            self.cars.push(car);
        }
    }

    pub fn remove_car(&mut self, car: CarId) {
        self.cars.retain(|c| *c != car);
    }

    /// First car on this lane sitting at `position`
    pub fn find_car_at(&self, position: u32, cars: &BTreeMap<CarId, SimCar>) -> Option<CarId> {
        self.cars
            .iter()
            .copied()
            .find(|id| cars.get(id).is_some_and(|car| car.position == position))
    }
}
