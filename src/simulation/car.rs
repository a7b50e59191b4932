//! Car movement logic for the intersection simulation
//!
//! Cars use a binary model: each tick a car either speeds up by
//! [`MIN_ACCEL_INTERVAL`] or slows down by the same amount, depending on
//! whether the way ahead is clear.

use super::nodes::TrafficNode;
use super::state::TrafficState;
use super::types::{CarId, LaneId, NodeId, MIN_ACCEL_INTERVAL};

/// Result of moving a car for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarMove {
    /// Car advanced along its lane to the given position
    Advanced(u32),
    /// Car left its lane and was handed to the exit node
    HandedOff(NodeId),
    /// Car would overrun its lane but the exit node refused it
    Held,
    /// Car is not on any lane (in transit or released)
    Detached,
}

/// A car in the simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimCar {
    pub id: CarId,
    pub speed: u32,
    pub position: u32,
    /// `None` once the car has left its lane for a node
    pub lane: Option<LaneId>,
}

impl SimCar {
    pub fn new(id: CarId) -> Self {
        Self {
            id,
            speed: 0,
            position: 0,
            lane: None,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.speed > 0
    }

    pub fn accelerate(&mut self) {
        self.speed += MIN_ACCEL_INTERVAL;
    }

    pub fn decelerate(&mut self) {
        self.speed = self.speed.saturating_sub(MIN_ACCEL_INTERVAL);
    }

    pub fn reset_position(&mut self) {
        self.position = 0;
    }

    /// Whether the car could advance this tick.
    ///
    /// A stopped car looks [`MIN_ACCEL_INTERVAL`] ahead. Running past the end
    /// of the lane asks the exit node; running onto another car defers to
    /// whether that car can move. Positions strictly increase along the
    /// chain, so the recursion ends within the lane length.
    pub fn can_move(&self, state: &TrafficState, nodes: &[TrafficNode]) -> bool {
        let Some(lane) = self.lane.and_then(|id| state.lane(id)) else {
            return false;
        };

        let interval = if self.is_moving() {
            self.speed
        } else {
            MIN_ACCEL_INTERVAL
        };
        let future_position = self.position + interval;

        if future_position > lane.length() {
            return nodes
                .get(lane.exit().0)
                .is_some_and(|node| node.can_enter(lane.id));
        }

        match lane
            .find_car_at(future_position, &state.cars)
            .and_then(|id| state.car(id))
        {
            Some(blocking) => blocking.can_move(state, nodes),
            None => true,
        }
    }
}

/// Apply the speed rule to a car: speed up if it can move and is stopped,
/// slow down if it cannot move and is moving.
pub fn adjust_speed(car_id: CarId, state: &mut TrafficState, nodes: &[TrafficNode]) {
    let Some(movable) = state.car(car_id).map(|car| car.can_move(state, nodes)) else {
        return;
    };

    if let Some(car) = state.car_mut(car_id) {
        if movable && !car.is_moving() {
            car.accelerate();
        } else if !movable && car.is_moving() {
            car.decelerate();
        }
    }
}

/// Advance a car by its current speed.
///
/// Overrunning the lane re-checks the exit node and, if it still admits the
/// car, hands it over and detaches it from the lane. A refused car stays put.
pub fn move_car(car_id: CarId, state: &mut TrafficState, nodes: &mut [TrafficNode]) -> CarMove {
    let Some((lane_id, future_position)) = state
        .car(car_id)
        .and_then(|car| car.lane.map(|lane| (lane, car.position + car.speed)))
    else {
        return CarMove::Detached;
    };
    let Some((length, exit)) = state.lane(lane_id).map(|lane| (lane.length(), lane.exit())) else {
        return CarMove::Detached;
    };

    if future_position > length {
        let Some(node) = nodes.get_mut(exit.0) else {
            return CarMove::Held;
        };
        if !node.can_enter(lane_id) {
            return CarMove::Held;
        }
        node.accept(lane_id, car_id);
        state.detach_car(car_id);
        return CarMove::HandedOff(exit);
    }

    if let Some(car) = state.car_mut(car_id) {
        car.position = future_position;
    }
    CarMove::Advanced(future_position)
}

/// One full motion step for a car: speed rule, then move. Cars parked inside
/// a node keep their speed untouched.
pub fn update_car(car_id: CarId, state: &mut TrafficState, nodes: &mut [TrafficNode]) -> CarMove {
    if !state.car(car_id).is_some_and(|car| car.lane.is_some()) {
        return CarMove::Detached;
    }
    adjust_speed(car_id, state, nodes);
    move_car(car_id, state, nodes)
}
