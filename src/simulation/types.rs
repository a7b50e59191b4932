//! Core types for the intersection simulation
//!
//! These are plain identifiers and constants shared by every part of the model.

use std::fmt;

/// Handle to a car in the engine-owned car arena.
///
/// Ids are handed out monotonically and never reused, so a stale handle
/// simply fails to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CarId(pub usize);

/// Handle to a lane. Lanes live for the whole lifetime of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LaneId(pub usize);

/// Handle to a traffic node (generator, sink or junction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "car#{}", self.0)
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Cardinal side of the junction a lane sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    West,
    South,
    East,
}

/// Whether a lane runs towards the junction or away from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heading {
    Inbound,
    Outbound,
}

/// Where a lane is drawn. Only renderers care about this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LanePlacement {
    pub direction: Direction,
    pub heading: Heading,
}

impl LanePlacement {
    pub fn new(direction: Direction, heading: Heading) -> Self {
        Self { direction, heading }
    }
}

/// Speed step used for both acceleration and deceleration, and the look-ahead
/// distance of a stopped car.
pub const MIN_ACCEL_INTERVAL: u32 = 2;

/// Default length of every lane in the standard layout
pub const DEFAULT_LANE_LENGTH: u32 = 50;

/// A generator requests a car when its roll in 1..=100 is divisible by this
pub const SPAWN_DIVISOR: u32 = 5;
