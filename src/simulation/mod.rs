//! Single-intersection traffic simulation
//!
//! This module contains the traffic model (lanes, cars, generators, sinks and
//! the signalized junction) and the threaded engine that runs it. Rendering
//! lives outside, in [`crate::render`].

mod car;
mod config;
mod engine;
mod intersection;
mod lane;
mod monitor;
mod nodes;
mod notifications;
mod road_network;
mod state;
mod stats;
mod types;
mod world;

pub use car::{CarMove, SimCar};
pub use config::{
    SimConfig, DEFAULT_COLLISION_LOG, DEFAULT_MONITOR_PERIOD, DEFAULT_SIGNAL_PERIOD,
    DEFAULT_TICK_PERIOD,
};
pub use engine::{lock_world, SimulationEngine};
pub use intersection::{pulse_signals, SignalBank, SignalClock, SignalColor, SimIntersection, StopLight};
pub use lane::SimLane;
pub use monitor::{find_collisions, Collision, CollisionLog};
pub use nodes::{Enterable, Exitable, SimOrigin, SimTerminal, TrafficNode};
pub use notifications::{Notification, NotificationBus, Subscriber, Topic};
pub use road_network::SimRoadNetwork;
pub use state::{TickContext, TrafficState};
pub use stats::SimStats;
pub use types::{
    CarId, Direction, Heading, LaneId, LanePlacement, NodeId, DEFAULT_LANE_LENGTH,
    MIN_ACCEL_INTERVAL, SPAWN_DIVISOR,
};
pub use world::{CarLifecycle, SimWorld};
