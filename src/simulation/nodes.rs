//! Lane endpoints: generators, sinks and the junction
//!
//! Every lane begins at an [`Exitable`] node, which may release new cars into
//! it, and ends at an [`Enterable`] node, which decides whether a car may leave
//! the lane and takes it over when it does.

use log::warn;

use super::intersection::SimIntersection;
use super::notifications::Notification;
use super::state::TickContext;
use super::types::{CarId, LaneId, NodeId, SPAWN_DIVISOR};

/// A node that receives cars at the end of a lane
pub trait Enterable {
    /// Whether a car leaving `from` would be accepted right now
    fn can_enter(&self, from: LaneId) -> bool;

    /// Take over a car leaving `from`
    fn accept(&mut self, from: LaneId, car: CarId);

    /// Runs at the start of every tick, before cars move
    fn process_before_tick(&mut self, ctx: &mut TickContext<'_>);
}

/// A node that feeds cars into the start of a lane
pub trait Exitable {
    /// Runs at the end of every tick, after cars move
    fn process_after_tick(&mut self, ctx: &mut TickContext<'_>);
}

/// Generator feeding a single lane
#[derive(Debug, Clone)]
pub struct SimOrigin {
    pub id: NodeId,
    lane: Option<LaneId>,
}

impl SimOrigin {
    pub fn new(id: NodeId) -> Self {
        Self { id, lane: None }
    }

    pub fn lane(&self) -> Option<LaneId> {
        self.lane
    }

    pub fn set_lane(&mut self, lane: LaneId) {
        self.lane = Some(lane);
    }
}

impl Exitable for SimOrigin {
    /// Roll 1..=100 and ask for a car on every multiple of five. Whether the
    /// car actually fits is up to the lifecycle handler.
    fn process_after_tick(&mut self, ctx: &mut TickContext<'_>) {
        let Some(lane) = self.lane else {
            return;
        };
        let roll = ctx.random_range(1..=100);
        if roll % SPAWN_DIVISOR == 0 {
            ctx.publish(Notification::CreateCar(lane));
        }
    }
}

/// Sink that absorbs every car reaching it
#[derive(Debug, Clone)]
pub struct SimTerminal {
    pub id: NodeId,
    car_buffer: Vec<CarId>,
}

impl SimTerminal {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            car_buffer: Vec::new(),
        }
    }

    /// Cars absorbed since the last flush
    pub fn buffered_cars(&self) -> &[CarId] {
        &self.car_buffer
    }
}

impl Enterable for SimTerminal {
    fn can_enter(&self, _from: LaneId) -> bool {
        true
    }

    fn accept(&mut self, _from: LaneId, car: CarId) {
        self.car_buffer.push(car);
    }

    /// Ask for every absorbed car to be released, then forget them
    fn process_before_tick(&mut self, ctx: &mut TickContext<'_>) {
        for car in self.car_buffer.drain(..) {
            ctx.publish(Notification::DeleteCar(car));
        }
    }
}

/// Any node of the road network
#[derive(Debug)]
pub enum TrafficNode {
    Origin(SimOrigin),
    Terminal(SimTerminal),
    Intersection(SimIntersection),
}

impl TrafficNode {
    pub fn id(&self) -> NodeId {
        match self {
            TrafficNode::Origin(origin) => origin.id,
            TrafficNode::Terminal(terminal) => terminal.id,
            TrafficNode::Intersection(intersection) => intersection.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TrafficNode::Origin(_) => "origin",
            TrafficNode::Terminal(_) => "terminal",
            TrafficNode::Intersection(_) => "intersection",
        }
    }

    pub fn as_enterable(&self) -> Option<&dyn Enterable> {
        match self {
            TrafficNode::Origin(_) => None,
            TrafficNode::Terminal(terminal) => Some(terminal),
            TrafficNode::Intersection(intersection) => Some(intersection),
        }
    }

    pub fn as_enterable_mut(&mut self) -> Option<&mut dyn Enterable> {
        match self {
            TrafficNode::Origin(_) => None,
            TrafficNode::Terminal(terminal) => Some(terminal),
            TrafficNode::Intersection(intersection) => Some(intersection),
        }
    }

    pub fn as_exitable_mut(&mut self) -> Option<&mut dyn Exitable> {
        match self {
            TrafficNode::Origin(origin) => Some(origin),
            TrafficNode::Terminal(_) => None,
            TrafficNode::Intersection(intersection) => Some(intersection),
        }
    }

    pub fn is_enterable(&self) -> bool {
        self.as_enterable().is_some()
    }

    pub fn is_exitable(&self) -> bool {
        !matches!(self, TrafficNode::Terminal(_))
    }

    /// Origins never admit cars
    pub fn can_enter(&self, from: LaneId) -> bool {
        self.as_enterable().is_some_and(|node| node.can_enter(from))
    }

    pub fn accept(&mut self, from: LaneId, car: CarId) {
        match self.as_enterable_mut() {
            Some(node) => node.accept(from, car),
            None => warn!("{} cannot accept {}", self.id(), car),
        }
    }

    pub fn process_before_tick(&mut self, ctx: &mut TickContext<'_>) {
        if let Some(node) = self.as_enterable_mut() {
            node.process_before_tick(ctx);
        }
    }

    pub fn process_after_tick(&mut self, ctx: &mut TickContext<'_>) {
        if let Some(node) = self.as_exitable_mut() {
            node.process_after_tick(ctx);
        }
    }

    pub fn as_intersection(&self) -> Option<&SimIntersection> {
        match self {
            TrafficNode::Intersection(intersection) => Some(intersection),
            _ => None,
        }
    }

    pub fn as_intersection_mut(&mut self) -> Option<&mut SimIntersection> {
        match self {
            TrafficNode::Intersection(intersection) => Some(intersection),
            _ => None,
        }
    }
}
