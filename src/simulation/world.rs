//! Simulation world: the lane graph, its nodes and its cars
//!
//! The world owns every lane, node and car and runs one tick at a time. It is
//! single-threaded; the engine wraps it in the graph lock and drives it from
//! its own threads.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::car::{self, CarMove, SimCar};
use super::intersection::{SignalClock, SignalColor, SimIntersection};
use super::lane::SimLane;
use super::nodes::{SimOrigin, SimTerminal, TrafficNode};
use super::notifications::{Notification, NotificationBus, Subscriber, Topic};
use super::road_network::SimRoadNetwork;
use super::state::{TickContext, TrafficState};
use super::stats::SimStats;
use super::types::{CarId, Direction, Heading, LaneId, LanePlacement, NodeId};
use crate::render::{CarSnapshot, RenderSnapshot};

/// Sole owner of car allocation. Subscribed to both lifecycle topics.
#[derive(Debug, Default)]
pub struct CarLifecycle;

impl Subscriber<TrafficState> for CarLifecycle {
    fn notify(&self, state: &mut TrafficState, notification: &Notification) {
        match *notification {
            Notification::CreateCar(lane) => {
                if state.lane(lane).is_none() {
                    warn!("Creation requested for unknown {}, ignoring", lane);
                    return;
                }
                match state.spawn_car(lane) {
                    Some(car) => debug!("Spawned {} on {}", car, lane),
                    None => {
                        state.stats.spawns_dropped += 1;
                        debug!("Entry of {} occupied, dropping creation request", lane);
                    }
                }
            }
            Notification::DeleteCar(car) => {
                if state.release_car(car).is_none() {
                    state.stats.stale_releases += 1;
                    warn!("Deletion requested for {} which is no longer live, ignoring", car);
                }
            }
        }
    }
}

/// The main simulation world
pub struct SimWorld {
    state: TrafficState,
    nodes: Vec<TrafficNode>,
    network: SimRoadNetwork,
    bus: NotificationBus<TrafficState>,
    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,
    intersection: Option<NodeId>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    fn new_internal(rng: Option<StdRng>) -> Self {
        let mut bus: NotificationBus<TrafficState> = NotificationBus::new();
        let lifecycle: Arc<CarLifecycle> = Arc::new(CarLifecycle);
        bus.subscribe(Topic::DeleteCar, lifecycle.clone());
        bus.subscribe(Topic::CreateCar, lifecycle);

        Self {
            state: TrafficState::new(),
            nodes: Vec::new(),
            network: SimRoadNetwork::new(),
            bus,
            rng,
            intersection: None,
        }
    }

    pub fn new() -> Self {
        Self::new_internal(None)
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(seed: u64) -> Self {
        Self::new_internal(Some(StdRng::seed_from_u64(seed)))
    }

    fn with_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::new_with_seed(seed),
            None => Self::new(),
        }
    }

    fn push_node(&mut self, make: impl FnOnce(NodeId) -> TrafficNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(make(id));
        self.network.add_node(id);
        id
    }

    pub fn add_origin(&mut self) -> NodeId {
        self.push_node(|id| TrafficNode::Origin(SimOrigin::new(id)))
    }

    pub fn add_terminal(&mut self) -> NodeId {
        self.push_node(|id| TrafficNode::Terminal(SimTerminal::new(id)))
    }

    /// Add the junction. A world has at most one.
    pub fn add_intersection(&mut self) -> Result<NodeId> {
        if let Some(existing) = self.intersection {
            anyhow::bail!("World already has an intersection ({})", existing);
        }
        let id = self.push_node(|id| TrafficNode::Intersection(SimIntersection::new(id)));
        self.intersection = Some(id);
        Ok(id)
    }

    /// Add a lane from `entry` to `exit`. A lane fed by an origin becomes
    /// that origin's lane.
    pub fn add_lane(&mut self, entry: NodeId, exit: NodeId, length: u32) -> Result<LaneId> {
        if length == 0 {
            anyhow::bail!("Lane length must be positive");
        }
        let entry_node = self.node(entry).context("Entry node not found")?;
        if !entry_node.is_exitable() {
            anyhow::bail!("{} ({}) cannot feed a lane", entry, entry_node.kind());
        }
        let exit_node = self.node(exit).context("Exit node not found")?;
        if !exit_node.is_enterable() {
            anyhow::bail!("{} ({}) cannot receive a lane", exit, exit_node.kind());
        }
        if let Some(TrafficNode::Origin(origin)) = self.node(entry) {
            if let Some(lane) = origin.lane() {
                anyhow::bail!("{} already feeds {}", entry, lane);
            }
        }

        let id = LaneId(self.state.lanes.len());
        self.state.lanes.push(SimLane::new(id, entry, exit, length));
        self.network.add_lane(id, entry, exit);

        if let Some(TrafficNode::Origin(origin)) = self.nodes.get_mut(entry.0) {
            origin.set_lane(id);
        }
        Ok(id)
    }

    /// Tell renderers where a lane is drawn
    pub fn place_lane(&mut self, lane: LaneId, placement: LanePlacement) -> Result<()> {
        self.state
            .lane_mut(lane)
            .context("Lane not found")?
            .set_placement(placement);
        Ok(())
    }

    /// Route `from` through the junction onto `to`, with a stop light on
    /// `from` starting in `initial_signal`
    pub fn create_connection(
        &mut self,
        from: LaneId,
        to: LaneId,
        initial_signal: SignalColor,
    ) -> Result<()> {
        let junction = self.intersection.context("World has no intersection")?;
        let from_lane = self.state.lane(from).context("Incoming lane not found")?;
        if from_lane.exit() != junction {
            anyhow::bail!("{} does not end at the intersection", from);
        }
        let to_lane = self.state.lane(to).context("Outgoing lane not found")?;
        if to_lane.entry() != junction {
            anyhow::bail!("{} does not start at the intersection", to);
        }

        self.intersection_mut()
            .context("Intersection not found")?
            .create_connection(from, to, initial_signal);
        Ok(())
    }

    /// Check the wiring before the world is run
    pub fn validate_topology(&self) -> Result<()> {
        for node in &self.nodes {
            let id = node.id();
            let incoming = self.network.incoming_lanes(id);
            let outgoing = self.network.outgoing_lanes(id);
            match node {
                TrafficNode::Origin(_) => {
                    if outgoing.len() != 1 || !incoming.is_empty() {
                        anyhow::bail!(
                            "{} must feed exactly one lane and receive none (feeds {}, receives {})",
                            id,
                            outgoing.len(),
                            incoming.len()
                        );
                    }
                }
                TrafficNode::Terminal(_) => {
                    if !outgoing.is_empty() {
                        anyhow::bail!("{} is a sink but feeds {} lanes", id, outgoing.len());
                    }
                }
                TrafficNode::Intersection(intersection) => {
                    let signals = intersection.signal_states();
                    for lane in &incoming {
                        if intersection.route(*lane).is_none() || !signals.contains_key(lane) {
                            anyhow::bail!("{} enters {} without a route", lane, id);
                        }
                    }
                    let mut targets = HashSet::new();
                    for (from, to) in intersection.connections() {
                        if !targets.insert(to) {
                            anyhow::bail!("{} is the target of more than one route ({} among them)", to, from);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Build the four-way layout: four generators feeding lanes A-D into the
    /// junction, lanes E-H draining into four sinks.
    pub fn create_standard_world(lane_length: u32, seed: Option<u64>) -> Result<Self> {
        let mut world = Self::with_optional_seed(seed);
        let junction = world.add_intersection()?;

        let inbound = [Direction::North, Direction::West, Direction::South, Direction::East];
        let outbound = [Direction::South, Direction::East, Direction::North, Direction::West];
        let initial = [SignalColor::Red, SignalColor::Green, SignalColor::Red, SignalColor::Green];

        let mut incoming = Vec::with_capacity(inbound.len());
        for direction in inbound {
            let origin = world.add_origin();
            let lane = world.add_lane(origin, junction, lane_length)?;
            world.place_lane(lane, LanePlacement::new(direction, Heading::Inbound))?;
            incoming.push(lane);
        }

        let mut outgoing = Vec::with_capacity(outbound.len());
        for direction in outbound {
            let terminal = world.add_terminal();
            let lane = world.add_lane(junction, terminal, lane_length)?;
            world.place_lane(lane, LanePlacement::new(direction, Heading::Outbound))?;
            outgoing.push(lane);
        }

        for ((from, to), color) in incoming.into_iter().zip(outgoing).zip(initial) {
            world.create_connection(from, to, color)?;
        }

        world.validate_topology()?;
        Ok(world)
    }

    // ── Accessors ─────────────────────────────────────────────────────

    pub fn state(&self) -> &TrafficState {
        &self.state
    }

    pub fn stats(&self) -> &SimStats {
        &self.state.stats
    }

    pub fn network(&self) -> &SimRoadNetwork {
        &self.network
    }

    pub fn car(&self, id: CarId) -> Option<&SimCar> {
        self.state.car(id)
    }

    pub fn car_mut(&mut self, id: CarId) -> Option<&mut SimCar> {
        self.state.car_mut(id)
    }

    pub fn cars(&self) -> impl Iterator<Item = &SimCar> {
        self.state.cars.values()
    }

    pub fn car_count(&self) -> usize {
        self.state.cars.len()
    }

    pub fn lane(&self, id: LaneId) -> Option<&SimLane> {
        self.state.lane(id)
    }

    pub fn lanes(&self) -> &[SimLane] {
        &self.state.lanes
    }

    pub fn node(&self, id: NodeId) -> Option<&TrafficNode> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[TrafficNode] {
        &self.nodes
    }

    pub fn intersection_id(&self) -> Option<NodeId> {
        self.intersection
    }

    pub fn intersection(&self) -> Option<&SimIntersection> {
        self.intersection
            .and_then(|id| self.nodes.get(id.0))
            .and_then(TrafficNode::as_intersection)
    }

    pub fn intersection_mut(&mut self) -> Option<&mut SimIntersection> {
        self.intersection
            .and_then(|id| self.nodes.get_mut(id.0))
            .and_then(TrafficNode::as_intersection_mut)
    }

    /// Car at `position` on `lane`, if any
    pub fn find_car_at(&self, lane: LaneId, position: u32) -> Option<CarId> {
        self.state.find_car_at(lane, position)
    }

    // ── Scenario setup ────────────────────────────────────────────────

    /// Put a car on a lane at a given spot
    pub fn place_car(&mut self, lane: LaneId, position: u32, speed: u32) -> Result<CarId> {
        self.state.insert_car(lane, position, speed)
    }

    /// Allocate a car that is on no lane, e.g. to hand straight to a node
    pub fn create_detached_car(&mut self) -> CarId {
        self.state.insert_detached_car()
    }

    // ── Node operations ───────────────────────────────────────────────

    pub fn can_enter(&self, node: NodeId, from: LaneId) -> bool {
        self.node(node).is_some_and(|node| node.can_enter(from))
    }

    pub fn accept(&mut self, node: NodeId, from: LaneId, car: CarId) {
        if let Some(node) = self.nodes.get_mut(node.0) {
            node.accept(from, car);
        }
    }

    pub fn process_before_tick(&mut self, node: NodeId) {
        let Some(node) = self.nodes.get_mut(node.0) else {
            return;
        };
        let mut ctx = TickContext {
            state: &mut self.state,
            bus: &self.bus,
            rng: &mut self.rng,
        };
        node.process_before_tick(&mut ctx);
    }

    pub fn process_after_tick(&mut self, node: NodeId) {
        let Some(node) = self.nodes.get_mut(node.0) else {
            return;
        };
        let mut ctx = TickContext {
            state: &mut self.state,
            bus: &self.bus,
            rng: &mut self.rng,
        };
        node.process_after_tick(&mut ctx);
    }

    /// Deliver a lifecycle notification to the world's subscribers
    pub fn publish(&mut self, notification: Notification) {
        self.bus.publish(&mut self.state, notification);
    }

    // ── Car operations ────────────────────────────────────────────────

    pub fn can_move(&self, car: CarId) -> bool {
        self.state
            .car(car)
            .is_some_and(|car| car.can_move(&self.state, &self.nodes))
    }

    /// Move a car by its current speed without applying the speed rule
    pub fn move_car(&mut self, car: CarId) -> CarMove {
        car::move_car(car, &mut self.state, &mut self.nodes)
    }

    /// Speed rule followed by a move
    pub fn step_car(&mut self, car: CarId) -> CarMove {
        car::update_car(car, &mut self.state, &mut self.nodes)
    }

    // ── Tick ──────────────────────────────────────────────────────────

    /// Run one tick: flush exit nodes, move every car on a lane, then let
    /// entry nodes admit cars.
    pub fn tick(&mut self) {
        let lane_ends: Vec<(NodeId, NodeId)> = self
            .state
            .lanes
            .iter()
            .map(|lane| (lane.entry(), lane.exit()))
            .collect();

        for &(_, exit) in &lane_ends {
            self.process_before_tick(exit);
        }

        let car_ids: Vec<CarId> = self
            .state
            .cars
            .values()
            .filter(|car| car.lane.is_some())
            .map(|car| car.id)
            .collect();
        for car_id in car_ids {
            self.step_car(car_id);
        }

        for &(entry, _) in &lane_ends {
            self.process_after_tick(entry);
        }

        self.state.stats.ticks += 1;
    }

    // ── Stop lights ───────────────────────────────────────────────────

    pub fn get_signal(&self, lane: LaneId) -> Option<SignalColor> {
        self.intersection()?.get_signal(lane)
    }

    pub fn start_signals(&mut self, period: std::time::Duration) -> Result<()> {
        self.intersection_mut()
            .context("World has no intersection")?
            .start_traffic_signals(period)
    }

    pub fn stop_signals(&mut self) {
        if let Some(intersection) = self.intersection_mut() {
            intersection.stop_traffic_signals();
        }
    }

    /// Hand over the running signal clock, if any, for the caller to stop
    pub fn take_signal_clock(&mut self) -> Option<SignalClock> {
        self.intersection_mut()?.take_signal_clock()
    }

    // ── Output ────────────────────────────────────────────────────────

    /// Capture what a renderer needs. Stop lights are read under their lock.
    pub fn snapshot(&self) -> RenderSnapshot {
        let mut signals = Vec::new();
        if let Some(intersection) = self.intersection() {
            for (lane, light) in intersection.signal_states() {
                if let Some(placement) = self.lane(lane).and_then(SimLane::placement) {
                    signals.push((placement.direction, light.state()));
                }
            }
        }

        let cars = self
            .cars()
            .filter_map(|car| {
                let lane = self.lane(car.lane?)?;
                Some(CarSnapshot {
                    lane: lane.id,
                    placement: lane.placement(),
                    position: car.position,
                    lane_length: lane.length(),
                })
            })
            .collect();

        RenderSnapshot {
            tick: self.state.stats.ticks,
            signals,
            cars,
            volume: self.car_count(),
        }
    }

    /// Log a summary of the world state
    pub fn log_summary(&self) {
        info!("=== Intersection Simulation Summary ===");
        info!(
            "Nodes: {}, Lanes: {}",
            self.network.node_count(),
            self.network.lane_count()
        );
        info!(
            "Cars: {} ({} on lanes)",
            self.car_count(),
            self.state.cars_on_lanes()
        );
        if let Some(intersection) = self.intersection() {
            for (lane, light) in intersection.signal_states() {
                info!(
                    "  Signal on {}: {} ({} ticks left)",
                    lane,
                    light.state(),
                    light.remaining_ticks()
                );
            }
        }
        info!("{}", self.state.stats.summary());
    }
}
