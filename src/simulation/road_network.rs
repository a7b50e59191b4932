//! Road network topology graph
//!
//! Nodes of the graph are traffic nodes and edges are lanes. The graph only
//! records who connects to whom; lane and node data live in the world arenas.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction as EdgeDirection;
use std::collections::HashMap;

use super::types::{LaneId, NodeId};

/// Directed graph of traffic nodes joined by lanes
#[derive(Debug, Default)]
pub struct SimRoadNetwork {
    graph: DiGraph<NodeId, LaneId>,

    /// Maps node IDs to their indices in the graph
    node_to_index: HashMap<NodeId, NodeIndex>,
}

impl SimRoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the graph. Adding the same node twice is a no-op.
    pub fn add_node(&mut self, node: NodeId) {
        if self.node_to_index.contains_key(&node) {
            return;
        }
        let index = self.graph.add_node(node);
        self.node_to_index.insert(node, index);
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.node_to_index.contains_key(&node)
    }

    /// Adds a lane edge. Both endpoints must already be in the graph.
    pub fn add_lane(&mut self, lane: LaneId, entry: NodeId, exit: NodeId) -> bool {
        let (Some(&from), Some(&to)) = (self.node_to_index.get(&entry), self.node_to_index.get(&exit))
        else {
            return false;
        };
        self.graph.add_edge(from, to, lane);
        true
    }

    fn lanes(&self, node: NodeId, direction: EdgeDirection) -> Vec<LaneId> {
        let Some(&index) = self.node_to_index.get(&node) else {
            return Vec::new();
        };
        let mut lanes: Vec<LaneId> = self
            .graph
            .edges_directed(index, direction)
            .map(|edge| *edge.weight())
            .collect();
        lanes.sort();
        lanes
    }

    /// Lanes that end at `node`
    pub fn incoming_lanes(&self, node: NodeId) -> Vec<LaneId> {
        self.lanes(node, EdgeDirection::Incoming)
    }

    /// Lanes that start at `node`
    pub fn outgoing_lanes(&self, node: NodeId) -> Vec<LaneId> {
        self.lanes(node, EdgeDirection::Outgoing)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn lane_count(&self) -> usize {
        self.graph.edge_count()
    }
}
