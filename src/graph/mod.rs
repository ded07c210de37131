//! The dependency graph: vertices, edges, and the operations (build,
//! schedule) performed over them.

pub mod builder;
pub mod node;
pub mod scheduler;

use rustc_hash::FxHashMap;

use node::{GraphNode, NodeId};

/// A built dependency graph: nodes plus the directed edges (data and
/// control, indistinguishable to the scheduler) between them.
pub struct Graph {
    pub nodes: FxHashMap<NodeId, GraphNode>,
    /// Insertion order, for deterministic within-generation tie-breaking.
    pub order: Vec<NodeId>,
    pub successors: FxHashMap<NodeId, Vec<NodeId>>,
    pub predecessors: FxHashMap<NodeId, Vec<NodeId>>,
    /// The last node (within this graph) to declare each `store` name, so a
    /// node's result can be resolved from the graph itself rather than only
    /// from live bindings (see `GraphNode::result`).
    pub producers: FxHashMap<String, NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            order: Vec::new(),
            successors: FxHashMap::default(),
            predecessors: FxHashMap::default(),
            producers: FxHashMap::default(),
        }
    }

    pub fn insert_node(&mut self, node: GraphNode) {
        let id = node.id.clone();
        self.order.push(id.clone());
        self.nodes.insert(id, node);
    }

    /// Add a directed edge if it is not already present. A self-loop (`from
    /// == to`) is never actually offered here by the builder -- a node that
    /// reads its own `store` name is rejected before any edge is attempted,
    /// in `graph::builder::descend_execute` -- but the check stays as a
    /// defensive no-op for any future edge source that isn't as careful.
    pub fn add_edge(&mut self, from: &NodeId, to: &NodeId) {
        if from == to {
            return;
        }
        let succ = self.successors.entry(from.clone()).or_default();
        if !succ.contains(to) {
            succ.push(to.clone());
        }
        let pred = self.predecessors.entry(to.clone()).or_default();
        if !pred.contains(from) {
            pred.push(from.clone());
        }
    }

    pub fn predecessors_of(&self, id: &NodeId) -> &[NodeId] {
        self.predecessors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
