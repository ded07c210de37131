//! Kahn's-algorithm topological generations, with insertion-order
//! tie-breaking for deterministic, reproducible drives.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::CoreError;

use super::node::NodeId;
use super::Graph;

/// Verify `graph` is acyclic without retaining the computed generations.
pub fn detect_cycle(graph: &Graph) -> Result<(), CoreError> {
    generations_from_adjacency(&graph.order, &graph.successors, &graph.predecessors).map(|_| ())
}

/// Partition `graph` into topological generations.
pub fn compute_generations(graph: &Graph) -> Result<Vec<Vec<NodeId>>, CoreError> {
    generations_from_adjacency(&graph.order, &graph.successors, &graph.predecessors)
}

/// The generic routine behind both the graph scheduler and the step-list
/// adapter: given a node order (for tie-breaking) and its successor/
/// predecessor adjacency, produce generations via Kahn's algorithm, batched
/// rather than single-queue, each generation sorted by insertion index
/// rather than lexicographically (this crate's callers always have a
/// meaningful construction order; see DESIGN.md).
pub fn generations_from_adjacency(
    order: &[NodeId],
    successors: &FxHashMap<NodeId, Vec<NodeId>>,
    predecessors: &FxHashMap<NodeId, Vec<NodeId>>,
) -> Result<Vec<Vec<NodeId>>, CoreError> {
    let index_of: FxHashMap<&NodeId, usize> = order.iter().enumerate().map(|(i, id)| (id, i)).collect();
    let mut in_degree: FxHashMap<NodeId, usize> = order
        .iter()
        .map(|id| (id.clone(), predecessors.get(id).map(Vec::len).unwrap_or(0)))
        .collect();
    let mut remaining: FxHashSet<NodeId> = order.iter().cloned().collect();

    let mut generations = Vec::new();
    while !remaining.is_empty() {
        let mut ready: Vec<NodeId> = remaining
            .iter()
            .filter(|id| in_degree.get(*id).copied().unwrap_or(0) == 0)
            .cloned()
            .collect();

        if ready.is_empty() {
            return Err(CoreError::CyclicProgram);
        }

        ready.sort_by_key(|id| index_of.get(id).copied().unwrap_or(usize::MAX));

        for id in &ready {
            remaining.remove(id);
            if let Some(succs) = successors.get(id) {
                for succ in succs {
                    if let Some(d) = in_degree.get_mut(succ) {
                        *d = d.saturating_sub(1);
                    }
                }
            }
        }

        generations.push(ready);
    }

    Ok(generations)
}
