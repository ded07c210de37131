//! Converts a flat list of step descriptors (`before`/`after` constraints)
//! into a generation-packed `Program`, reusing the graph scheduler's own
//! topological-generations routine rather than re-implementing ordering.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::CoreError;
use crate::graph::node::NodeId;
use crate::graph::scheduler::generations_from_adjacency;
use crate::program::{ExecuteNode, ExecuteUnit, Guards, ParallelNode, Program, SequenceNode, StepDescriptor};

/// Convert `steps` into a `Sequence` whose elements are generation-packed:
/// a generation of one step becomes a bare `Execute`, a generation of many
/// becomes a `Parallel` over them. Cycles in `before`/`after` are a fatal
/// conversion error.
pub fn steps_to_program(steps: Vec<StepDescriptor>) -> Result<Program, CoreError> {
    let order: Vec<NodeId> = steps.iter().map(|s| NodeId(Arc::from(s.name.as_str()))).collect();
    let by_name: FxHashMap<&str, usize> = steps.iter().enumerate().map(|(i, s)| (s.name.as_str(), i)).collect();

    let mut successors: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
    let mut predecessors: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();

    for (i, step) in steps.iter().enumerate() {
        let this_id = order[i].clone();
        for before_name in &step.before {
            if let Some(&j) = by_name.get(before_name.as_str()) {
                add_edge(&mut successors, &mut predecessors, &this_id, &order[j]);
            }
        }
        for after_name in &step.after {
            if let Some(&j) = by_name.get(after_name.as_str()) {
                add_edge(&mut successors, &mut predecessors, &order[j], &this_id);
            }
        }
    }

    let generations = generations_from_adjacency(&order, &successors, &predecessors)?;

    let id_to_step: FxHashMap<NodeId, &StepDescriptor> = order.iter().cloned().zip(steps.iter()).collect();

    let elements = generations
        .into_iter()
        .map(|generation| {
            let nodes: Vec<Program> = generation
                .iter()
                .map(|id| execute_for(id_to_step[id]))
                .collect();
            if nodes.len() == 1 {
                nodes.into_iter().next().unwrap()
            } else {
                Program::Parallel(ParallelNode {
                    branches: nodes,
                    guards: Guards::default(),
                })
            }
        })
        .collect();

    Ok(Program::Sequence(SequenceNode {
        elements,
        guards: Guards::default(),
    }))
}

fn add_edge(
    successors: &mut FxHashMap<NodeId, Vec<NodeId>>,
    predecessors: &mut FxHashMap<NodeId, Vec<NodeId>>,
    from: &NodeId,
    to: &NodeId,
) {
    let succ = successors.entry(from.clone()).or_default();
    if !succ.contains(to) {
        succ.push(to.clone());
    }
    let pred = predecessors.entry(to.clone()).or_default();
    if !pred.contains(from) {
        pred.push(from.clone());
    }
}

fn execute_for(step: &StepDescriptor) -> Program {
    Program::Execute(ExecuteNode {
        unit: ExecuteUnit::Step(step.method.clone()),
        with: step.with.clone(),
        store: step.store.clone(),
        guards: Guards {
            when: step.when.clone(),
            wait: None,
            required: if step.required { Some(true) } else { None },
            timeout: step.timeout,
            retries: step.retries,
        },
    })
}
