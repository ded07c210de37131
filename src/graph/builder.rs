//! Recursive-descent lowering of a `Program` into a `Graph`.

use rustc_hash::FxHashMap;

use crate::errors::CoreError;
use crate::program::{DoWhileNode, ExecuteNode, ForEachNode, Guards, ParallelNode, Program, SequenceNode, WhileNode};

use super::node::{executor_for_unit, Executor, GateBody, GraphNode, IdCounter, NodeId, NodeKind};
use super::scheduler::detect_cycle;
use super::Graph;

/// Build a complete graph for `program`, then verify it is acyclic.
///
/// `counter` is consumed by reference so the caller (the driver, when
/// rebuilding a loop body or a guarded block) can keep driving further ids
/// from the same counter afterward if needed; most callers pass a fresh
/// `IdCounter::child()` reserved for exactly this build.
pub fn build_graph(program: &Program, counter: &IdCounter) -> Result<Graph, CoreError> {
    let mut graph = Graph::new();
    let mut producers: FxHashMap<String, NodeId> = FxHashMap::default();
    descend(program, &mut graph, counter, &mut producers, Vec::new())?;
    detect_cycle(&graph)?;
    graph.producers = producers;
    Ok(graph)
}

/// Lower `program` into `graph`, threading the control-flow frontier
/// (the set of node ids the next-scheduled construct must wait on).
/// Returns the new frontier for whatever follows `program` in its
/// enclosing block.
fn descend(
    program: &Program,
    graph: &mut Graph,
    counter: &IdCounter,
    producers: &mut FxHashMap<String, NodeId>,
    frontier: Vec<NodeId>,
) -> Result<Vec<NodeId>, CoreError> {
    match program {
        Program::Execute(node) => descend_execute(node, graph, counter, producers, frontier),
        Program::Sequence(node) => descend_sequence(node, graph, counter, producers, frontier),
        Program::Parallel(node) => descend_parallel(node, graph, counter, producers, frontier),
        Program::ForEach(node) => descend_foreach(node, graph, counter, producers, frontier),
        Program::While(node) => descend_while(node, graph, counter, producers, frontier),
        Program::DoWhile(node) => descend_dowhile(node, graph, counter, producers, frontier),
    }
}

fn descend_execute(
    node: &ExecuteNode,
    graph: &mut Graph,
    counter: &IdCounter,
    producers: &mut FxHashMap<String, NodeId>,
    frontier: Vec<NodeId>,
) -> Result<Vec<NodeId>, CoreError> {
    // A node that both reads and writes the same name can never be wired:
    // its own producer entry doesn't exist yet when `with` is resolved, so
    // silently accepting this would just make the read resolve to whatever
    // stale value preceded it. Treat it as the self-cycle it is.
    if let Some(store) = &node.store {
        if node.with.contains(store) {
            return Err(CoreError::CyclicProgram);
        }
    }

    let (kind, executor) = executor_for_unit(&node.unit, node.with.clone(), node.store.clone());
    let name = executor_label(&executor);
    let id = counter.next_id(&kind, &name);

    for arg in &node.with {
        if let Some(producer) = producers.get(arg) {
            graph.add_edge(&producer.clone(), &id);
        }
    }
    for pred in &frontier {
        graph.add_edge(pred, &id);
    }

    graph.insert_node(GraphNode {
        id: id.clone(),
        kind,
        insertion_index: graph.order.len(),
        guards: node.guards.clone(),
        executor,
        result: Default::default(),
    });

    if let Some(store) = &node.store {
        producers.insert(store.clone(), id.clone());
    }

    Ok(vec![id])
}

fn executor_label(executor: &Executor) -> String {
    match executor {
        Executor::Activity { name, .. } | Executor::Step { name, .. } => name.clone(),
        Executor::Code { .. } => "code".to_string(),
        Executor::Gate(_) => "gate".to_string(),
    }
}

fn descend_sequence(
    node: &SequenceNode,
    graph: &mut Graph,
    counter: &IdCounter,
    producers: &mut FxHashMap<String, NodeId>,
    frontier: Vec<NodeId>,
) -> Result<Vec<NodeId>, CoreError> {
    if has_any_guard(&node.guards) {
        return Ok(materialize_gate(
            NodeKind::Sequence,
            GateBody::Sequence(SequenceNode {
                elements: node.elements.clone(),
                guards: Guards::default(),
            }),
            node.guards.clone(),
            graph,
            counter,
            frontier,
        ));
    }

    if node.elements.is_empty() {
        return Ok(frontier);
    }

    let mut current = frontier;
    for element in &node.elements {
        current = descend(element, graph, counter, producers, current)?;
    }
    Ok(current)
}

fn descend_parallel(
    node: &ParallelNode,
    graph: &mut Graph,
    counter: &IdCounter,
    producers: &mut FxHashMap<String, NodeId>,
    frontier: Vec<NodeId>,
) -> Result<Vec<NodeId>, CoreError> {
    if has_any_guard(&node.guards) {
        return Ok(materialize_gate(
            NodeKind::Parallel,
            GateBody::Parallel(ParallelNode {
                branches: node.branches.clone(),
                guards: Guards::default(),
            }),
            node.guards.clone(),
            graph,
            counter,
            frontier,
        ));
    }

    if node.branches.is_empty() {
        return Ok(frontier);
    }

    let mut tails: Vec<NodeId> = Vec::new();
    for branch in &node.branches {
        let branch_tail = descend(branch, graph, counter, producers, frontier.clone())?;
        for id in branch_tail {
            if !tails.contains(&id) {
                tails.push(id);
            }
        }
    }
    Ok(tails)
}

fn descend_foreach(
    node: &ForEachNode,
    graph: &mut Graph,
    counter: &IdCounter,
    producers: &mut FxHashMap<String, NodeId>,
    frontier: Vec<NodeId>,
) -> Result<Vec<NodeId>, CoreError> {
    let id = counter.next_id(&NodeKind::ForEach, &node.binding);
    if let Some(producer) = producers.get(&node.source) {
        graph.add_edge(&producer.clone(), &id);
    }
    for pred in &frontier {
        graph.add_edge(pred, &id);
    }
    graph.insert_node(GraphNode {
        id: id.clone(),
        kind: NodeKind::ForEach,
        insertion_index: graph.order.len(),
        guards: Guards::default(),
        executor: Executor::Gate(GateBody::ForEach(node.clone())),
        result: Default::default(),
    });
    Ok(vec![id])
}

fn descend_while(
    node: &WhileNode,
    graph: &mut Graph,
    counter: &IdCounter,
    _producers: &mut FxHashMap<String, NodeId>,
    frontier: Vec<NodeId>,
) -> Result<Vec<NodeId>, CoreError> {
    let id = counter.next_id(&NodeKind::While, "loop");
    for pred in &frontier {
        graph.add_edge(pred, &id);
    }
    graph.insert_node(GraphNode {
        id: id.clone(),
        kind: NodeKind::While,
        insertion_index: graph.order.len(),
        guards: Guards::default(),
        executor: Executor::Gate(GateBody::While(node.clone())),
        result: Default::default(),
    });
    Ok(vec![id])
}

fn descend_dowhile(
    node: &DoWhileNode,
    graph: &mut Graph,
    counter: &IdCounter,
    _producers: &mut FxHashMap<String, NodeId>,
    frontier: Vec<NodeId>,
) -> Result<Vec<NodeId>, CoreError> {
    let id = counter.next_id(&NodeKind::DoWhile, "loop");
    for pred in &frontier {
        graph.add_edge(pred, &id);
    }
    graph.insert_node(GraphNode {
        id: id.clone(),
        kind: NodeKind::DoWhile,
        insertion_index: graph.order.len(),
        guards: Guards::default(),
        executor: Executor::Gate(GateBody::DoWhile(node.clone())),
        result: Default::default(),
    });
    Ok(vec![id])
}

fn has_any_guard(guards: &Guards) -> bool {
    guards.when.is_some() || guards.wait.is_some() || guards.required.is_some()
}

fn materialize_gate(
    kind: NodeKind,
    body: GateBody,
    guards: Guards,
    graph: &mut Graph,
    counter: &IdCounter,
    frontier: Vec<NodeId>,
) -> Vec<NodeId> {
    let id = counter.next_id(&kind, "gate");
    for pred in &frontier {
        graph.add_edge(pred, &id);
    }
    graph.insert_node(GraphNode {
        id: id.clone(),
        kind,
        insertion_index: graph.order.len(),
        guards,
        executor: Executor::Gate(body),
        result: Default::default(),
    });
    vec![id]
}
