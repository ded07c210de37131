//! Graph vertices: their identity, kind, and the executable unit they carry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::program::{ExecuteUnit, Guards, Predicate, WaitGuard};

/// A node's kind, folded into its id string the way the teacher's
/// `NodeKind` folds a custom name into `"Custom:<name>"` — here generalized
/// to `<kind>_<name>_<counter>` so every node, synthetic or not, carries a
/// stable, human-legible identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Activity,
    Step,
    Code,
    /// Synthetic gate materialized for a guarded `Sequence` block.
    Sequence,
    /// Synthetic gate materialized for a guarded `Parallel` block.
    Parallel,
    ForEach,
    While,
    DoWhile,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Activity => "activity",
            NodeKind::Step => "step",
            NodeKind::Code => "code",
            NodeKind::Sequence => "sequence",
            NodeKind::Parallel => "parallel",
            NodeKind::ForEach => "foreach",
            NodeKind::While => "while",
            NodeKind::DoWhile => "dowhile",
        };
        f.write_str(s)
    }
}

impl NodeKind {
    /// Gate kinds always cascade skip to their descendants, independent of
    /// `required` — their entire body never ran.
    pub fn is_gate(&self) -> bool {
        matches!(self, NodeKind::Sequence | NodeKind::Parallel)
    }
}

/// A unique, deterministic node identifier of the form
/// `<kind>_<name>_<counter>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub Arc<str>);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl NodeId {
    fn new(kind: &NodeKind, name: &str, counter: u64) -> Self {
        let sanitized: String = name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        NodeId(Arc::from(format!("{kind}_{sanitized}_{counter}")))
    }
}

/// A monotonic id counter shared by a builder and every sub-graph it
/// spawns. `child()` reserves a stride on the parent so a nested build can
/// never collide with ids the parent has already handed out, or ever will.
#[derive(Clone)]
pub struct IdCounter {
    next: Arc<AtomicU64>,
    stride: u64,
}

impl IdCounter {
    pub fn new(stride: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(0)),
            stride,
        }
    }

    pub fn next_id(&self, kind: &NodeKind, name: &str) -> NodeId {
        let counter = self.next.fetch_add(1, Ordering::SeqCst);
        NodeId::new(kind, name, counter)
    }

    /// Reserve a stride on this counter and return a fresh, independent
    /// counter seeded past it, for use by a nested sub-graph build.
    pub fn child(&self) -> IdCounter {
        let start = self.next.fetch_add(self.stride, Ordering::SeqCst);
        IdCounter {
            next: Arc::new(AtomicU64::new(start)),
            stride: self.stride,
        }
    }
}

/// The executable payload of a node.
#[derive(Clone)]
pub enum Executor {
    Activity { name: String, with: Vec<String>, store: Option<String> },
    Step { name: String, with: Vec<String>, store: Option<String> },
    Code { source: String, with: Vec<String>, store: Option<String> },
    /// A guarded `Sequence`/`Parallel` block, or a loop. Built lazily each
    /// time the gate runs, since `ForEach`/`While` bodies must be rebuilt
    /// per iteration against the bindings of that iteration.
    Gate(GateBody),
}

/// What a gate node drives when it becomes ready.
#[derive(Clone)]
pub enum GateBody {
    Sequence(crate::program::SequenceNode),
    Parallel(crate::program::ParallelNode),
    ForEach(crate::program::ForEachNode),
    While(crate::program::WhileNode),
    DoWhile(crate::program::DoWhileNode),
}

/// A graph vertex.
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub insertion_index: usize,
    pub guards: Guards,
    pub executor: Executor,
    /// The non-undefined result of running this node, cached so a
    /// later-added node within the same build can resolve a variable from
    /// the graph even if the binding is subsequently overwritten.
    pub result: OnceLock<Value>,
}

impl GraphNode {
    pub fn args(&self) -> &[String] {
        match &self.executor {
            Executor::Activity { with, .. } | Executor::Step { with, .. } | Executor::Code { with, .. } => with,
            Executor::Gate(GateBody::ForEach(n)) => std::slice::from_ref(&n.source),
            Executor::Gate(_) => &[],
        }
    }

    pub fn store(&self) -> Option<&str> {
        match &self.executor {
            Executor::Activity { store, .. } | Executor::Step { store, .. } | Executor::Code { store, .. } => {
                store.as_deref()
            }
            Executor::Gate(_) => None,
        }
    }
}

/// Construct the `Executor` for a leaf `Execute` program node.
pub fn executor_for_unit(unit: &ExecuteUnit, with: Vec<String>, store: Option<String>) -> (NodeKind, Executor) {
    match unit {
        ExecuteUnit::Activity(name) => (
            NodeKind::Activity,
            Executor::Activity { name: name.clone(), with, store },
        ),
        ExecuteUnit::Step(name) => (NodeKind::Step, Executor::Step { name: name.clone(), with, store }),
        ExecuteUnit::Code(source) => (
            NodeKind::Code,
            Executor::Code { source: source.clone(), with, store },
        ),
    }
}

/// Evaluate whether a `Guards::wait` guard names a code-literal predicate,
/// used by the driver to decide whether a code evaluator is required.
pub fn wait_is_code(wait: &WaitGuard) -> bool {
    matches!(wait.predicate, Predicate::Code(_))
}

pub fn when_is_code(when: &Predicate) -> bool {
    matches!(when, Predicate::Code(_))
}
