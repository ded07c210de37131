//! Error taxonomy for the workflow core.
//!
//! `CoreError` covers every fatal or caller-visible failure mode. Non-fatal
//! outcomes (`when`-false, wait-timeout, guard-evaluation failure) are never
//! constructed as a value the caller sees from a public API: they are logged
//! via `tracing` at the point of occurrence and folded into the node's
//! `skipped` state instead. See `driver::Driver` for where each variant here
//! is actually raised.

use miette::Diagnostic;
use thiserror::Error;

use crate::graph::node::NodeId;

/// Errors surfaced by graph construction or by driving a program to
/// completion.
#[derive(Debug, Error, Diagnostic)]
pub enum CoreError {
    /// The data+control graph (or a step list's before/after constraints)
    /// contains a cycle. Raised at construction time; the driver never
    /// starts.
    #[error("program graph contains a cycle")]
    #[diagnostic(
        code(flowloom::core::cyclic_program),
        help("Check for a variable that is both read and written by the same execute node, or a step-list before/after constraint that forms a loop.")
    )]
    CyclicProgram,

    /// An execute node named an activity or step absent from its executor
    /// table.
    #[error("no executor registered for {kind} named `{name}` (node {node})")]
    #[diagnostic(
        code(flowloom::core::unknown_executor),
        help("Register the missing callable in the ExecutorTable passed to Driver::new.")
    )]
    UnknownExecutor {
        kind: &'static str,
        name: String,
        node: NodeId,
    },

    /// The executor invoked for a node returned an error. Aborts the
    /// remaining drive.
    #[error("executor for node {node} failed: {source}")]
    #[diagnostic(code(flowloom::core::executor_failure))]
    ExecutorFailure {
        node: NodeId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A loop body or guarded-block sub-graph failed while being driven.
    #[error("sub-graph for node {node} failed")]
    #[diagnostic(code(flowloom::core::subgraph_failure))]
    SubGraphFailure {
        node: NodeId,
        #[source]
        source: Box<CoreError>,
    },

    /// No `CodeEvaluator` was configured but a code-literal predicate or
    /// execute node was encountered.
    #[error("no code evaluator configured, but node {node} requires one")]
    #[diagnostic(
        code(flowloom::core::missing_code_evaluator),
        help("Pass a CodeEvaluator to ExecutorTable::with_code when the program contains `code` execute nodes or code-literal predicates.")
    )]
    MissingCodeEvaluator { node: NodeId },

    /// JSON shape of a program document did not parse.
    #[error(transparent)]
    #[diagnostic(code(flowloom::core::program_parse))]
    ProgramParse(#[from] serde_json::Error),

    /// A `ControlItem` named a node absent from the graph currently being
    /// driven. Only reachable if a caller holds an item across a boundary
    /// the driver itself never crosses (graph/generations are always
    /// restored before `run()` returns control for a sibling item).
    #[error("node {node} not found in the graph currently being driven")]
    #[diagnostic(
        code(flowloom::core::unknown_node),
        help("Run() each ControlItem before requesting the next one from the same Driver.")
    )]
    UnknownNode { node: NodeId },
}

/// Non-fatal outcomes that are logged and folded into skip state rather than
/// returned to the caller. Kept as a type (rather than inlined `tracing`
/// calls scattered through `driver.rs`) so every skip reason has one place
/// that names it.
#[derive(Debug, Error, Diagnostic)]
pub(crate) enum GuardOutcome {
    #[error("when-guard evaluated to false")]
    WhenFalse,

    #[error("wait-guard timed out after {elapsed_secs:.3}s")]
    WaitTimeout { elapsed_secs: f64 },

    #[error("guard evaluation failed: {source}")]
    EvaluationFailure {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
