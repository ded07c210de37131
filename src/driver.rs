//! The generation driver: a pull-based producer of ready nodes, with skip,
//! wait, and loop/gate sub-graph semantics.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use rustc_hash::FxHashSet;
use serde_json::Value;

use crate::bindings::Bindings;
use crate::config::DriverConfig;
use crate::errors::CoreError;
use crate::executors::ExecutorTable;
use crate::graph::builder::build_graph;
use crate::graph::node::{GateBody, IdCounter, NodeId};
use crate::graph::scheduler::compute_generations;
use crate::graph::Graph;
use crate::host::{local_waiter, HostWaiter};
use crate::program::{DoWhileNode, ForEachNode, Predicate, Program, ProgramDocument, WhileNode};

/// One ready node, yielded by [`Driver::next`]. The caller awaits
/// [`Driver::run`] with it to actually execute the unit.
#[derive(Debug, Clone)]
pub struct ControlItem {
    pub id: NodeId,
    /// Every node id in the same generation, including this one, in the
    /// order the driver would offer them — for a caller that wants to
    /// dispatch the whole generation concurrently itself.
    pub peers: Vec<NodeId>,
}

enum GuardDecision {
    Proceed,
    Skip,
}

/// Drives a compiled program to completion one generation at a time.
pub struct Driver {
    bindings: Bindings,
    executors: ExecutorTable,
    waiter: Arc<dyn HostWaiter>,
    config: DriverConfig,
    counter: IdCounter,
    graph: Graph,
    generations: Vec<Vec<NodeId>>,
    gen_index: usize,
    item_index: usize,
    skipped: FxHashSet<NodeId>,
}

impl Driver {
    /// Build a driver with a default `DriverConfig` and the default
    /// un-hosted `LocalWaiter`.
    pub fn new(document: ProgramDocument, executors: ExecutorTable) -> Result<Self, CoreError> {
        Self::with_config(document, executors, DriverConfig::default(), local_waiter())
    }

    pub fn with_config(
        document: ProgramDocument,
        executors: ExecutorTable,
        config: DriverConfig,
        waiter: Arc<dyn HostWaiter>,
    ) -> Result<Self, CoreError> {
        let bindings = Bindings::new(document.variables);
        let counter = IdCounter::new(config.subgraph_id_stride);
        let graph = build_graph(&document.plan, &counter)?;
        let generations = compute_generations(&graph)?;
        tracing::debug!(
            nodes = graph.node_count(),
            generations = generations.len(),
            "compiled program into graph"
        );
        Ok(Self {
            bindings,
            executors,
            waiter,
            config,
            counter,
            graph,
            generations,
            gen_index: 0,
            item_index: 0,
            skipped: FxHashSet::default(),
        })
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Yield the next ready node, skipping over (and recording) any node
    /// whose guards fail, until either a schedulable node is found or the
    /// graph is exhausted.
    pub async fn next(&mut self) -> Result<Option<ControlItem>, CoreError> {
        loop {
            if self.gen_index >= self.generations.len() {
                return Ok(None);
            }
            if self.item_index >= self.generations[self.gen_index].len() {
                self.gen_index += 1;
                self.item_index = 0;
                continue;
            }

            let id = self.generations[self.gen_index][self.item_index].clone();
            self.item_index += 1;

            if self.should_force_skip(&id) {
                tracing::info!(node = %id, "skipped: a propagating predecessor was skipped");
                self.skipped.insert(id);
                continue;
            }

            match self.evaluate_guards(&id).await {
                GuardDecision::Skip => {
                    self.skipped.insert(id);
                    continue;
                }
                GuardDecision::Proceed => {}
            }

            let peers = self.generations[self.gen_index].clone();
            return Ok(Some(ControlItem { id, peers }));
        }
    }

    /// Drive every generation to completion, awaiting each yielded item in
    /// the order `next()` produces it. A convenience for callers that do
    /// not want to parallelize a generation themselves.
    pub async fn run_to_completion(&mut self) -> Result<(), CoreError> {
        while let Some(item) = self.next().await? {
            self.run(&item).await?;
        }
        Ok(())
    }

    /// Execute the unit behind `item`, writing any non-undefined result
    /// into bindings under its `store` name.
    pub async fn run(&mut self, item: &ControlItem) -> Result<Value, CoreError> {
        let id = item.id.clone();
        let executor = self
            .graph
            .nodes
            .get(&id)
            .ok_or_else(|| CoreError::UnknownNode { node: id.clone() })?
            .executor
            .clone();

        let result = match executor {
            crate::graph::node::Executor::Activity { name, with, store } => {
                let activity = self.executors.activity(&name).cloned();
                let args = self.resolve_args(&with);
                let activity = activity.ok_or_else(|| CoreError::UnknownExecutor {
                    kind: "activity",
                    name: name.clone(),
                    node: id.clone(),
                })?;
                let value = activity
                    .call(args)
                    .await
                    .map_err(|source| CoreError::ExecutorFailure { node: id.clone(), source })?;
                self.write_store(store, &value);
                value
            }
            crate::graph::node::Executor::Step { name, with, store } => {
                let step = self.executors.step(&name).cloned();
                let args = self.resolve_args(&with);
                let step = step.ok_or_else(|| CoreError::UnknownExecutor {
                    kind: "step",
                    name: name.clone(),
                    node: id.clone(),
                })?;
                let value = step
                    .call(args)
                    .await
                    .map_err(|source| CoreError::ExecutorFailure { node: id.clone(), source })?;
                self.write_store(store, &value);
                value
            }
            crate::graph::node::Executor::Code { source, with, store } => {
                // `with` names are bound both positionally (as `scope["args"]`)
                // and by name, via the full bindings snapshot below.
                let args = self.resolve_args(&with);
                let code = self.executors.code().cloned().ok_or_else(|| CoreError::MissingCodeEvaluator { node: id.clone() })?;
                let mut scope = self.bindings.snapshot();
                scope.insert("args".to_string(), Value::Array(args));
                let value = code
                    .eval(&source, scope)
                    .await
                    .map_err(|source| CoreError::ExecutorFailure { node: id.clone(), source })?;
                self.write_store(store, &value);
                value
            }
            crate::graph::node::Executor::Gate(body) => {
                self.run_gate(&id, body).await?;
                Value::Null
            }
        };

        if !result.is_null() {
            if let Some(node) = self.graph.nodes.get(&id) {
                let _ = node.result.set(result.clone());
            }
        }

        Ok(result)
    }

    /// Resolve each name in `with`, preferring the cached result of its
    /// producer node in the *current* graph (so a sub-graph rebuilt after a
    /// binding is overwritten -- a loop's next iteration, say -- still sees
    /// the value its own producer computed) and falling back to the live
    /// binding for names produced outside this graph or not yet run.
    fn resolve_args(&self, with: &[String]) -> Vec<Value> {
        with.iter()
            .map(|name| {
                self.graph
                    .producers
                    .get(name)
                    .and_then(|producer| self.graph.nodes.get(producer))
                    .and_then(|node| node.result.get().cloned())
                    .unwrap_or_else(|| self.bindings.get(name))
            })
            .collect()
    }

    fn write_store(&self, store: Option<String>, value: &Value) {
        if let Some(key) = store {
            if !value.is_null() {
                self.bindings.set(key, value.clone());
            }
        }
    }

    fn should_force_skip(&self, id: &NodeId) -> bool {
        self.graph.predecessors_of(id).iter().any(|pred| {
            self.skipped.contains(pred)
                && self
                    .graph
                    .nodes
                    .get(pred)
                    .map(|n| n.kind.is_gate() || n.guards.is_required())
                    .unwrap_or(false)
        })
    }

    async fn evaluate_guards(&mut self, id: &NodeId) -> GuardDecision {
        let guards = match self.graph.nodes.get(id) {
            Some(node) => node.guards.clone(),
            None => return GuardDecision::Proceed,
        };

        if let Some(when) = &guards.when {
            match self.evaluate_predicate(when).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::info!(node = %id, "skipped: when-guard evaluated false");
                    return GuardDecision::Skip;
                }
                Err(err) => {
                    tracing::error!(node = %id, error = %err, "skipped: when-guard evaluation failed");
                    return GuardDecision::Skip;
                }
            }
        }

        if let Some(wait) = &guards.wait {
            let predicate = wait.predicate.clone();
            let bindings = self.bindings.clone();
            let code = self.executors.code().cloned();
            let check = move || {
                let predicate = predicate.clone();
                let bindings = bindings.clone();
                let code = code.clone();
                Box::pin(async move { evaluate_predicate_with(&predicate, &bindings, code.as_deref()).await.unwrap_or(false) })
                    as BoxFuture<'static, bool>
            };
            let timeout = wait.timeout_secs.map(Duration::from_secs_f64);
            let start = std::time::Instant::now();
            let ok = self.waiter.wait(timeout, &check).await;
            if !ok {
                tracing::warn!(node = %id, elapsed_secs = start.elapsed().as_secs_f64(), "skipped: wait-guard timed out");
                return GuardDecision::Skip;
            }
        }

        GuardDecision::Proceed
    }

    async fn evaluate_predicate(&self, predicate: &Predicate) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        evaluate_predicate_with(predicate, &self.bindings, self.executors.code().map(|c| &**c)).await
    }

    fn run_gate<'a>(&'a mut self, id: &'a NodeId, body: GateBody) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            match body {
                GateBody::Sequence(seq) => self.enter_subprogram(Program::Sequence(seq)).await,
                GateBody::Parallel(par) => self.enter_subprogram(Program::Parallel(par)).await,
                GateBody::ForEach(fe) => self.drive_foreach(fe).await,
                GateBody::While(w) => self.drive_while(w).await,
                GateBody::DoWhile(dw) => self.drive_dowhile(dw).await,
            }
            .map_err(|source| CoreError::SubGraphFailure { node: id.clone(), source: Box::new(source) })
        })
    }

    /// Build `program` as a nested graph with a disjoint id range, swap it
    /// in as the current drive context, run it to completion, then restore
    /// the outer context.
    fn enter_subprogram(&mut self, program: Program) -> BoxFuture<'_, Result<(), CoreError>> {
        Box::pin(async move {
            let sub_counter = self.counter.child();
            let graph = build_graph(&program, &sub_counter)?;
            let generations = compute_generations(&graph)?;

            let saved_graph = std::mem::replace(&mut self.graph, graph);
            let saved_generations = std::mem::replace(&mut self.generations, generations);
            let saved_gen_index = std::mem::replace(&mut self.gen_index, 0);
            let saved_item_index = std::mem::replace(&mut self.item_index, 0);

            let result = self.run_to_completion().await;

            self.graph = saved_graph;
            self.generations = saved_generations;
            self.gen_index = saved_gen_index;
            self.item_index = saved_item_index;

            result
        })
    }

    fn drive_foreach(&mut self, fe: ForEachNode) -> BoxFuture<'_, Result<(), CoreError>> {
        Box::pin(async move {
            let items = match self.bindings.get(&fe.source) {
                Value::Array(items) => items,
                _ => Vec::new(),
            };
            for item in items {
                self.bindings.set(fe.binding.clone(), item);
                self.enter_subprogram((*fe.body).clone()).await?;
            }
            Ok(())
        })
    }

    fn drive_while(&mut self, w: WhileNode) -> BoxFuture<'_, Result<(), CoreError>> {
        Box::pin(async move {
            loop {
                let cont = self.evaluate_predicate(&w.condition).await.unwrap_or(false);
                if !cont {
                    break;
                }
                self.enter_subprogram((*w.body).clone()).await?;
            }
            Ok(())
        })
    }

    fn drive_dowhile(&mut self, dw: DoWhileNode) -> BoxFuture<'_, Result<(), CoreError>> {
        Box::pin(async move {
            loop {
                self.enter_subprogram((*dw.body).clone()).await?;
                let cont = self.evaluate_predicate(&dw.condition).await.unwrap_or(false);
                if !cont {
                    break;
                }
            }
            Ok(())
        })
    }
}

async fn evaluate_predicate_with(
    predicate: &Predicate,
    bindings: &Bindings,
    code: Option<&(dyn crate::executors::CodeEvaluator)>,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    match predicate {
        Predicate::Native(native) => Ok((native.0)(bindings)),
        Predicate::Code(source) => {
            let code = code.ok_or("no code evaluator configured for a code-literal predicate")?;
            let scope = bindings.snapshot();
            let value = code.eval(source, scope).await?;
            Ok(value_truthy(&value))
        }
    }
}

fn value_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
