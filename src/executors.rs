//! The callable surface the core invokes but does not implement: activities,
//! steps, and code evaluation.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;

/// A single named unit of work, invoked with its resolved `with` arguments
/// and returning a value to be written to `store`.
///
/// Activities and steps share this trait: to the core they are both "a name
/// to async callable mapping" (§6), differing only in which table they are
/// registered under.
#[async_trait]
pub trait Activity: Send + Sync {
    async fn call(&self, args: Vec<Value>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>;
}

/// Evaluates an inline `code` execute node, or a code-literal `when`/`wait`
/// predicate, against a snapshot of live bindings.
#[async_trait]
pub trait CodeEvaluator: Send + Sync {
    async fn eval(
        &self,
        source: &str,
        scope: serde_json::Map<String, Value>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>;
}

/// The lookup tables handed to `Driver::new`.
#[derive(Clone, Default)]
pub struct ExecutorTable {
    activities: FxHashMap<String, Arc<dyn Activity>>,
    steps: FxHashMap<String, Arc<dyn Activity>>,
    code: Option<Arc<dyn CodeEvaluator>>,
}

impl ExecutorTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_activity(mut self, name: impl Into<String>, activity: Arc<dyn Activity>) -> Self {
        self.activities.insert(name.into(), activity);
        self
    }

    #[must_use]
    pub fn with_step(mut self, name: impl Into<String>, step: Arc<dyn Activity>) -> Self {
        self.steps.insert(name.into(), step);
        self
    }

    #[must_use]
    pub fn with_code(mut self, evaluator: Arc<dyn CodeEvaluator>) -> Self {
        self.code = Some(evaluator);
        self
    }

    pub fn activity(&self, name: &str) -> Option<&Arc<dyn Activity>> {
        self.activities.get(name)
    }

    pub fn step(&self, name: &str) -> Option<&Arc<dyn Activity>> {
        self.steps.get(name)
    }

    pub fn code(&self) -> Option<&Arc<dyn CodeEvaluator>> {
        self.code.as_ref()
    }
}
