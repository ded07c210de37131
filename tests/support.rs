use async_trait::async_trait;
use flowloom::executors::{Activity, CodeEvaluator};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type BoxErr = Box<dyn std::error::Error + Send + Sync>;

/// A minimal predicate evaluator for tests: `"true"`/`"false"` literals, or
/// any other source string is treated as a bindings key to look up (so a
/// guard like `"ready"` reads the `ready` variable directly).
pub struct SimpleEvaluator;

#[async_trait]
impl CodeEvaluator for SimpleEvaluator {
    async fn eval(&self, source: &str, scope: serde_json::Map<String, Value>) -> Result<Value, BoxErr> {
        match source.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            key => Ok(scope.get(key).cloned().unwrap_or(Value::Null)),
        }
    }
}

/// Wraps a plain synchronous closure as an [`Activity`], so tests don't
/// need a dedicated struct per callable.
pub struct ClosureActivity<F>(pub F)
where
    F: Fn(Vec<Value>) -> Result<Value, BoxErr> + Send + Sync;

#[async_trait]
impl<F> Activity for ClosureActivity<F>
where
    F: Fn(Vec<Value>) -> Result<Value, BoxErr> + Send + Sync,
{
    async fn call(&self, args: Vec<Value>) -> Result<Value, BoxErr> {
        (self.0)(args)
    }
}

pub fn activity<F>(f: F) -> Arc<dyn Activity>
where
    F: Fn(Vec<Value>) -> Result<Value, BoxErr> + Send + Sync + 'static,
{
    Arc::new(ClosureActivity(f))
}

/// An activity that always fails, for `ExecutorFailure` propagation tests.
pub fn failing_activity(message: &'static str) -> Arc<dyn Activity> {
    activity(move |_| Err(message.into()))
}

/// Wraps `result` in an activity that bumps `counter` each time it is
/// invoked, so tests can assert a guarded node's executor was never called.
pub fn counting_activity(counter: Arc<AtomicUsize>, result: Value) -> Arc<dyn Activity> {
    activity(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(result.clone())
    })
}
