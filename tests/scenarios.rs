//! End-to-end scenarios from the component specification: single activity,
//! fan-in across three generations, cycle detection, guarded sequences,
//! required-vs-optional skip propagation, and wait timeout.

#[path = "support.rs"]
mod support;

use flowloom::executors::ExecutorTable;
use flowloom::program::ProgramDocument;
use flowloom::Driver;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use support::{activity, counting_activity, failing_activity};

#[tokio::test]
async fn single_activity_runs_and_stores_result() {
    let document: ProgramDocument = serde_json::from_value(json!({
        "variables": {},
        "plan": { "execute": { "activity": "http", "store": "r" } }
    }))
    .unwrap();

    let executors = ExecutorTable::new().with_activity("http", activity(|_| Ok(json!("X"))));
    let mut driver = Driver::new(document, executors).unwrap();
    driver.run_to_completion().await.unwrap();

    assert_eq!(driver.bindings().get("r"), json!("X"));
}

#[tokio::test]
async fn fan_in_produces_three_generations() {
    let document: ProgramDocument = serde_json::from_value(json!({
        "variables": {},
        "plan": {
            "sequence": {
                "elements": [
                    { "execute": { "activity": "http", "store": "a" } },
                    {
                        "parallel": {
                            "branches": [
                                { "execute": { "activity": "fmt", "with": ["a"], "store": "b" } },
                                { "execute": { "activity": "slow", "store": "c" } }
                            ]
                        }
                    },
                    { "execute": { "activity": "combine", "with": ["b", "c"], "store": "d" } }
                ]
            }
        }
    }))
    .unwrap();

    let executors = ExecutorTable::new()
        .with_activity("http", activity(|_| Ok(json!("H"))))
        .with_activity("fmt", activity(|args| Ok(json!(format!("f_{}", args[0].as_str().unwrap())))))
        .with_activity("slow", activity(|_| Ok(json!("s"))))
        .with_activity("combine", activity(|args| {
            Ok(json!(format!("{}+{}", args[0].as_str().unwrap(), args[1].as_str().unwrap())))
        }));

    let mut driver = Driver::new(document, executors).unwrap();

    let mut generation_sizes = Vec::new();
    loop {
        let Some(item) = driver.next().await.unwrap() else { break };
        if item.peers.iter().position(|p| *p == item.id) == Some(0) {
            generation_sizes.push(item.peers.len());
        }
        driver.run(&item).await.unwrap();
    }

    assert_eq!(generation_sizes, vec![1, 2, 1]);
    assert_eq!(driver.bindings().get("d"), json!("f_H+s"));
}

#[tokio::test]
async fn forward_only_data_dependencies_never_spuriously_cycle() {
    // Two distinct nodes trading names (`a` reads `x`/writes `y`, `b` reads
    // `y`/writes `x`) never actually cycles: `with` only ever wires to a
    // *previously* registered producer, so `b`'s `x` edge is simply never
    // added (no producer for `x` exists yet). This is not the same shape as
    // a single node reading its own store -- see
    // `execute_node_reading_its_own_store_is_rejected_as_cyclic` for that.
    let document: ProgramDocument = serde_json::from_value(json!({
        "variables": {},
        "plan": {
            "sequence": {
                "elements": [
                    { "execute": { "activity": "a", "with": ["x"], "store": "y" } },
                    { "execute": { "activity": "b", "with": ["y"], "store": "x" } }
                ]
            }
        }
    }))
    .unwrap();

    let executors = ExecutorTable::new()
        .with_activity("a", activity(|_| Ok(json!("A"))))
        .with_activity("b", activity(|_| Ok(json!("B"))));
    let result = Driver::new(document, executors);
    assert!(result.is_ok());
}

#[tokio::test]
async fn execute_node_reading_its_own_store_is_rejected_as_cyclic() {
    let document: ProgramDocument = serde_json::from_value(json!({
        "variables": {},
        "plan": { "execute": { "activity": "a", "with": ["x"], "store": "x" } }
    }))
    .unwrap();

    let executors = ExecutorTable::new().with_activity("a", activity(|_| Ok(json!("A"))));
    let err = Driver::new(document, executors);

    assert!(matches!(err, Err(flowloom::CoreError::CyclicProgram)));
}

#[tokio::test]
async fn executor_failure_propagates_and_aborts_drive() {
    let document: ProgramDocument = serde_json::from_value(json!({
        "variables": {},
        "plan": {
            "sequence": {
                "elements": [
                    { "execute": { "activity": "boom", "store": "x" } },
                    { "execute": { "activity": "never", "store": "y" } }
                ]
            }
        }
    }))
    .unwrap();

    let (never, calls) = {
        let counter = Arc::new(AtomicUsize::new(0));
        (counting_activity(counter.clone(), json!("never-ran")), counter)
    };
    let executors = ExecutorTable::new()
        .with_activity("boom", failing_activity("activity exploded"))
        .with_activity("never", never);
    let mut driver = Driver::new(document, executors).unwrap();

    let err = driver.run_to_completion().await;

    assert!(matches!(err, Err(flowloom::CoreError::ExecutorFailure { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn guarded_false_sequence_yields_zero_inner_nodes() {
    let (counter_a, calls_a) = {
        let counter = Arc::new(AtomicUsize::new(0));
        (counting_activity(counter.clone(), json!("a-ran")), counter)
    };
    let (counter_b, calls_b) = {
        let counter = Arc::new(AtomicUsize::new(0));
        (counting_activity(counter.clone(), json!("b-ran")), counter)
    };

    let document: ProgramDocument = serde_json::from_value(json!({
        "variables": {},
        "plan": {
            "sequence": {
                "when": "false",
                "elements": [
                    { "execute": { "activity": "a", "store": "x" } },
                    { "execute": { "activity": "b", "with": ["x"], "store": "y" } }
                ]
            }
        }
    }))
    .unwrap();

    let executors = ExecutorTable::new()
        .with_activity("a", counter_a)
        .with_activity("b", counter_b)
        .with_code(Arc::new(support::SimpleEvaluator));
    let mut driver = Driver::new(document, executors).unwrap();
    driver.run_to_completion().await.unwrap();

    assert_eq!(calls_a.load(Ordering::SeqCst), 0);
    assert_eq!(calls_b.load(Ordering::SeqCst), 0);
    assert_eq!(driver.bindings().get("y"), Value::Null);
}

#[tokio::test]
async fn required_predecessor_skip_propagates_to_dependent() {
    let document: ProgramDocument = serde_json::from_value(json!({
        "variables": {},
        "plan": {
            "sequence": {
                "elements": [
                    { "execute": { "activity": "a", "when": "false", "required": true, "store": "x" } },
                    { "execute": { "activity": "b", "with": ["x"], "store": "y" } }
                ]
            }
        }
    }))
    .unwrap();

    let (b_counter, calls_b) = {
        let counter = Arc::new(AtomicUsize::new(0));
        (counting_activity(counter.clone(), json!("b-ran")), counter)
    };
    let executors = ExecutorTable::new()
        .with_activity("a", activity(|_| Ok(json!("a-ran"))))
        .with_activity("b", b_counter)
        .with_code(Arc::new(support::SimpleEvaluator));
    let mut driver = Driver::new(document, executors).unwrap();
    driver.run_to_completion().await.unwrap();

    assert_eq!(calls_b.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn optional_predecessor_skip_does_not_propagate() {
    let document: ProgramDocument = serde_json::from_value(json!({
        "variables": {},
        "plan": {
            "sequence": {
                "elements": [
                    { "execute": { "activity": "a", "when": "false", "store": "x" } },
                    { "execute": { "activity": "b", "with": ["x"], "store": "y" } }
                ]
            }
        }
    }))
    .unwrap();

    let (b_counter, calls_b) = {
        let counter = Arc::new(AtomicUsize::new(0));
        (counting_activity(counter.clone(), json!("b-ran")), counter)
    };
    let executors = ExecutorTable::new()
        .with_activity("a", activity(|_| Ok(json!("a-ran"))))
        .with_activity("b", b_counter)
        .with_code(Arc::new(support::SimpleEvaluator));
    let mut driver = Driver::new(document, executors).unwrap();
    driver.run_to_completion().await.unwrap();

    assert_eq!(calls_b.load(Ordering::SeqCst), 1);
    assert_eq!(driver.bindings().get("y"), json!("b-ran"));
}

#[tokio::test(start_paused = true)]
async fn wait_with_timeout_skips_node() {
    let document: ProgramDocument = serde_json::from_value(json!({
        "variables": { "ready": false },
        "plan": { "execute": { "activity": "go", "wait": ["ready", 1.0], "store": "r" } }
    }))
    .unwrap();

    let (go, calls) = {
        let counter = Arc::new(AtomicUsize::new(0));
        (counting_activity(counter.clone(), json!("went")), counter)
    };
    let executors = ExecutorTable::new()
        .with_activity("go", go)
        .with_code(Arc::new(support::SimpleEvaluator));

    let mut driver = Driver::new(document, executors).unwrap();
    let join = tokio::spawn(async move {
        driver.run_to_completion().await.unwrap();
        driver
    });
    tokio::time::advance(std::time::Duration::from_secs(2)).await;
    let driver = join.await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(driver.bindings().get("r"), Value::Null);
}
