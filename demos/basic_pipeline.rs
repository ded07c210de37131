//! Runs a small fan-in pipeline end to end: fetch a value, transform it two
//! ways in parallel, then combine the results.

use async_trait::async_trait;
use flowloom::executors::{Activity, ExecutorTable};
use flowloom::program::ProgramDocument;
use flowloom::Driver;
use serde_json::Value;
use std::sync::Arc;

struct Fetch;

#[async_trait]
impl Activity for Fetch {
    async fn call(&self, _args: Vec<Value>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Value::String("raw-data".to_string()))
    }
}

struct Format;

#[async_trait]
impl Activity for Format {
    async fn call(&self, args: Vec<Value>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let input = args.first().and_then(Value::as_str).unwrap_or_default();
        Ok(Value::String(format!("formatted({input})")))
    }
}

struct Summarize;

#[async_trait]
impl Activity for Summarize {
    async fn call(&self, args: Vec<Value>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let input = args.first().and_then(Value::as_str).unwrap_or_default();
        Ok(Value::String(format!("summary({input})")))
    }
}

struct Combine;

#[async_trait]
impl Activity for Combine {
    async fn call(&self, args: Vec<Value>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let a = args.first().and_then(Value::as_str).unwrap_or_default();
        let b = args.get(1).and_then(Value::as_str).unwrap_or_default();
        Ok(Value::String(format!("{a}+{b}")))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    flowloom::telemetry::init_tracing();

    let document: ProgramDocument = serde_json::from_value(serde_json::json!({
        "variables": {},
        "plan": {
            "sequence": {
                "elements": [
                    { "execute": { "activity": "fetch", "store": "raw" } },
                    {
                        "parallel": {
                            "branches": [
                                { "execute": { "activity": "format", "with": ["raw"], "store": "formatted" } },
                                { "execute": { "activity": "summarize", "with": ["raw"], "store": "summarized" } }
                            ]
                        }
                    },
                    { "execute": { "activity": "combine", "with": ["formatted", "summarized"], "store": "final" } }
                ]
            }
        }
    }))?;

    let executors = ExecutorTable::new()
        .with_activity("fetch", Arc::new(Fetch))
        .with_activity("format", Arc::new(Format))
        .with_activity("summarize", Arc::new(Summarize))
        .with_activity("combine", Arc::new(Combine));

    let mut driver = Driver::new(document, executors)?;
    driver.run_to_completion().await?;

    println!("final = {}", driver.bindings().get("final"));
    Ok(())
}
