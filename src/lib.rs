//! # flowloom: a workflow DSL interpreter
//!
//! `flowloom` compiles a declarative, JSON-shaped program describing a
//! data-flow graph into a dependency graph and drives it to completion one
//! topological generation at a time.
//!
//! ## Core concepts
//!
//! - **Program**: the recursive `Sequence`/`Parallel`/`Execute`/`ForEach`/
//!   `While`/`DoWhile` tree described in a [`program::ProgramDocument`].
//! - **Bindings**: the live, shared variable environment read and written
//!   as the program runs ([`bindings::Bindings`]).
//! - **Graph**: the compiled dependency graph, built once per program or
//!   sub-program ([`graph::Graph`]).
//! - **Driver**: the pull-based producer that walks the graph's generations
//!   and yields one [`driver::ControlItem`] per ready node
//!   ([`driver::Driver`]).
//!
//! ## Quick start
//!
//! ```no_run
//! use flowloom::{
//!     driver::Driver,
//!     executors::{Activity, ExecutorTable},
//!     program::ProgramDocument,
//! };
//! use async_trait::async_trait;
//! use serde_json::Value;
//! use std::sync::Arc;
//!
//! struct Shout;
//!
//! #[async_trait]
//! impl Activity for Shout {
//!     async fn call(&self, args: Vec<Value>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
//!         let text = args.first().and_then(Value::as_str).unwrap_or_default();
//!         Ok(Value::String(format!("{}!", text.to_uppercase())))
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let document: ProgramDocument = serde_json::from_value(serde_json::json!({
//!     "variables": { "greeting": "hello" },
//!     "plan": { "execute": { "activity": "shout", "with": ["greeting"], "store": "shouted" } }
//! }))?;
//!
//! let executors = ExecutorTable::new().with_activity("shout", Arc::new(Shout));
//! let mut driver = Driver::new(document, executors)?;
//! driver.run_to_completion().await?;
//! assert_eq!(driver.bindings().get("shouted"), Value::String("HELLO!".into()));
//! # Ok(())
//! # }
//! ```

pub mod bindings;
pub mod config;
pub mod driver;
pub mod errors;
pub mod executors;
pub mod graph;
pub mod host;
pub mod program;
pub mod steplist;
pub mod telemetry;

pub use bindings::Bindings;
pub use config::DriverConfig;
pub use driver::{ControlItem, Driver};
pub use errors::CoreError;
pub use executors::ExecutorTable;
pub use program::{Program, ProgramDocument};
