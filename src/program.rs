//! The declarative program model: the wire-shaped representation of a
//! workflow, parsed from JSON and handed to the graph builder.

use std::fmt;
use std::sync::Arc;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::bindings::Bindings;

fn default_false() -> bool {
    false
}

fn is_false(v: &bool) -> bool {
    !v
}

/// A document handed to `Driver::new`: the variables a program starts with,
/// plus the program itself.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgramDocument {
    #[serde(default)]
    pub variables: serde_json::Map<String, Value>,
    pub plan: Program,
}

/// The recursive program tree. One variant per DSL construct; guards are
/// attached uniformly to the block-shaped variants and to `Execute`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Program {
    Sequence(SequenceNode),
    Parallel(ParallelNode),
    Execute(ExecuteNode),
    ForEach(ForEachNode),
    While(WhileNode),
    DoWhile(DoWhileNode),
}

impl Program {
    /// Guards attached to this node, or `Guards::default()` for variants
    /// that carry none (`ForEach`/`While`/`DoWhile` gate on their own
    /// condition instead).
    pub fn guards(&self) -> &Guards {
        match self {
            Program::Sequence(n) => &n.guards,
            Program::Parallel(n) => &n.guards,
            Program::Execute(n) => &n.guards,
            Program::ForEach(_) | Program::While(_) | Program::DoWhile(_) => &Guards::EMPTY,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SequenceNode {
    pub elements: Vec<Program>,
    #[serde(flatten)]
    pub guards: Guards,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParallelNode {
    pub branches: Vec<Program>,
    #[serde(flatten)]
    pub guards: Guards,
}

#[derive(Debug, Clone)]
pub struct ExecuteNode {
    pub unit: ExecuteUnit,
    pub with: Vec<String>,
    pub store: Option<String>,
    pub guards: Guards,
}

/// Exactly one of `activity | step | code` names the unit of work; enforced
/// by the hand-written `Deserialize` below rather than by post-hoc
/// validation, since `serde`'s derive has no "exactly one of" primitive.
#[derive(Debug, Clone)]
pub enum ExecuteUnit {
    Activity(String),
    Step(String),
    Code(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForEachNode {
    #[serde(rename = "in")]
    pub source: String,
    #[serde(rename = "as")]
    pub binding: String,
    pub body: Box<Program>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhileNode {
    pub condition: Predicate,
    pub body: Box<Program>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoWhileNode {
    pub body: Box<Program>,
    pub condition: Predicate,
}

/// Guards shared by `Sequence`, `Parallel`, and `Execute`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Guards {
    #[serde(default, rename = "when")]
    pub when: Option<Predicate>,
    #[serde(default, rename = "wait")]
    pub wait: Option<WaitGuard>,
    #[serde(default, rename = "required", skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

impl Guards {
    const EMPTY: Guards = Guards {
        when: None,
        wait: None,
        required: None,
        timeout: None,
        retries: None,
    };

    /// Whether this node should cascade skip to its dependents unconditionally
    /// (a gate node always does; a plain node does only if `required`).
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }
}

/// A predicate evaluated over live bindings. The wire format only ever
/// produces the `Code` case (a literal expression string handed to the
/// injected `CodeEvaluator`); `Native` exists purely for programmatic
/// construction by a host embedding this crate and is never deserialized —
/// hand-written rather than derived, since derive has no way to leave one
/// variant of an otherwise-untagged enum unreachable from the wire.
#[derive(Clone)]
pub enum Predicate {
    Code(String),
    Native(NativePredicate),
}

#[derive(Clone)]
pub struct NativePredicate(pub Arc<dyn Fn(&Bindings) -> bool + Send + Sync>);

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Code(src) => f.debug_tuple("Code").field(src).finish(),
            Predicate::Native(_) => f.write_str("Native(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Predicate::Code)
    }
}

/// A `wait` guard: either a bare predicate (no timeout, waits indefinitely
/// under a host-provided waiter) or a `[predicate, timeoutSeconds]` pair.
#[derive(Debug, Clone)]
pub struct WaitGuard {
    pub predicate: Predicate,
    pub timeout_secs: Option<f64>,
}

impl<'de> Deserialize<'de> for WaitGuard {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bare(Predicate),
            WithTimeout(Predicate, f64),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Bare(predicate) => Ok(WaitGuard {
                predicate,
                timeout_secs: None,
            }),
            Repr::WithTimeout(predicate, timeout_secs) => Ok(WaitGuard {
                predicate,
                timeout_secs: Some(timeout_secs),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for ExecuteNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ExecuteVisitor;

        impl<'de> Visitor<'de> for ExecuteVisitor {
            type Value = ExecuteNode;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an execute node with exactly one of activity|step|code")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut activity: Option<String> = None;
                let mut step: Option<String> = None;
                let mut code: Option<String> = None;
                let mut with: Vec<String> = Vec::new();
                let mut store: Option<String> = None;
                let mut when: Option<Predicate> = None;
                let mut wait: Option<WaitGuard> = None;
                let mut required: Option<bool> = None;
                let mut timeout: Option<f64> = None;
                let mut retries: Option<u32> = None;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "activity" => activity = Some(map.next_value()?),
                        "step" => step = Some(map.next_value()?),
                        "code" => code = Some(map.next_value()?),
                        "with" => with = map.next_value()?,
                        "store" => store = Some(map.next_value()?),
                        "when" => when = Some(map.next_value()?),
                        "wait" => wait = Some(map.next_value()?),
                        "required" => required = Some(map.next_value()?),
                        "timeout" => timeout = Some(map.next_value()?),
                        "retries" => retries = Some(map.next_value()?),
                        _ => {
                            let _: de::IgnoredAny = map.next_value()?;
                        }
                    }
                }

                let unit = match (activity, step, code) {
                    (Some(name), None, None) => ExecuteUnit::Activity(name),
                    (None, Some(name), None) => ExecuteUnit::Step(name),
                    (None, None, Some(src)) => ExecuteUnit::Code(src),
                    (None, None, None) => {
                        return Err(de::Error::custom(
                            "execute node must name one of activity, step, or code",
                        ))
                    }
                    _ => {
                        return Err(de::Error::custom(
                            "execute node must name exactly one of activity, step, or code",
                        ))
                    }
                };

                Ok(ExecuteNode {
                    unit,
                    with,
                    store,
                    guards: Guards {
                        when,
                        wait,
                        required,
                        timeout,
                        retries,
                    },
                })
            }
        }

        deserializer.deserialize_map(ExecuteVisitor)
    }
}

/// A flat step descriptor, the unit consumed by `steplist::steps_to_program`.
#[derive(Debug, Clone, Deserialize)]
pub struct StepDescriptor {
    pub name: String,
    pub method: String,
    #[serde(default)]
    pub with: Vec<String>,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub before: Vec<String>,
    #[serde(default)]
    pub after: Vec<String>,
    #[serde(default = "default_false", skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default)]
    pub when: Option<Predicate>,
    #[serde(default)]
    pub timeout: Option<f64>,
    #[serde(default)]
    pub retries: Option<u32>,
}
