//! The live, shared variable environment.
//!
//! `Bindings` is the single source of truth for program state: the builder
//! consults it only indirectly (through node `store` bookkeeping), but the
//! driver reads and writes it directly, and a caller holding a clone sees
//! every write the instant it happens. There is no driver-owned shadow copy.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;

/// A cheap-to-clone handle onto a shared key/value map.
///
/// Reads support dotted paths (`"a.b.c"`); writes are always to a top-level
/// key. An absent key, or a dotted path that walks through a non-object
/// value, resolves to [`Value::Null`] — the undefined sentinel used
/// throughout the core.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    inner: Arc<RwLock<FxHashMap<String, Value>>>,
}

impl Bindings {
    /// Build bindings seeded with the given initial variables.
    pub fn new(initial: serde_json::Map<String, Value>) -> Self {
        let map = initial.into_iter().collect::<FxHashMap<_, _>>();
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Resolve a (possibly dotted) key. Returns `Value::Null` if the key is
    /// absent or the path walks through a non-object.
    pub fn get(&self, key: &str) -> Value {
        let guard = self.inner.read();
        let mut parts = key.split('.');
        let Some(first) = parts.next() else {
            return Value::Null;
        };
        let Some(mut current) = guard.get(first).cloned() else {
            return Value::Null;
        };
        for part in parts {
            match current {
                Value::Object(ref map) => match map.get(part) {
                    Some(next) => current = next.clone(),
                    None => return Value::Null,
                },
                _ => return Value::Null,
            }
        }
        current
    }

    /// True if the resolved value is not the undefined sentinel.
    pub fn is_defined(&self, key: &str) -> bool {
        !matches!(self.get(key), Value::Null)
    }

    /// Write a value at a top-level key, visible immediately to subsequent
    /// `get` calls and to any other holder of a clone of these bindings.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.inner.write().insert(key.into(), value);
    }

    /// Resolve every name in `keys`, in order, as positional/by-name
    /// arguments for an executor invocation.
    pub fn resolve_all(&self, keys: &[String]) -> Vec<Value> {
        keys.iter().map(|k| self.get(k)).collect()
    }

    /// Snapshot the current bindings as a `serde_json::Map`, primarily for
    /// handing a scope to a `CodeEvaluator`.
    pub fn snapshot(&self) -> serde_json::Map<String, Value> {
        self.inner.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_path_reads_nested_object() {
        let mut initial = serde_json::Map::new();
        initial.insert("a".into(), serde_json::json!({"b": {"c": 42}}));
        let bindings = Bindings::new(initial);
        assert_eq!(bindings.get("a.b.c"), serde_json::json!(42));
    }

    #[test]
    fn missing_key_is_undefined() {
        let bindings = Bindings::new(serde_json::Map::new());
        assert_eq!(bindings.get("nope"), Value::Null);
        assert!(!bindings.is_defined("nope"));
    }

    #[test]
    fn non_object_intermediate_is_undefined() {
        let mut initial = serde_json::Map::new();
        initial.insert("a".into(), serde_json::json!(5));
        let bindings = Bindings::new(initial);
        assert_eq!(bindings.get("a.b"), Value::Null);
    }

    #[test]
    fn set_is_visible_through_clone() {
        let bindings = Bindings::new(serde_json::Map::new());
        let other = bindings.clone();
        other.set("x", serde_json::json!("hello"));
        assert_eq!(bindings.get("x"), serde_json::json!("hello"));
    }
}
