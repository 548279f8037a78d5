//! Per-node state — what a virtual participant remembers between tasks.

use std::collections::HashMap;

use serde_json::Value;

/// Private context of one virtual node.
///
/// Handlers receive the state by value and hand back the version to keep;
/// the engine commits it only when the execution succeeds, so a failed or
/// panicked handler never corrupts what the node knew before.
#[derive(Debug, Clone, Default)]
pub struct NodeState {
    values: HashMap<String, Value>,
}

impl NodeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Convenience for the common counter pattern: add `delta` to an
    /// integer entry, treating a missing one as zero. Returns the new value.
    pub fn bump(&mut self, key: &str, delta: i64) -> i64 {
        let next = self.get(key).and_then(Value::as_i64).unwrap_or(0) + delta;
        self.insert(key.to_string(), Value::from(next));
        next
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
