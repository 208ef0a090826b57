// SPDX-License-Identifier: MIT

//! Runtime state storage for workflow execution
//!
//! The engine treats state as an opaque string-keyed map of JSON values. It
//! only ever reads the iteration counter and the score field, and both names
//! come from configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::EngineError;

/// Mutable state shared by the nodes of a single run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowState {
    fields: Map<String, Value>,
}

impl WorkflowState {
    /// Create an empty WorkflowState
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a state from a JSON object
    pub fn from_json(value: Value) -> Result<Self, EngineError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            Value::Null => Ok(Self::empty()),
            other => Err(EngineError::config(format!(
                "state must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// Replace a field
    pub fn set(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    /// Append to an array field, creating it if absent. Arrays are extended
    /// item by item, anything else is pushed as one element.
    pub fn append(&mut self, key: &str, value: Value) {
        let entry = self
            .fields
            .entry(key.to_string())
            .or_insert(Value::Array(vec![]));
        if !entry.is_array() {
            let previous = entry.take();
            *entry = Value::Array(vec![previous]);
        }
        if let Value::Array(items) = entry {
            match value {
                Value::Array(new_items) => items.extend(new_items),
                other => items.push(other),
            }
        }
    }

    /// Add `delta` to a numeric field, treating a missing field as zero.
    /// Integers stay integers when both sides are integral and the sum fits
    /// in an `i64`; otherwise the field becomes a float.
    pub fn add(&mut self, key: &str, delta: f64) {
        let current = self.get(key);
        let exact = match current.and_then(Value::as_i64) {
            Some(n) if delta.fract() == 0.0 => n.checked_add(delta as i64),
            _ => None,
        };
        let next = match exact {
            Some(sum) => Value::from(sum),
            None => {
                let base = current.and_then(Value::as_f64).unwrap_or(0.0);
                Value::from(base + delta)
            }
        };
        self.set(key, next);
    }

    /// Overlay every field of `other` onto this state
    pub fn merge(&mut self, other: WorkflowState) {
        for (k, v) in other.fields {
            self.fields.insert(k, v);
        }
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a numeric field as f64
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Get an array field as a slice
    pub fn get_array(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_array).map(Vec::as_slice)
    }

    /// Convert state to JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for WorkflowState {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}
