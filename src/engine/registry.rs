// SPDX-License-Identifier: MIT

use super::error::{EngineError, NodeError};
use super::node::{FnNode, Node};
use super::state::WorkflowState;
use std::collections::HashMap;
use std::sync::Arc;

/// Lookup table from node name to node.
///
/// Filled once at start-up and shared read-only (behind an `Arc`) by every
/// run, so resolution never takes a lock.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, Arc<dyn Node>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, node: Arc<dyn Node>) -> Result<(), EngineError> {
        let name = node.name().to_string();
        if self.nodes.contains_key(&name) {
            return Err(EngineError::DuplicateNode { name });
        }
        log::debug!("Registered node: {}", name);
        self.nodes.insert(name, node);
        Ok(())
    }

    /// Register a plain closure as a node
    pub fn register_fn<F>(&mut self, name: &str, func: F) -> Result<(), EngineError>
    where
        F: Fn(&mut WorkflowState) -> Result<(), NodeError> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnNode::new(name, func)))
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Node>> {
        self.nodes.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Registered node names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
