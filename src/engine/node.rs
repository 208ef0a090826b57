// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use super::error::NodeError;
use super::state::WorkflowState;

/// A named unit of work that reads and mutates the state of a run.
///
/// The runner calls `prepare`, then `execute`, then `release`. `release` runs
/// whether or not `prepare` and `execute` succeeded, so a node can scope any
/// resource it acquires to a single invocation, including one `prepare` only
/// partly set up.
#[async_trait]
pub trait Node: Send + Sync {
    /// Returns the node name (must be unique within a registry)
    fn name(&self) -> &str;

    /// Acquire whatever the node needs before running
    async fn prepare(&self) -> Result<(), NodeError> {
        Ok(())
    }

    /// Mutate the run state in place
    async fn execute(&self, state: &mut WorkflowState) -> Result<(), NodeError>;

    /// Release anything acquired in `prepare`
    async fn release(&self) {}
}

type NodeFn = dyn Fn(&mut WorkflowState) -> Result<(), NodeError> + Send + Sync;

/// Adapts a plain synchronous closure into a [`Node`]
pub struct FnNode {
    name: String,
    func: Box<NodeFn>,
}

impl FnNode {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut WorkflowState) -> Result<(), NodeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

#[async_trait]
impl Node for FnNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, state: &mut WorkflowState) -> Result<(), NodeError> {
        (self.func)(state)
    }
}
