// SPDX-License-Identifier: MIT

//! Typed error handling for the workflow engine
//!
//! Lookup failures (`GraphNotFound`, `RunNotFound`) are caller-facing and get
//! mapped to "not found" responses by the transport. Everything raised while a
//! run is in flight is funnelled through the runner's failure policy first.

use thiserror::Error;

/// Top-level error type for loopflow
#[derive(Debug, Error)]
pub enum EngineError {
    /// Requested graph id is not registered; the run never starts
    #[error("Graph '{id}' not found")]
    GraphNotFound { id: String },

    /// Requested run id is not in the run store
    #[error("Run '{id}' not found")]
    RunNotFound { id: String },

    /// A graph edge points at a node the registry does not know
    #[error("Node '{name}' is not registered")]
    UnresolvedNode { name: String },

    /// A node returned an error while executing
    #[error("Node '{node}' failed: {message}")]
    NodeExecution { node: String, message: String },

    /// A node did not finish within the configured timeout
    #[error("Node '{node}' timed out after {timeout_ms}ms")]
    NodeTimeout { node: String, timeout_ms: u64 },

    /// Node name registered twice
    #[error("Node '{name}' is already registered")]
    DuplicateNode { name: String },

    /// Graph id registered twice
    #[error("Graph '{id}' is already registered")]
    DuplicateGraph { id: String },

    /// Run id written twice
    #[error("Run '{id}' already exists")]
    RunAlreadyExists { id: String },

    /// Graph definition is malformed
    #[error("Invalid graph '{id}': {reason}")]
    InvalidGraph { id: String, reason: String },

    /// Configuration errors (invalid env vars, bad config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Error returned by a node body
#[derive(Debug, Error)]
pub enum NodeError {
    /// A state field the node depends on is missing or has the wrong shape
    #[error("Field '{field}' is missing or not {expected}")]
    InvalidField { field: String, expected: String },

    /// Any other failure
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    /// Create a graph not found error
    pub fn graph_not_found(id: impl Into<String>) -> Self {
        Self::GraphNotFound { id: id.into() }
    }

    /// Create a run not found error
    pub fn run_not_found(id: impl Into<String>) -> Self {
        Self::RunNotFound { id: id.into() }
    }

    /// Create a node execution error
    pub fn node_execution(node: impl Into<String>, err: &NodeError) -> Self {
        Self::NodeExecution {
            node: node.into(),
            message: err.to_string(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True for errors the transport reports as "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::GraphNotFound { .. } | Self::RunNotFound { .. })
    }
}

impl NodeError {
    pub fn invalid_field(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            expected: expected.into(),
        }
    }
}

impl From<&str> for NodeError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for NodeError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}
