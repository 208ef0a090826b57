// SPDX-License-Identifier: MIT

//! Workflow engine
//!
//! This module provides:
//! - `NodeRegistry` - name to node lookup
//! - `Graph` / `GraphCatalog` - single-successor transition tables
//! - `WorkflowRunner` - the dispatch loop and its stopping policy
//! - `RunStore` - write-once storage of finished runs

pub mod config;
pub mod error;
pub mod graph;
pub mod loader;
pub mod node;
pub mod registry;
pub mod runner;
pub mod state;
pub mod store;

pub use config::{AppConfig, FailurePolicy, RunnerConfig, UnresolvedPolicy};
pub use error::{EngineError, NodeError};
pub use graph::{Graph, GraphBuilder, GraphCatalog, GraphDefinition, START};
pub use loader::GraphLoader;
pub use node::{FnNode, Node};
pub use registry::NodeRegistry;
pub use runner::WorkflowRunner;
pub use state::WorkflowState;
pub use store::{InMemoryRunStore, RunRecord, RunStatus, RunStore};
