// SPDX-License-Identifier: MIT

//! Code review workflow
//!
//! Three nodes (`extract`, `check`, `suggest`) wired into a loop that keeps
//! re-checking the code after each round of suggestions.

pub mod nodes;

use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::engine::{EngineError, Graph, NodeRegistry, WorkflowState};
pub use nodes::{CheckIssues, ExtractFunctions, GiveSuggestions};

/// Id the review graph is registered under
pub const GRAPH_ID: &str = "code-review-1";

static DEFAULT_STATE: Lazy<Value> = Lazy::new(|| {
    json!({
        "code": "some python code",
        "functions": [],
        "issues": [],
        "quality_score": 50,
        "suggestions": [],
        "iteration": 0
    })
});

/// State a review run starts from
pub fn default_state() -> WorkflowState {
    match &*DEFAULT_STATE {
        Value::Object(fields) => WorkflowState::from(fields.clone()),
        _ => WorkflowState::empty(),
    }
}

/// Register the review nodes
pub fn register_nodes(registry: &mut NodeRegistry) -> Result<(), EngineError> {
    registry.register(Arc::new(ExtractFunctions))?;
    registry.register(Arc::new(CheckIssues))?;
    registry.register(Arc::new(GiveSuggestions))?;
    Ok(())
}

/// The review loop: extract → check → suggest → check → ...
pub fn graph(start: &str) -> Result<Graph, EngineError> {
    Graph::builder(GRAPH_ID)
        .description("Code review agent: extract functions, check issues, suggest fixes")
        .start_node(start)
        .first("extract")
        .edge("extract", "check")
        .edge("check", "suggest")
        .edge("suggest", "check")
        .default_state(default_state())
        .build()
}
