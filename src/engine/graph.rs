// SPDX-License-Identifier: MIT

//! Graph definitions
//!
//! A graph is a single-successor transition table: every node name maps to at
//! most one next node. A reserved start key points at the first real node.
//! Cycles are allowed, they are how a workflow loops back for another pass.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::error::EngineError;
use super::registry::NodeRegistry;
use super::state::WorkflowState;

/// Default name of the start pseudo-node
pub const START: &str = "start";

/// Declarative graph definition, as loaded from YAML
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GraphDefinition {
    /// Graph identifier
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Name of the start pseudo-node; the configured default when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Transition table: node -> successor
    pub edges: BTreeMap<String, String>,
    /// Default initial state for runs of this graph
    #[serde(default)]
    pub state: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Immutable transition table for one workflow
#[derive(Debug, Clone)]
pub struct Graph {
    id: String,
    description: String,
    start: String,
    edges: HashMap<String, String>,
    default_state: WorkflowState,
}

impl Graph {
    pub fn builder(id: impl Into<String>) -> GraphBuilder {
        GraphBuilder::new(id)
    }

    /// Build a graph from its declarative definition, falling back to
    /// `default_start` when the definition does not name its start node
    pub fn from_definition(
        def: GraphDefinition,
        default_start: &str,
    ) -> Result<Self, EngineError> {
        let start = def.start.unwrap_or_else(|| default_start.to_string());
        let mut builder = GraphBuilder::new(def.id)
            .description(def.description)
            .start_node(start);
        for (from, to) in def.edges {
            builder = builder.edge(from, to);
        }
        if let Some(state) = def.state {
            builder = builder.default_state(WorkflowState::from(state));
        }
        builder.build()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Name of the start pseudo-node
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Successor of `node`, or `None` if `node` is terminal
    pub fn next(&self, node: &str) -> Option<&str> {
        self.edges.get(node).map(String::as_str)
    }

    /// State runs of this graph begin with unless the caller overrides it
    pub fn default_state(&self) -> &WorkflowState {
        &self.default_state
    }

    /// Every real node named in the table, sorted
    pub fn nodes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .edges
            .iter()
            .flat_map(|(from, to)| [from.as_str(), to.as_str()])
            .filter(|name| *name != self.start)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Successor names the registry cannot resolve
    pub fn unresolved_nodes(&self, registry: &NodeRegistry) -> Vec<&str> {
        let mut missing: Vec<&str> = self
            .edges
            .values()
            .map(String::as_str)
            .filter(|name| !registry.contains(name))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }

    /// Back to the declarative form, for listing
    pub fn to_definition(&self) -> GraphDefinition {
        GraphDefinition {
            id: self.id.clone(),
            description: self.description.clone(),
            start: Some(self.start.clone()),
            edges: self
                .edges
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            state: match self.default_state.to_json() {
                serde_json::Value::Object(map) if !map.is_empty() => Some(map),
                _ => None,
            },
        }
    }
}

/// Builder for [`Graph`]
pub struct GraphBuilder {
    id: String,
    description: String,
    start: String,
    edges: HashMap<String, String>,
    default_state: WorkflowState,
}

impl GraphBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            start: START.to_string(),
            edges: HashMap::new(),
            default_state: WorkflowState::empty(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Rename the start pseudo-node
    pub fn start_node(mut self, name: impl Into<String>) -> Self {
        self.start = name.into();
        self
    }

    /// Set the first real node, i.e. the successor of the start pseudo-node
    pub fn first(mut self, node: impl Into<String>) -> Self {
        self.edges.insert(self.start.clone(), node.into());
        self
    }

    /// Add (or replace) the successor of `from`
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.insert(from.into(), to.into());
        self
    }

    pub fn default_state(mut self, state: WorkflowState) -> Self {
        self.default_state = state;
        self
    }

    pub fn build(self) -> Result<Graph, EngineError> {
        if self.id.trim().is_empty() {
            return Err(EngineError::InvalidGraph {
                id: self.id,
                reason: "graph id is empty".to_string(),
            });
        }
        if !self.edges.contains_key(&self.start) {
            return Err(EngineError::InvalidGraph {
                reason: format!("no edge leaves the start node '{}'", self.start),
                id: self.id,
            });
        }
        Ok(Graph {
            id: self.id,
            description: self.description,
            start: self.start,
            edges: self.edges,
            default_state: self.default_state,
        })
    }
}

/// All graphs known to the process, keyed by graph id.
///
/// Filled at start-up and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct GraphCatalog {
    graphs: HashMap<String, Arc<Graph>>,
}

impl GraphCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, graph: Graph) -> Result<(), EngineError> {
        if self.graphs.contains_key(graph.id()) {
            return Err(EngineError::DuplicateGraph {
                id: graph.id().to_string(),
            });
        }
        log::debug!("Registered graph: {}", graph.id());
        self.graphs.insert(graph.id().to_string(), Arc::new(graph));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Arc<Graph>, EngineError> {
        self.graphs
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::graph_not_found(id))
    }

    /// Successor of `node` in graph `graph_id`
    pub fn next(&self, graph_id: &str, node: &str) -> Result<Option<&str>, EngineError> {
        self.graphs
            .get(graph_id)
            .map(|g| g.next(node))
            .ok_or_else(|| EngineError::graph_not_found(graph_id))
    }

    /// All graphs, sorted by id
    pub fn graphs(&self) -> Vec<Arc<Graph>> {
        let mut graphs: Vec<Arc<Graph>> = self.graphs.values().cloned().collect();
        graphs.sort_by(|a, b| a.id().cmp(b.id()));
        graphs
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn review_graph() -> Graph {
        Graph::builder("review")
            .first("extract")
            .edge("extract", "check")
            .edge("check", "suggest")
            .edge("suggest", "check")
            .build()
            .unwrap()
    }

    #[test]
    fn test_next_follows_edges() {
        let graph = review_graph();
        assert_eq!(graph.next(START), Some("extract"));
        assert_eq!(graph.next("suggest"), Some("check"));
        assert_eq!(graph.next("unknown"), None);
    }

    #[test]
    fn test_nodes_excludes_start() {
        assert_eq!(review_graph().nodes(), vec!["check", "extract", "suggest"]);
    }

    #[test]
    fn test_build_requires_start_edge() {
        let err = Graph::builder("g").edge("a", "b").build().unwrap_err();
        assert!(matches!(err, EngineError::InvalidGraph { .. }));
    }

    #[test]
    fn test_build_allows_edge_into_start() {
        let graph = Graph::builder("g")
            .first("a")
            .edge("a", START)
            .build()
            .unwrap();
        assert_eq!(graph.next("a"), Some(START));
        assert_eq!(graph.next(START), Some("a"));
    }

    #[test]
    fn test_custom_start_node() {
        let graph = Graph::builder("g")
            .start_node("begin")
            .first("a")
            .build()
            .unwrap();
        assert_eq!(graph.start(), "begin");
        assert_eq!(graph.next("begin"), Some("a"));
    }

    #[test]
    fn test_unresolved_nodes() {
        let mut registry = NodeRegistry::new();
        registry.register_fn("extract", |_| Ok(())).unwrap();
        registry.register_fn("check", |_| Ok(())).unwrap();

        assert_eq!(review_graph().unresolved_nodes(&registry), vec!["suggest"]);
    }

    #[test]
    fn test_definition_deserialize() {
        let yaml = r#"
            id: code-review-1
            description: Review loop
            edges:
              start: extract
              extract: check
              check: suggest
              suggest: check
            state:
              quality_score: 50
              iteration: 0
        "#;
        let def: GraphDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(def.start.is_none());

        let graph = Graph::from_definition(def, START).unwrap();
        assert_eq!(graph.id(), "code-review-1");
        assert_eq!(graph.description(), "Review loop");
        assert_eq!(graph.next("check"), Some("suggest"));
        assert_eq!(graph.default_state().get("quality_score"), Some(&json!(50)));
    }

    #[test]
    fn test_definition_with_own_start() {
        let yaml = r#"
            id: g
            start: begin
            edges:
              begin: a
        "#;
        let def: GraphDefinition = serde_yaml::from_str(yaml).unwrap();
        let graph = Graph::from_definition(def, START).unwrap();
        assert_eq!(graph.start(), "begin");
        assert_eq!(graph.next("begin"), Some("a"));
    }

    #[test]
    fn test_to_definition_preserves_edges() {
        let def = review_graph().to_definition();
        assert_eq!(def.edges.len(), 4);
        assert_eq!(def.edges["suggest"], "check");
        assert!(def.state.is_none());
    }

    #[test]
    fn test_catalog_lookup() {
        let mut catalog = GraphCatalog::new();
        catalog.register(review_graph()).unwrap();

        assert_eq!(catalog.next("review", "extract").unwrap(), Some("check"));
        assert_eq!(catalog.next("review", "check").unwrap(), Some("suggest"));
        assert!(matches!(
            catalog.next("missing", START),
            Err(EngineError::GraphNotFound { .. })
        ));
        assert!(catalog.get("review").is_ok());
    }

    #[test]
    fn test_catalog_rejects_duplicate_ids() {
        let mut catalog = GraphCatalog::new();
        catalog.register(review_graph()).unwrap();
        let err = catalog.register(review_graph()).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateGraph { id } if id == "review"));
        assert_eq!(catalog.len(), 1);
    }
}
