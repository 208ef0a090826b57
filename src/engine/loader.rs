//! Graph loader - YAML file loading and parsing
//!
//! This module handles loading graph definitions from YAML files.

use super::error::EngineError;
use super::graph::{Graph, GraphCatalog, GraphDefinition};
use std::fs;
use std::path::Path;

/// Loads graph definitions from YAML files
pub struct GraphLoader {
    default_start: String,
}

impl GraphLoader {
    /// `default_start` names the start node of definitions that omit one
    pub fn new(default_start: impl Into<String>) -> Self {
        Self {
            default_start: default_start.into(),
        }
    }

    /// Load a graph from a YAML file
    pub fn load_graph<P: AsRef<Path>>(&self, path: P) -> Result<Graph, EngineError> {
        let content = fs::read_to_string(path)?;
        let def = Self::parse_yaml(&content)?;
        Graph::from_definition(def, &self.default_start)
    }

    /// Parse a graph definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<GraphDefinition, EngineError> {
        let def: GraphDefinition = serde_yaml::from_str(content)?;
        Ok(def)
    }

    /// Register every `*.yaml` / `*.yml` graph found in `dir`, in file name
    /// order. Returns how many graphs were added.
    pub fn load_dir<P: AsRef<Path>>(
        &self,
        dir: P,
        catalog: &mut GraphCatalog,
    ) -> Result<usize, EngineError> {
        let mut paths: Vec<_> = fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .collect();
        paths.sort();

        for path in &paths {
            let graph = self.load_graph(path)?;
            log::info!("Loaded graph '{}' from {}", graph.id(), path.display());
            catalog.register(graph)?;
        }
        Ok(paths.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graph::START;
    use std::io::Write;

    const REVIEW_YAML: &str = r#"
id: review
description: "Review loop"
edges:
  start: extract
  extract: check
  check: suggest
  suggest: check
"#;

    #[test]
    fn test_parse_graph() {
        let def = GraphLoader::parse_yaml(REVIEW_YAML).unwrap();
        assert_eq!(def.id, "review");
        assert_eq!(def.edges.len(), 4);
        assert!(def.state.is_none());
    }

    #[test]
    fn test_invalid_yaml_returns_error() {
        let yaml = r#"
id:
  - invalid structure
"#;
        assert!(GraphLoader::parse_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_graph_uses_default_start() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "id: g\nedges:\n  begin: a\n  a: b\n").unwrap();

        let graph = GraphLoader::new("begin").load_graph(file.path()).unwrap();
        assert_eq!(graph.start(), "begin");
        assert_eq!(graph.next("begin"), Some("a"));
    }

    #[test]
    fn test_load_graph_without_start_edge_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "id: g\nedges:\n  a: b\n").unwrap();

        let err = GraphLoader::new(START).load_graph(file.path()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidGraph { .. }));
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("review.yaml"), REVIEW_YAML).unwrap();
        fs::write(
            dir.path().join("other.yml"),
            "id: other\nedges:\n  start: only\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not a graph").unwrap();

        let mut catalog = GraphCatalog::new();
        let loaded = GraphLoader::new(START)
            .load_dir(dir.path(), &mut catalog)
            .unwrap();

        assert_eq!(loaded, 2);
        assert!(catalog.get("review").is_ok());
        assert!(catalog.get("other").is_ok());
    }

    #[test]
    fn test_load_dir_rejects_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yaml"), REVIEW_YAML).unwrap();
        fs::write(dir.path().join("b.yaml"), REVIEW_YAML).unwrap();

        let mut catalog = GraphCatalog::new();
        let err = GraphLoader::new(START)
            .load_dir(dir.path(), &mut catalog)
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateGraph { .. }));
    }
}
