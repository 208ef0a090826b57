// SPDX-License-Identifier: MIT

//! Engine and application configuration
//!
//! Values come from an optional YAML file and are then overridden by
//! `LOOPFLOW_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::error::EngineError;
use super::graph::START;

/// What the runner does when an edge points at an unregistered node
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Log the gap and keep following edges (default)
    #[default]
    Skip,
    /// Treat it as a node failure
    Fail,
}

/// What happens to a run whose node fails
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Store the partial state and log, marked as completed with error (default)
    #[default]
    Record,
    /// Drop the run and return the error to the caller
    Discard,
}

/// Stopping policy and failure handling for the workflow runner
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Runs stop once the iteration counter reaches this value
    pub max_iterations: u64,
    /// Hard bound on node invocations per run
    pub max_steps: u64,
    /// Runs stop early once the score field reaches this value
    pub success_threshold: f64,
    /// State field holding the score
    pub score_field: String,
    /// State field holding the iteration counter
    pub iteration_field: String,
    /// Name of the start pseudo-node
    pub start_node: String,
    pub on_unresolved: UnresolvedPolicy,
    pub on_node_error: FailurePolicy,
    /// Per-node timeout in milliseconds
    pub node_timeout_ms: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            max_steps: 100,
            success_threshold: 80.0,
            score_field: "quality_score".to_string(),
            iteration_field: "iteration".to_string(),
            start_node: START.to_string(),
            on_unresolved: UnresolvedPolicy::Skip,
            on_node_error: FailurePolicy::Record,
            node_timeout_ms: None,
        }
    }
}

impl RunnerConfig {
    pub fn node_timeout(&self) -> Option<Duration> {
        self.node_timeout_ms.map(Duration::from_millis)
    }
}

/// Process-wide settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub port: u16,
    /// Directory of YAML graph definitions loaded at start-up
    pub graphs_dir: Option<PathBuf>,
    /// Graph used when a start request names none
    pub default_graph: String,
    pub runner: RunnerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            graphs_dir: None,
            default_graph: "code-review-1".to_string(),
            runner: RunnerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from an optional YAML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    pub fn parse_yaml(content: &str) -> Result<Self, EngineError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `LOOPFLOW_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LOOPFLOW_PORT") {
            self.port = parse_var("LOOPFLOW_PORT", &v)?;
        }
        if let Some(v) = lookup("LOOPFLOW_GRAPHS_DIR") {
            self.graphs_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("LOOPFLOW_DEFAULT_GRAPH") {
            self.default_graph = v;
        }

        let runner = &mut self.runner;
        if let Some(v) = lookup("LOOPFLOW_MAX_ITERATIONS") {
            runner.max_iterations = parse_var("LOOPFLOW_MAX_ITERATIONS", &v)?;
        }
        if let Some(v) = lookup("LOOPFLOW_MAX_STEPS") {
            runner.max_steps = parse_var("LOOPFLOW_MAX_STEPS", &v)?;
        }
        if let Some(v) = lookup("LOOPFLOW_SUCCESS_THRESHOLD") {
            runner.success_threshold = parse_var("LOOPFLOW_SUCCESS_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("LOOPFLOW_SCORE_FIELD") {
            runner.score_field = v;
        }
        if let Some(v) = lookup("LOOPFLOW_ITERATION_FIELD") {
            runner.iteration_field = v;
        }
        if let Some(v) = lookup("LOOPFLOW_START_NODE") {
            runner.start_node = v;
        }
        if let Some(v) = lookup("LOOPFLOW_UNRESOLVED") {
            runner.on_unresolved = match v.to_lowercase().as_str() {
                "skip" => UnresolvedPolicy::Skip,
                "fail" => UnresolvedPolicy::Fail,
                other => {
                    return Err(EngineError::config(format!(
                        "LOOPFLOW_UNRESOLVED must be 'skip' or 'fail', got '{}'",
                        other
                    )))
                }
            };
        }
        if let Some(v) = lookup("LOOPFLOW_ON_NODE_ERROR") {
            runner.on_node_error = match v.to_lowercase().as_str() {
                "record" => FailurePolicy::Record,
                "discard" => FailurePolicy::Discard,
                other => {
                    return Err(EngineError::config(format!(
                        "LOOPFLOW_ON_NODE_ERROR must be 'record' or 'discard', got '{}'",
                        other
                    )))
                }
            };
        }
        if let Some(v) = lookup("LOOPFLOW_NODE_TIMEOUT_MS") {
            runner.node_timeout_ms = Some(parse_var("LOOPFLOW_NODE_TIMEOUT_MS", &v)?);
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, EngineError> {
    value
        .trim()
        .parse()
        .map_err(|_| EngineError::config(format!("invalid value for {}: '{}'", key, value)))
}
