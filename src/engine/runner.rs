// SPDX-License-Identifier: MIT

//! Workflow runner
//!
//! Drives one run from the start pseudo-node along the graph's edges, one node
//! at a time. A run stops when the next node is absent, when the score field
//! reaches the success threshold, when the iteration counter reaches the cap,
//! when the step bound is hit, or when the caller cancels it.

use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::config::{FailurePolicy, RunnerConfig, UnresolvedPolicy};
use super::error::EngineError;
use super::graph::{Graph, GraphCatalog};
use super::node::Node;
use super::registry::NodeRegistry;
use super::state::WorkflowState;
use super::store::{RunRecord, RunStatus, RunStore};

enum NodeOutcome {
    Finished,
    Cancelled,
}

/// Executes graphs against the node registry and records every run
#[derive(Clone)]
pub struct WorkflowRunner {
    graphs: Arc<GraphCatalog>,
    registry: Arc<NodeRegistry>,
    store: Arc<dyn RunStore>,
    config: RunnerConfig,
}

impl WorkflowRunner {
    pub fn new(
        graphs: Arc<GraphCatalog>,
        registry: Arc<NodeRegistry>,
        store: Arc<dyn RunStore>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            graphs,
            registry,
            store,
            config,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn graphs(&self) -> &GraphCatalog {
        &self.graphs
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Run `graph_id` starting from the graph's default state with `overrides`
    /// laid on top
    pub async fn start(
        &self,
        graph_id: &str,
        overrides: Option<WorkflowState>,
    ) -> Result<String, EngineError> {
        let graph = self.graphs.get(graph_id)?;
        let mut initial = graph.default_state().clone();
        if let Some(overrides) = overrides {
            initial.merge(overrides);
        }
        self.execute(graph_id, &initial).await
    }

    /// Run `graph_id` on a copy of `initial` and return the new run id
    pub async fn execute(
        &self,
        graph_id: &str,
        initial: &WorkflowState,
    ) -> Result<String, EngineError> {
        self.execute_with_cancel(graph_id, initial, CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), stopping early once `cancel` fires
    pub async fn execute_with_cancel(
        &self,
        graph_id: &str,
        initial: &WorkflowState,
        cancel: CancellationToken,
    ) -> Result<String, EngineError> {
        let graph = self.graphs.get(graph_id)?;

        let run_id = Uuid::new_v4().simple().to_string();
        let started_at = Utc::now();
        let mut state = initial.clone();
        let mut logs = Vec::new();

        log::info!("Starting run {} of graph '{}'", run_id, graph_id);

        let (status, error) = match self.drive(&graph, &mut state, &mut logs, &cancel).await {
            Ok(status) => (status, None),
            Err(err) => match self.config.on_node_error {
                FailurePolicy::Discard => {
                    log::error!("Run {} aborted: {}", run_id, err);
                    return Err(err);
                }
                FailurePolicy::Record => {
                    log::error!("Run {} failed: {}", run_id, err);
                    logs.push(format!("Run failed: {}", err));
                    (RunStatus::CompletedWithError, Some(err.to_string()))
                }
            },
        };

        log::info!(
            "Run {} finished with {:?} after {} log entries",
            run_id,
            status,
            logs.len()
        );

        self.store
            .put(RunRecord {
                run_id: run_id.clone(),
                graph_id: graph_id.to_string(),
                status,
                state,
                logs,
                error,
                started_at,
                finished_at: Utc::now(),
            })
            .await?;

        Ok(run_id)
    }

    /// Fetch the record of a finished run
    pub async fn result(&self, run_id: &str) -> Result<RunRecord, EngineError> {
        self.store.get(run_id).await
    }

    /// Ids of every recorded run
    pub async fn result_ids(&self) -> Vec<String> {
        self.store.list().await
    }

    /// The dispatch loop. Errors returned here are node failures; the caller
    /// applies the failure policy.
    async fn drive(
        &self,
        graph: &Graph,
        state: &mut WorkflowState,
        logs: &mut Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<RunStatus, EngineError> {
        let cfg = &self.config;
        let mut current = Some(graph.start().to_string());
        let mut steps: u64 = 0;

        while let Some(node_name) = current {
            if self.iteration(state) >= cfg.max_iterations as f64 {
                logs.push(format!(
                    "Iteration cap {} reached, stopping",
                    cfg.max_iterations
                ));
                return Ok(RunStatus::CompletedMaxIterations);
            }
            if cancel.is_cancelled() {
                logs.push("Run cancelled".to_string());
                return Ok(RunStatus::Cancelled);
            }
            if steps >= cfg.max_steps {
                logs.push(format!("Step bound {} reached, stopping", cfg.max_steps));
                return Ok(RunStatus::CompletedMaxIterations);
            }
            steps += 1;

            let next = graph.next(&node_name).map(str::to_string);

            if let Some(next_name) = &next {
                match self.registry.resolve(next_name) {
                    Some(node) => {
                        logs.push(format!("Running {}", next_name));
                        match self.invoke(node.as_ref(), state, cancel).await? {
                            NodeOutcome::Finished => logs.push(self.score_entry(state)),
                            NodeOutcome::Cancelled => {
                                logs.push(format!("Run cancelled while running {}", next_name));
                                return Ok(RunStatus::Cancelled);
                            }
                        }
                    }
                    None => match cfg.on_unresolved {
                        UnresolvedPolicy::Skip => {
                            log::info!("Skipping unresolved node '{}'", next_name);
                            logs.push(format!("Skipping unresolved node '{}'", next_name));
                        }
                        UnresolvedPolicy::Fail => {
                            return Err(EngineError::UnresolvedNode {
                                name: next_name.clone(),
                            });
                        }
                    },
                }
            }

            if let Some(score) = state.get_f64(&cfg.score_field) {
                if score >= cfg.success_threshold {
                    logs.push(format!(
                        "{} reached {}, stopping",
                        cfg.score_field, cfg.success_threshold
                    ));
                    return Ok(RunStatus::Completed);
                }
            }

            current = next;
        }

        Ok(RunStatus::Completed)
    }

    /// prepare → execute → release, raced against cancellation
    async fn invoke(
        &self,
        node: &dyn Node,
        state: &mut WorkflowState,
        cancel: &CancellationToken,
    ) -> Result<NodeOutcome, EngineError> {
        if let Err(e) = node.prepare().await {
            node.release().await;
            return Err(EngineError::node_execution(node.name(), &e));
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(NodeOutcome::Cancelled),
            result = self.execute_node(node, state) => result.map(|_| NodeOutcome::Finished),
        };

        node.release().await;
        outcome
    }

    async fn execute_node(
        &self,
        node: &dyn Node,
        state: &mut WorkflowState,
    ) -> Result<(), EngineError> {
        log::debug!("Executing node: {}", node.name());
        let result = match self.config.node_timeout() {
            Some(limit) => tokio::time::timeout(limit, node.execute(state))
                .await
                .map_err(|_| EngineError::NodeTimeout {
                    node: node.name().to_string(),
                    timeout_ms: limit.as_millis() as u64,
                })?,
            None => node.execute(state).await,
        };
        result.map_err(|e| EngineError::node_execution(node.name(), &e))
    }

    fn iteration(&self, state: &WorkflowState) -> f64 {
        state.get_f64(&self.config.iteration_field).unwrap_or(0.0)
    }

    fn score_entry(&self, state: &WorkflowState) -> String {
        let field = &self.config.score_field;
        match state.get(field) {
            Some(value) => format!("{} = {}", field, value),
            None => format!("{} unset", field),
        }
    }
}
