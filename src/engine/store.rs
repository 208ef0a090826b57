// SPDX-License-Identifier: MIT

//! Run records and the store that keeps them
//!
//! Records are written once, whole, at the end of a run and never modified.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::EngineError;
use super::state::WorkflowState;

const DEFAULT_SHARDS: usize = 16;

/// How a run ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Reached a terminal node or the success threshold
    Completed,
    /// Stopped by the iteration cap or the step bound
    CompletedMaxIterations,
    /// A node failed; state and log cover everything up to the failure
    CompletedWithError,
    /// Stopped by the caller's cancellation token
    Cancelled,
}

/// Final outcome of one run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub run_id: String,
    pub graph_id: String,
    pub status: RunStatus,
    pub state: WorkflowState,
    pub logs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Key-value storage for run records
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Insert a record. Fails if the id is already taken.
    async fn put(&self, record: RunRecord) -> Result<(), EngineError>;

    /// Look a record up by run id
    async fn get(&self, run_id: &str) -> Result<RunRecord, EngineError>;

    /// Ids of every stored run
    async fn list(&self) -> Vec<String>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

type Shard = RwLock<HashMap<String, Arc<RunRecord>>>;

/// Process-lifetime run store split into independently locked shards, so
/// writes from unrelated runs rarely contend
#[derive(Clone)]
pub struct InMemoryRunStore {
    shards: Arc<Vec<Shard>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    pub fn with_shards(count: usize) -> Self {
        let shards = (0..count.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self {
            shards: Arc::new(shards),
        }
    }

    fn shard(&self, run_id: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        run_id.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }
}

impl Default for InMemoryRunStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn put(&self, record: RunRecord) -> Result<(), EngineError> {
        let mut shard = self.shard(&record.run_id).write().await;
        if shard.contains_key(&record.run_id) {
            return Err(EngineError::RunAlreadyExists {
                id: record.run_id.clone(),
            });
        }
        shard.insert(record.run_id.clone(), Arc::new(record));
        Ok(())
    }

    async fn get(&self, run_id: &str) -> Result<RunRecord, EngineError> {
        let shard = self.shard(run_id).read().await;
        shard
            .get(run_id)
            .map(|record| record.as_ref().clone())
            .ok_or_else(|| EngineError::run_not_found(run_id))
    }

    async fn list(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for shard in self.shards.iter() {
            ids.extend(shard.read().await.keys().cloned());
        }
        ids.sort();
        ids
    }

    async fn len(&self) -> usize {
        let mut total = 0;
        for shard in self.shards.iter() {
            total += shard.read().await.len();
        }
        total
    }
}
