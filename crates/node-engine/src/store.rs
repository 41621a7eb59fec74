//! Run result persistence
//!
//! `RunStore` is the contract the host uses to keep finished runs. Results are
//! stored whole and keyed by workflow, then by run id. Runs without a
//! workflow id are filed under [`DEFAULT_WORKFLOW_ID`].
//!
//! # Example
//!
//! ```ignore
//! use node_engine::{FileRunStore, RunStore};
//!
//! let store = FileRunStore::new("data/runs");
//! store.persist_run_result(&result).await?;
//! let history = store.get_run_history("default-workflow", 20).await?;
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{NodeEngineError, Result};
use crate::result::{EngineRunResult, RunHistoryItem};

/// Workflow id used when a run carries none
pub const DEFAULT_WORKFLOW_ID: &str = "default-workflow";

/// Durable keyed storage for finished runs
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Store a finished run, replacing any earlier copy with the same run id
    async fn persist_run_result(&self, result: &EngineRunResult) -> Result<()>;

    /// Most recent run of a workflow
    async fn get_latest_run_result(&self, workflow_id: &str) -> Result<Option<EngineRunResult>>;

    async fn get_run_result_by_id(
        &self,
        run_id: &str,
        workflow_id: &str,
    ) -> Result<Option<EngineRunResult>>;

    /// Run summaries, newest first
    async fn get_run_history(&self, workflow_id: &str, limit: usize) -> Result<Vec<RunHistoryItem>>;
}

fn workflow_key(result: &EngineRunResult) -> &str {
    result.workflow_id.as_deref().unwrap_or(DEFAULT_WORKFLOW_ID)
}

/// Newest first; ties keep the later-stored run first
fn sort_newest_first(results: &mut [EngineRunResult]) {
    results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Volatile store for tests and one-shot hosts
#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    runs: RwLock<HashMap<String, Vec<EngineRunResult>>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn persist_run_result(&self, result: &EngineRunResult) -> Result<()> {
        let mut runs = self.runs.write();
        let entries = runs.entry(workflow_key(result).to_string()).or_default();
        entries.retain(|r| r.run_id != result.run_id);
        entries.insert(0, result.clone());
        sort_newest_first(entries);
        Ok(())
    }

    async fn get_latest_run_result(&self, workflow_id: &str) -> Result<Option<EngineRunResult>> {
        Ok(self
            .runs
            .read()
            .get(workflow_id)
            .and_then(|entries| entries.first().cloned()))
    }

    async fn get_run_result_by_id(
        &self,
        run_id: &str,
        workflow_id: &str,
    ) -> Result<Option<EngineRunResult>> {
        Ok(self.runs.read().get(workflow_id).and_then(|entries| {
            entries.iter().find(|r| r.run_id == run_id).cloned()
        }))
    }

    async fn get_run_history(
        &self,
        workflow_id: &str,
        limit: usize,
    ) -> Result<Vec<RunHistoryItem>> {
        Ok(self
            .runs
            .read()
            .get(workflow_id)
            .map(|entries| entries.iter().take(limit).map(|r| r.summary()).collect())
            .unwrap_or_default())
    }
}

/// One JSON file per run under `<root>/<workflow_id>/<run_id>.json`
#[derive(Debug, Clone)]
pub struct FileRunStore {
    root: PathBuf,
}

impl FileRunStore {
    /// The directory is created on first write
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn workflow_dir(&self, workflow_id: &str) -> Result<PathBuf> {
        Ok(self.root.join(path_component(workflow_id)?))
    }

    fn run_path(&self, workflow_id: &str, run_id: &str) -> Result<PathBuf> {
        Ok(self
            .workflow_dir(workflow_id)?
            .join(format!("{}.json", path_component(run_id)?)))
    }

    /// Every parseable run of a workflow, newest first
    async fn load_all(&self, workflow_id: &str) -> Result<Vec<EngineRunResult>> {
        let dir = self.workflow_dir(workflow_id)?;
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_path = entry.path();
            if file_path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&file_path).await?;
            match serde_json::from_str::<EngineRunResult>(&content) {
                Ok(result) => results.push(result),
                Err(e) => log::warn!("Failed to parse run from {:?}: {}", file_path, e),
            }
        }
        sort_newest_first(&mut results);
        Ok(results)
    }
}

/// Reject ids that would leave the store's directory
fn path_component(id: &str) -> Result<&str> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\'])
        && !id.contains('\0');
    if valid {
        Ok(id)
    } else {
        Err(NodeEngineError::Store(format!("invalid id '{}'", id)))
    }
}

#[async_trait]
impl RunStore for FileRunStore {
    async fn persist_run_result(&self, result: &EngineRunResult) -> Result<()> {
        let dir = self.workflow_dir(workflow_key(result))?;
        tokio::fs::create_dir_all(&dir).await?;
        let file_path = self.run_path(workflow_key(result), &result.run_id)?;
        let content = serde_json::to_string_pretty(result)?;
        tokio::fs::write(&file_path, content).await?;
        log::debug!("Saved run '{}' to {:?}", result.run_id, file_path);
        Ok(())
    }

    async fn get_latest_run_result(&self, workflow_id: &str) -> Result<Option<EngineRunResult>> {
        Ok(self.load_all(workflow_id).await?.into_iter().next())
    }

    async fn get_run_result_by_id(
        &self,
        run_id: &str,
        workflow_id: &str,
    ) -> Result<Option<EngineRunResult>> {
        let file_path = self.run_path(workflow_id, run_id)?;
        if !tokio::fs::try_exists(&file_path).await? {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&file_path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn get_run_history(
        &self,
        workflow_id: &str,
        limit: usize,
    ) -> Result<Vec<RunHistoryItem>> {
        Ok(self
            .load_all(workflow_id)
            .await?
            .iter()
            .take(limit)
            .map(|r| r.summary())
            .collect())
    }
}
