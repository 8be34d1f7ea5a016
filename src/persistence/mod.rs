//! Persistence layer for run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteRunStore;

use crate::core::{GeneratorConfig, PipelineStep, RunState, RunStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Summary of a generator run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run ID
    pub run_id: Uuid,

    /// Project the run generated tests for
    pub project_path: String,

    pub provider: String,
    pub model: String,
    pub step: PipelineStep,
    pub status: RunStatus,

    /// Number of distinct test files written
    pub files_generated: usize,

    pub stages_succeeded: usize,
    pub stages_run: usize,
    pub total_tokens: u32,

    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Error that aborted the run
    pub error: Option<String>,
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Save a run, replacing any earlier record with the same ID
    async fn save_run(&self, run: &RunSummary) -> Result<()>;

    /// Most recent runs first, optionally for one project only
    async fn list_runs(&self, project: Option<&str>, limit: usize) -> Result<Vec<RunSummary>>;
}

/// In-memory persistence (for testing or `--no-history`)
pub struct InMemoryPersistence {
    runs: RwLock<HashMap<Uuid, RunSummary>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for InMemoryPersistence {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        self.runs.write().await.insert(run.run_id, run.clone());
        Ok(())
    }

    async fn list_runs(&self, project: Option<&str>, limit: usize) -> Result<Vec<RunSummary>> {
        let runs = self.runs.read().await;
        let mut result: Vec<RunSummary> = runs
            .values()
            .filter(|r| project.map_or(true, |p| r.project_path == p))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        result.truncate(limit);
        Ok(result)
    }
}

/// Open the history backend
///
/// `ephemeral` selects the in-memory store. Builds without the `sqlite`
/// feature always use it.
pub async fn open_history(ephemeral: bool) -> Result<Arc<dyn PersistenceBackend>> {
    if ephemeral {
        return Ok(Arc::new(InMemoryPersistence::new()));
    }

    #[cfg(feature = "sqlite")]
    let store: Arc<dyn PersistenceBackend> = Arc::new(SqliteRunStore::with_default_path().await?);
    #[cfg(not(feature = "sqlite"))]
    let store: Arc<dyn PersistenceBackend> = Arc::new(InMemoryPersistence::new());

    Ok(store)
}

/// Create a summary from a finished run
pub fn create_summary(state: &RunState, config: &GeneratorConfig) -> RunSummary {
    RunSummary {
        run_id: state.run_id,
        project_path: config.project_path.display().to_string(),
        provider: config.provider.kind.to_string(),
        model: config.provider.model.clone(),
        step: state.step,
        status: state.status,
        files_generated: state.generated_files.len(),
        stages_succeeded: state.stages_succeeded(),
        stages_run: state.stages.len(),
        total_tokens: state.usage.total_tokens,
        started_at: state.started_at.unwrap_or_else(Utc::now),
        completed_at: state.completed_at,
        error: state.error.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn summary(project: &str, minutes_ago: i64) -> RunSummary {
        RunSummary {
            run_id: Uuid::new_v4(),
            project_path: project.to_string(),
            provider: "demo".to_string(),
            model: "llama3.2:latest".to_string(),
            step: PipelineStep::Full,
            status: RunStatus::Completed,
            files_generated: 3,
            stages_succeeded: 4,
            stages_run: 5,
            total_tokens: 0,
            started_at: Utc::now() - Duration::minutes(minutes_ago),
            completed_at: Some(Utc::now()),
            error: None,
        }
    }

    #[tokio::test]
    async fn test_in_memory_lists_latest_first() {
        let store = InMemoryPersistence::new();
        let old = summary("/src/a", 30);
        let new = summary("/src/a", 1);
        let other = summary("/src/b", 10);
        for run in [&old, &new, &other] {
            store.save_run(run).await.unwrap();
        }

        let runs = store.list_runs(Some("/src/a"), 10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].run_id, new.run_id);

        let runs = store.list_runs(None, 2).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].run_id, other.run_id);
    }

    #[tokio::test]
    async fn test_in_memory_save_replaces_same_run() {
        let store = InMemoryPersistence::new();
        let mut run = summary("/src/a", 5);
        store.save_run(&run).await.unwrap();

        run.status = RunStatus::Failed;
        store.save_run(&run).await.unwrap();

        let runs = store.list_runs(None, 10).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Failed);
    }
}
