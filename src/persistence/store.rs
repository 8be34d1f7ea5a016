//! SQLite-based run history store

use crate::persistence::{PersistenceBackend, RunSummary};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

const COLUMNS: &str = "id, project_path, provider, model, step, status, files_generated, \
                       stages_succeeded, stages_run, total_tokens, started_at, completed_at, error";

/// SQLite run store
pub struct SqliteRunStore {
    pool: SqlitePool,
}

impl SqliteRunStore {
    /// Open (or create) the database at `db_path`
    pub async fn new(db_path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Self::with_pool(pool).await
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // Every connection would otherwise get its own empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;
        Self::with_pool(pool).await
    }

    /// Create store with default path
    pub async fn with_default_path() -> Result<Self> {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let db_dir = data_dir.join("testgen");
        std::fs::create_dir_all(&db_dir)
            .with_context(|| format!("Failed to create {}", db_dir.display()))?;

        Self::new(&db_dir.join("runs.db")).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                project_path TEXT NOT NULL,
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                step TEXT NOT NULL,
                status TEXT NOT NULL,
                files_generated INTEGER NOT NULL DEFAULT 0,
                stages_succeeded INTEGER NOT NULL DEFAULT 0,
                stages_run INTEGER NOT NULL DEFAULT 0,
                total_tokens INTEGER NOT NULL DEFAULT 0,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                error TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_project_path ON runs(project_path);
            CREATE INDEX IF NOT EXISTS idx_started_at ON runs(started_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to initialize database schema")?;

        Ok(())
    }

    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }

    fn from_row(row: &SqliteRow) -> Result<RunSummary> {
        Ok(RunSummary {
            run_id: Uuid::parse_str(&row.try_get::<String, _>("id")?)?,
            project_path: row.try_get("project_path")?,
            provider: row.try_get("provider")?,
            model: row.try_get("model")?,
            step: row
                .try_get::<String, _>("step")?
                .parse()
                .map_err(|e: String| anyhow!(e))?,
            status: row
                .try_get::<String, _>("status")?
                .parse()
                .map_err(|e: String| anyhow!(e))?,
            files_generated: row.try_get::<i64, _>("files_generated")? as usize,
            stages_succeeded: row.try_get::<i64, _>("stages_succeeded")? as usize,
            stages_run: row.try_get::<i64, _>("stages_run")? as usize,
            total_tokens: row.try_get::<i64, _>("total_tokens")? as u32,
            started_at: Self::from_naive(row.try_get("started_at")?),
            completed_at: row
                .try_get::<Option<NaiveDateTime>, _>("completed_at")?
                .map(Self::from_naive),
            error: row.try_get("error")?,
        })
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for SqliteRunStore {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        sqlx::query(&format!(
            "INSERT OR REPLACE INTO runs ({}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            COLUMNS
        ))
        .bind(run.run_id.to_string())
        .bind(&run.project_path)
        .bind(&run.provider)
        .bind(&run.model)
        .bind(run.step.to_string())
        .bind(run.status.to_string())
        .bind(run.files_generated as i64)
        .bind(run.stages_succeeded as i64)
        .bind(run.stages_run as i64)
        .bind(run.total_tokens as i64)
        .bind(run.started_at.naive_utc())
        .bind(run.completed_at.map(|dt| dt.naive_utc()))
        .bind(&run.error)
        .execute(&self.pool)
        .await
        .context("Failed to save run")?;

        Ok(())
    }

    async fn list_runs(&self, project: Option<&str>, limit: usize) -> Result<Vec<RunSummary>> {
        let rows = match project {
            Some(project) => {
                sqlx::query(&format!(
                    "SELECT {} FROM runs WHERE project_path = ?1 ORDER BY started_at DESC LIMIT ?2",
                    COLUMNS
                ))
                .bind(project)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM runs ORDER BY started_at DESC LIMIT ?1",
                    COLUMNS
                ))
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to list runs")?;

        rows.iter().map(Self::from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PipelineStep, RunStatus};
    use chrono::Duration;

    fn summary(project: &str, minutes_ago: i64) -> RunSummary {
        RunSummary {
            run_id: Uuid::new_v4(),
            project_path: project.to_string(),
            provider: "ollama".to_string(),
            model: "llama3.2:latest".to_string(),
            step: PipelineStep::Initial,
            status: RunStatus::Completed,
            files_generated: 2,
            stages_succeeded: 1,
            stages_run: 1,
            total_tokens: 420,
            started_at: Utc::now() - Duration::minutes(minutes_ago),
            completed_at: Some(Utc::now()),
            error: None,
        }
    }

    #[tokio::test]
    async fn test_sqlite_store_round_trip() {
        let store = SqliteRunStore::in_memory().await.unwrap();

        let mut run = summary("/src/orgChartApi", 5);
        run.status = RunStatus::Failed;
        run.step = PipelineStep::Full;
        run.error = Some("Failed to load build_fix instructions".to_string());
        store.save_run(&run).await.unwrap();

        let runs = store.list_runs(None, 10).await.unwrap();
        assert_eq!(runs.len(), 1);
        let loaded = &runs[0];
        assert_eq!(loaded.run_id, run.run_id);
        assert_eq!(loaded.project_path, run.project_path);
        assert_eq!(loaded.status, RunStatus::Failed);
        assert_eq!(loaded.step, PipelineStep::Full);
        assert_eq!(loaded.total_tokens, 420);
        assert_eq!(loaded.error, run.error);
    }

    #[tokio::test]
    async fn test_sqlite_list_runs_by_project() {
        let store = SqliteRunStore::in_memory().await.unwrap();
        let older = summary("/src/a", 60);
        let newer = summary("/src/a", 1);
        store.save_run(&older).await.unwrap();
        store.save_run(&newer).await.unwrap();
        store.save_run(&summary("/src/b", 5)).await.unwrap();

        let runs = store.list_runs(Some("/src/a"), 10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].run_id, newer.run_id);

        assert_eq!(store.list_runs(None, 1).await.unwrap().len(), 1);
        assert!(store.list_runs(Some("/src/c"), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_store_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.db");
        let run = summary("/src/a", 0);

        SqliteRunStore::new(&path).await.unwrap().save_run(&run).await.unwrap();

        let reopened = SqliteRunStore::new(&path).await.unwrap();
        let runs = reopened.list_runs(Some("/src/a"), 10).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_id, run.run_id);
    }
}
