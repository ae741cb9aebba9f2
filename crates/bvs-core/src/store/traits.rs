//! Storage trait definitions.
//!
//! Backend-agnostic and `async_trait`-based so the filesystem implementation
//! in [`super::fs_store`] is a pure addition, not the only possible shape.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ExecutionRun, Learning, Plan, Project};
use crate::error::StateResult;

/// One per-section row as persisted in `progress.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub id: String,
    pub name: String,
    pub status: crate::domain::SectionStatus,
    pub progress: u8,
    #[serde(default)]
    pub worker_id: Option<String>,
    #[serde(default)]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub worker_output: Vec<String>,
    #[serde(default)]
    pub metrics: Option<crate::domain::Metrics>,
}

/// The full `progress.json` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub session_id: String,
    pub status: crate::domain::SessionStatus,
    pub phase: crate::domain::SessionPhase,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub sections: Vec<ProgressEntry>,
}

/// Project and plan persistence, including the progress-merge read path.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn ensure_project_dir(&self, project_id: &str) -> StateResult<()>;

    async fn save_project(&self, project: &Project) -> StateResult<()>;
    async fn load_project(&self, project_id: &str) -> StateResult<Option<Project>>;
    async fn list_projects(&self) -> StateResult<Vec<Project>>;
    async fn delete_project(&self, project_id: &str, physical: bool) -> StateResult<()>;

    async fn save_plan(&self, project_id: &str, plan: &Plan) -> StateResult<()>;

    /// Load a project's plan. When `project_id` is `None`, scans projects,
    /// selecting the first with status in {ready, in_progress, paused},
    /// falling back to a single legacy `plan.json` at the store root.
    /// Always merges `progress.json` onto the loaded sections.
    async fn load_plan(&self, project_id: Option<&str>) -> StateResult<Option<Plan>>;

    async fn save_progress(&self, project_id: &str, snapshot: &ProgressSnapshot) -> StateResult<()>;
    async fn load_progress(&self, project_id: &str) -> StateResult<Option<ProgressSnapshot>>;
}

/// Execution-run persistence: one JSON document per run under `runs/`.
#[async_trait]
pub trait RunLedger: Send + Sync {
    async fn create_run(&self, project_id: &str, run: &ExecutionRun) -> StateResult<()>;
    async fn update_run(&self, project_id: &str, run: &ExecutionRun) -> StateResult<()>;
    async fn get_run(&self, project_id: &str, run_id: &str) -> StateResult<ExecutionRun>;
    async fn list_runs(&self, project_id: &str) -> StateResult<Vec<ExecutionRun>>;
    async fn delete_run(&self, project_id: &str, run_id: &str) -> StateResult<()>;
}

/// Append-only learnings log.
#[async_trait]
pub trait LearningsLog: Send + Sync {
    async fn capture_learning(&self, learning: &Learning) -> StateResult<()>;
    async fn load_learnings(&self) -> StateResult<Vec<Learning>>;
}
