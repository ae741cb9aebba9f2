//! Execution Run: a persisted record of one `start_execution` invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRun {
    pub id: String,
    pub project_id: String,
    pub session_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub selected_sections: Vec<String>,
    #[serde(default)]
    pub in_progress_ids: Vec<String>,
    #[serde(default)]
    pub completed_ids: Vec<String>,
    #[serde(default)]
    pub failed_ids: Vec<String>,

    #[serde(default)]
    pub current_level: Option<usize>,
    #[serde(default)]
    pub cost_aggregate: Option<f64>,
}

impl ExecutionRun {
    pub fn new(id: impl Into<String>, project_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            session_id: session_id.into(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            paused_at: None,
            completed_at: None,
            selected_sections: Vec::new(),
            in_progress_ids: Vec::new(),
            completed_ids: Vec::new(),
            failed_ids: Vec::new(),
            current_level: None,
            cost_aggregate: None,
        }
    }
}
