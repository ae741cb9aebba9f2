//! Subtask: the atomic unit inside a section.

use serde::{Deserialize, Serialize};

use super::ModelTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskKind {
    Schema,
    Types,
    Implementation,
    Tests,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    Pending,
    InProgress,
    Done,
    Failed,
}

/// Token/cost/diff metrics for one subtask run, model-tagged so the
/// orchestrator's session-limit gate can price cumulative cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub model: ModelTier,
    pub files_changed: u32,
    pub lines_added: u32,
    pub lines_removed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub section_id: String,
    pub kind: SubtaskKind,
    pub name: String,
    pub description: String,
    /// Typically <=5 paths.
    pub files: Vec<String>,
    pub status: SubtaskStatus,
    #[serde(default)]
    pub turns_used: u32,
    pub max_turns: u32,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub metrics: Option<Metrics>,
}

impl Subtask {
    pub fn new(
        id: impl Into<String>,
        section_id: impl Into<String>,
        kind: SubtaskKind,
        name: impl Into<String>,
        files: Vec<String>,
        max_turns: u32,
    ) -> Self {
        Self {
            id: id.into(),
            section_id: section_id.into(),
            kind,
            name: name.into(),
            description: String::new(),
            files,
            status: SubtaskStatus::Pending,
            turns_used: 0,
            max_turns,
            commit: None,
            metrics: None,
        }
    }
}
