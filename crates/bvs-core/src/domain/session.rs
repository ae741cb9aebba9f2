//! Session: ephemeral in-memory orchestration state over one project/plan.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Which synchronization phase the session's scheduler is currently in.
/// Gives `Session::phase` a closed, serializable shape (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Scheduling,
    Executing,
    Merging,
    GoalReview,
    FixLoop,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
    Completed,
    Failed,
    AwaitingApproval,
}

/// Pause cadence consulted after each atomic boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalMode {
    AttendedSingle,
    AttendedLevel,
    SemiAttended,
    Unattended,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressAggregate {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

impl ProgressAggregate {
    pub fn overall_progress(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub project_id: String,
    pub project_path: String,
    pub phase: SessionPhase,
    pub status: SessionStatus,
    pub approval_mode: ApprovalMode,

    /// Worker id -> section id it is currently executing.
    #[serde(default)]
    pub workers: BTreeMap<String, String>,

    #[serde(default)]
    pub current_sections: BTreeSet<String>,

    #[serde(default)]
    pub selected_section_ids: Option<BTreeSet<String>>,

    #[serde(default)]
    pub progress: ProgressAggregate,

    #[serde(default)]
    pub total_elapsed_secs: u64,

    #[serde(default)]
    pub consecutive_failures: u32,
}

impl Session {
    pub fn new(id: impl Into<String>, project_id: impl Into<String>, project_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            project_path: project_path.into(),
            phase: SessionPhase::Idle,
            status: SessionStatus::Idle,
            approval_mode: ApprovalMode::Unattended,
            workers: BTreeMap::new(),
            current_sections: BTreeSet::new(),
            selected_section_ids: None,
            progress: ProgressAggregate::default(),
            total_elapsed_secs: 0,
            consecutive_failures: 0,
        }
    }

    /// Whether `section_id` is eligible under the current selection, if any.
    pub fn is_selected(&self, section_id: &str) -> bool {
        match &self.selected_section_ids {
            None => true,
            Some(set) => set.contains(section_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_progress_is_percentage_of_completed() {
        let agg = ProgressAggregate {
            total: 4,
            completed: 1,
            failed: 0,
        };
        assert_eq!(agg.overall_progress(), 25);
    }

    #[test]
    fn is_selected_defaults_to_true_without_selection() {
        let s = Session::new("s1", "p1", "/repo");
        assert!(s.is_selected("anything"));
    }

    #[test]
    fn is_selected_respects_restriction() {
        let mut s = Session::new("s1", "p1", "/repo");
        s.selected_section_ids = Some(BTreeSet::from(["a".to_string()]));
        assert!(s.is_selected("a"));
        assert!(!s.is_selected("b"));
    }
}
