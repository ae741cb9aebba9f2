//! Section: the unit of scheduling.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::subtask::Subtask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Create,
    Modify,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Active,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionFile {
    pub path: String,
    pub action: FileAction,
    #[serde(default = "default_file_status")]
    pub status: FileStatus,
}

fn default_file_status() -> FileStatus {
    FileStatus::Pending
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessCriterion {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub passed: bool,
}

/// Status of a [`Section`]. Transitions to `InProgress` only when every
/// declared dependency is `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Pending,
    InProgress,
    Verifying,
    Done,
    Failed,
    Retrying,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub name: String,
    pub description: String,
    pub files: Vec<SectionFile>,

    /// Section ids that must be `Done` before this one may run.
    pub dependencies: BTreeSet<String>,

    /// Inverse of `dependencies`; populated exclusively by
    /// [`crate::graph::DependencyGraph::build`]. Empty until the graph has
    /// been built at least once for the containing plan.
    #[serde(default)]
    pub dependents: BTreeSet<String>,

    pub success_criteria: Vec<SuccessCriterion>,
    pub status: SectionStatus,

    /// 0..=100.
    pub progress: u8,

    #[serde(default)]
    pub worker_id: Option<String>,
    #[serde(default)]
    pub worktree_path: Option<String>,

    #[serde(default)]
    pub retry_count: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub last_error: Option<String>,

    #[serde(default)]
    pub commits: Vec<String>,

    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub subtasks: Option<Vec<Subtask>>,
}

fn default_max_retries() -> u32 {
    2
}

impl Section {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            files: Vec::new(),
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            success_criteria: Vec::new(),
            status: SectionStatus::Pending,
            progress: 0,
            worker_id: None,
            worktree_path: None,
            retry_count: 0,
            max_retries: default_max_retries(),
            last_error: None,
            commits: Vec::new(),
            started_at: None,
            finished_at: None,
            subtasks: None,
        }
    }

    /// Invariant: `retry_count <= max_retries`.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// A `done` section's files are all `Done` and it has at least one
    /// commit iff any file was actually changed.
    pub fn satisfies_done_invariant(&self) -> bool {
        if self.status != SectionStatus::Done {
            return true;
        }
        let all_files_done = self.files.iter().all(|f| f.status == FileStatus::Done);
        let changed_any = !self.files.is_empty();
        all_files_done && (!changed_any || !self.commits.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_section_has_sane_defaults() {
        let s = Section::new("a", "A", "desc");
        assert_eq!(s.status, SectionStatus::Pending);
        assert_eq!(s.progress, 0);
        assert!(s.can_retry());
    }

    #[test]
    fn can_retry_respects_the_retry_count_ceiling() {
        let mut s = Section::new("a", "A", "desc");
        s.max_retries = 1;
        s.retry_count = 1;
        assert!(!s.can_retry());
    }

    #[test]
    fn done_invariant_requires_commit_when_files_changed() {
        let mut s = Section::new("a", "A", "desc");
        s.status = SectionStatus::Done;
        s.files.push(SectionFile {
            path: "x.rs".into(),
            action: FileAction::Modify,
            status: FileStatus::Done,
        });
        assert!(!s.satisfies_done_invariant());
        s.commits.push("abc123".into());
        assert!(s.satisfies_done_invariant());
    }

    #[test]
    fn done_invariant_holds_with_no_files_and_no_commits() {
        let mut s = Section::new("a", "A", "desc");
        s.status = SectionStatus::Done;
        assert!(s.satisfies_done_invariant());
    }
}
