//! Project: a named, persisted container for one plan, its sessions and runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a [`Project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    Ready,
    InProgress,
    Paused,
    Completed,
    Cancelled,
}

/// A project directory under `<bvs-root>/projects/<project-id>/`.
///
/// Counts are denormalized onto the project so listing projects does not
/// require loading each plan; the orchestrator keeps them in sync after
/// every observable section transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub total_sections: usize,
    #[serde(default)]
    pub completed_sections: usize,
    #[serde(default)]
    pub failed_sections: usize,
}

impl Project {
    pub fn new(id: impl Into<String>, slug: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            slug: slug.into(),
            name: name.into(),
            description: None,
            status: ProjectStatus::Planning,
            created_at: now,
            updated_at: now,
            total_sections: 0,
            completed_sections: 0,
            failed_sections: 0,
        }
    }

    /// Logical delete: mark cancelled rather than removing the directory.
    /// Physical deletion is a separate, explicit store operation.
    pub fn cancel(&mut self) {
        self.status = ProjectStatus::Cancelled;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_project_starts_in_planning() {
        let p = Project::new("p1", "my-project", "My Project");
        assert_eq!(p.status, ProjectStatus::Planning);
        assert_eq!(p.total_sections, 0);
    }

    #[test]
    fn cancel_sets_status_and_bumps_updated_at() {
        let mut p = Project::new("p1", "my-project", "My Project");
        let before = p.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        p.cancel();
        assert_eq!(p.status, ProjectStatus::Cancelled);
        assert!(p.updated_at >= before);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ProjectStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
