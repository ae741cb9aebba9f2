//! Domain model for BVS: the entities described in the data model —
//! projects, plans, sections, subtasks, sessions, execution runs and
//! learnings — plus the shared model-tier enum used by the complexity
//! analyzer and the worker executor.

pub mod learning;
pub mod plan;
pub mod project;
pub mod run;
pub mod section;
pub mod session;
pub mod subtask;

pub use learning::Learning;
pub use plan::{CodebaseContext, ParallelConfig, Plan};
pub use project::{Project, ProjectStatus};
pub use run::{ExecutionRun, RunStatus};
pub use section::{FileAction, FileStatus, Section, SectionFile, SectionStatus, SuccessCriterion};
pub use session::{ApprovalMode, Session, SessionPhase, SessionStatus};
pub use subtask::{Metrics, Subtask, SubtaskKind, SubtaskStatus};

use serde::{Deserialize, Serialize};

/// Model tier chosen by the complexity analyzer and consumed by the
/// worker executor when invoking the external code-generation agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModelTier {
    Fast,
    Slow,
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelTier::Fast => write!(f, "FAST"),
            ModelTier::Slow => write!(f, "SLOW"),
        }
    }
}
