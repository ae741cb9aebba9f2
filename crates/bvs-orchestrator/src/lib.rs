//! Session lifecycle, scheduling, limits, approval modes and event fan-out
//! — the crate that binds `bvs-worker`, `bvs-merge`, and `bvs-verify`
//! into one driver over a project's dependency graph.

pub mod agents;
pub mod error;
pub mod events;
pub mod execution;
pub mod limits;
pub mod orchestrator;
pub mod parallel;
pub mod scheduler;
pub mod session;

pub use agents::{AgentProvider, ScriptedAgentProvider};
pub use error::{OrchestratorError, OrchestratorResult};
pub use events::{Event, EventBody, EventSink};
pub use execution::{execute_one_section, SectionContext, SectionRunOutcome};
pub use limits::{check_limits, UsageCounters};
pub use orchestrator::Orchestrator;
pub use parallel::execute_with_merge_points;
pub use scheduler::{
    all_selected_sections_done, execute_next_sections, has_unselected_pending_work, retry_section,
    runnable_sections, select_sections, skip_section,
};
pub use session::{SessionEntry, SessionGuard, SessionRegistry};
