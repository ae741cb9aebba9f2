//! Worker Executor: subtask identification, a sandboxed tool surface
//! confined to one worker's git worktree, and the external code-generation
//! agent contract it drives.

pub mod agent;
pub mod error;
pub mod executor;
pub mod git;
pub mod subtasks;
pub mod tools;

pub use agent::{AgentQuery, AgentStep, CodeGenAgent, ScriptedAgent};
pub use error::{WorkerError, WorkerResult};
pub use executor::{execute_section_legacy, execute_section_with_subtasks, ExecutorConfig, SectionOutcome, SubtaskOutcome};
pub use subtasks::{identify_subtasks, SubtaskSpec};
