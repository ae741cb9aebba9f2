//! Error taxonomy for the worker executor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("path {path} escapes worktree root {root}")]
    PathEscaped { path: String, root: String },

    #[error("edit target not found or not unique in {path}: occurrences={occurrences}")]
    NonUniqueEdit { path: String, occurrences: usize },

    #[error("command {program} is denylisted")]
    DangerousCommand { program: String },

    #[error("command {program} timed out after {timeout_secs}s")]
    CommandTimeout { program: String, timeout_secs: u64 },

    #[error("agent failure: {0}")]
    AgentFailure(String),

    #[error("git command failed: {0}")]
    Git(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type WorkerResult<T> = std::result::Result<T, WorkerError>;
