//! Error taxonomy for command execution, the fix loop, and the goal reviewer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("command {program} timed out after {timeout_secs}s")]
    Timeout { program: String, timeout_secs: u64 },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command {program} has an empty argument vector")]
    EmptyCommand { program: String },
}

#[derive(Debug, Error)]
pub enum FixLoopError {
    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error("fix loop state io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fix loop state corrupted at {path}: {source}")]
    Corrupted {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("fix loop cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type VerifyResult<T> = std::result::Result<T, VerifyError>;
pub type FixLoopResult<T> = std::result::Result<T, FixLoopError>;
pub type ReviewResult<T> = std::result::Result<T, ReviewError>;
