//! The orchestrator's unifying error type: each crate below it in the
//! dependency graph keeps its own scoped error enum; this is the one place
//! they're folded together with `#[from]` so call sites can propagate with
//! `?` across crate boundaries. Named `OrchestratorError` rather than
//! `BvsError` in `bvs-core` because `bvs-core` has no dependency on
//! `bvs-worker`/`bvs-merge`/`bvs-verify` to wrap in the first place — see
//! DESIGN.md.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    State(#[from] bvs_core::StateError),

    #[error(transparent)]
    Graph(#[from] bvs_core::GraphError),

    #[error(transparent)]
    Worker(#[from] bvs_worker::WorkerError),

    #[error(transparent)]
    Merge(#[from] bvs_merge::MergeError),

    #[error(transparent)]
    Verify(#[from] bvs_verify::VerifyError),

    #[error(transparent)]
    FixLoop(#[from] bvs_verify::FixLoopError),

    #[error("session {id} not found")]
    SessionNotFound { id: String },

    #[error("project {id} not found")]
    ProjectNotFound { id: String },

    #[error("plan not approved for project {project_id}")]
    PlanNotApproved { project_id: String },

    #[error("section {id} not found")]
    SectionNotFound { id: String },

    #[error("run {id} not found")]
    RunNotFound { id: String },

    #[error("operation forbidden: session {id} has status {status:?}")]
    InvalidState {
        id: String,
        status: bvs_core::domain::SessionStatus,
    },

    #[error("section {id} cannot be retried: {reason}")]
    RetryNotAllowed { id: String, reason: String },

    #[error("session limit exceeded: {limit_kind} limit {limit} exceeded by actual {actual}")]
    SessionLimitExceeded {
        limit_kind: String,
        limit: f64,
        actual: f64,
    },

    #[error("execution cancelled")]
    Cancelled,
}

pub type OrchestratorResult<T> = std::result::Result<T, OrchestratorError>;
