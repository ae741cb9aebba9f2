//! Error taxonomy for `bvs-core`: the state store and dependency graph.

use thiserror::Error;

/// Errors raised by the persistent state store.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("project not found: {project_id}")]
    ProjectNotFound { project_id: String },

    #[error("no plan found for project {project_id}")]
    PlanNotFound { project_id: String },

    #[error("run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("corrupted json at {path}: {source}")]
    CorruptedJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised building or querying the dependency graph.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum GraphError {
    #[error("section {section} declares unknown dependency {dependency}")]
    UnknownDependency { section: String, dependency: String },

    #[error("circular dependency detected through section {section}")]
    CircularDependency { section: String },

    #[error("inconsistent graph: {detail}")]
    InconsistentGraph { detail: String },
}

pub type StateResult<T> = std::result::Result<T, StateError>;
pub type GraphResult<T> = std::result::Result<T, GraphError>;
