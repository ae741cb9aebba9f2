//! Error taxonomy for the merge-point coordinator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to check out {branch}: {detail}")]
    CheckoutFailed { branch: String, detail: String },

    #[error("git {args} failed: {detail}")]
    Git { args: String, detail: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Verify(#[from] bvs_verify::VerifyError),
}

pub type MergeResult<T> = std::result::Result<T, MergeError>;
