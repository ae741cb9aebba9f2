//! State Store: traits plus a filesystem-backed implementation.

pub mod fs_store;
pub mod traits;

pub use fs_store::FsStore;
pub use traits::{LearningsLog, ProgressEntry, ProgressSnapshot, ProjectStore, RunLedger};
