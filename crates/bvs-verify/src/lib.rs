//! Command runner, fix loop, and goal reviewer for BVS, plus the quality
//! gate the orchestrator and merge-point coordinator both depend on.

pub mod error;
pub mod fix_loop;
pub mod goal_reviewer;
pub mod quality_gate;
pub mod runner;

pub use error::{FixLoopError, FixLoopResult, ReviewError, ReviewResult as ReviewOpResult, VerifyError, VerifyResult};
pub use fix_loop::{error_signature, run_fix_loop, Diagnosis, FixAgent, FixLoopConfig, FixLoopOutcome, NoopFixAgent};
pub use goal_reviewer::{render_report, review_section, Priority, Requirement, ReviewConfig, ReviewResult, Verdict};
pub use quality_gate::{run_quality_gate, QualityGateResult};
pub use runner::{run_command, CommandResult, VerificationGoal};
