//! Sandboxed tool surface exposed to the external agent during a subtask:
//! `read_file`, `write_file`, `edit_file`, `list_files`, `run_command`,
//! `mark_complete`. Grounded on this codebase's sandbox policy/execution
//! split, generalized from generic tool-capability checks to concrete
//! path-confinement and command-denylist rules.

mod path;
mod surface;

pub use path::normalize_in_root;
pub use surface::{RunCommandOutcome, ToolCall, ToolOutcome, WorktreeToolSurface};
