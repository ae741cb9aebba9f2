//! Command runner: executable+argument-vector invocation, no shell
//! interpretation, per-command-type timeouts, bounded output capture.
//!
//! Grounded on this codebase's CI stage runner, generalized from a fixed
//! pipeline of named stages to four verification goals (typecheck, lint,
//! tests, build) plus arbitrary custom commands.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{VerifyError, VerifyResult};

const OUTPUT_CAP_BYTES: usize = 10 * 1024 * 1024;
const TRUNCATION_MARKER: &str = "\n...[output truncated]...\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationGoal {
    Typecheck,
    Lint,
    Tests,
    Build,
    Custom,
}

impl VerificationGoal {
    /// Command-specific default timeout.
    pub fn default_timeout(self) -> Duration {
        match self {
            VerificationGoal::Typecheck => Duration::from_secs(120),
            VerificationGoal::Tests => Duration::from_secs(300),
            VerificationGoal::Lint | VerificationGoal::Build => Duration::from_secs(180),
            VerificationGoal::Custom => Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub goal: VerificationGoal,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandResult {
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

fn cap(output: String) -> String {
    if output.len() > OUTPUT_CAP_BYTES {
        let mut truncated = output;
        truncated.truncate(OUTPUT_CAP_BYTES);
        truncated.push_str(TRUNCATION_MARKER);
        truncated
    } else {
        output
    }
}

/// Run `argv` as `argv[0] argv[1..]` in `cwd`, no shell interpretation,
/// bounded by `goal`'s default timeout (or `timeout_override` if set).
pub async fn run_command(
    goal: VerificationGoal,
    argv: &[String],
    cwd: &Path,
    timeout_override: Option<Duration>,
) -> VerifyResult<CommandResult> {
    let Some((program, args)) = argv.split_first() else {
        return Err(VerifyError::EmptyCommand {
            program: String::new(),
        });
    };

    let timeout = timeout_override.unwrap_or_else(|| goal.default_timeout());
    let start = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(cwd);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| VerifyError::Timeout {
            program: program.clone(),
            timeout_secs: timeout.as_secs(),
        })?
        .map_err(|source| VerifyError::Spawn {
            program: program.clone(),
            source,
        })?;

    Ok(CommandResult {
        goal,
        exit_code: output.status.code().unwrap_or(-1),
        stdout: cap(String::from_utf8_lossy(&output.stdout).into_owned()),
        stderr: cap(String::from_utf8_lossy(&output.stderr).into_owned()),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_reports_passed() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_command(
            VerificationGoal::Custom,
            &["echo".to_string(), "ok".to_string()],
            dir.path(),
            None,
        )
        .await
        .unwrap();
        assert!(result.passed());
        assert!(result.stdout.contains("ok"));
    }

    #[tokio::test]
    async fn failing_command_reports_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_command(VerificationGoal::Tests, &["false".to_string()], dir.path(), None)
            .await
            .unwrap();
        assert!(!result.passed());
        assert_ne!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn command_respects_timeout_override() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_command(
            VerificationGoal::Custom,
            &["sleep".to_string(), "5".to_string()],
            dir.path(),
            Some(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, VerifyError::Timeout { .. }));
    }

    #[tokio::test]
    async fn empty_argv_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_command(VerificationGoal::Custom, &[], dir.path(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::EmptyCommand { .. }));
    }

    #[test]
    fn default_timeouts_match_command_type() {
        assert_eq!(VerificationGoal::Typecheck.default_timeout().as_secs(), 120);
        assert_eq!(VerificationGoal::Tests.default_timeout().as_secs(), 300);
    }
}
