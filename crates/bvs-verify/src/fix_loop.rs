//! Fix Loop: bounded verification/diagnosis/fix cycles for build- and
//! typecheck-class failures. Grounded on this codebase's CI repair planner
//! (bounded-attempt policy, terminal outcomes), generalized from a
//! patch-planning decision into a full run/diagnose/fix cycle, with
//! error-signature-based same-failure detection in place of the donor's
//! placeholder repair plan.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{FixLoopError, FixLoopResult};
use crate::runner::{run_command, VerificationGoal};

#[derive(Debug, Clone)]
pub struct FixLoopConfig {
    pub max_cycles: u32,
    pub same_failure_threshold: u32,
    pub goal: VerificationGoal,
    pub command: Vec<String>,
    pub state_path: PathBuf,
}

impl FixLoopConfig {
    pub fn new(goal: VerificationGoal, command: Vec<String>, state_path: PathBuf) -> Self {
        Self {
            max_cycles: 3,
            same_failure_threshold: 2,
            goal,
            command,
            state_path,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct FixLoopState {
    signatures: Vec<String>,
    cycle: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixLoopOutcome {
    GoalMet { cycles: u32 },
    SameFailure { cycles: u32, signature: String },
    MaxCycles { cycles: u32 },
    Cancelled { cycles: u32 },
}

#[derive(Debug, Clone)]
pub struct Diagnosis {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub code: Option<String>,
    pub message: String,
}

/// The fix-applying half of the external agent contract used by the fix
/// loop: given a diagnosis, attempt a repair in `cwd`. Does not need to be
/// the same implementation as the worker executor's `CodeGenAgent` — the
/// fix loop issues one bounded diagnose/fix round per cycle, not a
/// multi-turn tool-calling session.
#[async_trait]
pub trait FixAgent: Send + Sync {
    async fn diagnose(&self, failure_output: &str) -> Diagnosis;
    async fn apply_fix(&self, diagnosis: &Diagnosis, cwd: &Path) -> FixLoopResult<()>;
}

/// Does nothing — useful for exercising `same_failure`/`max_cycles` paths
/// in tests where the underlying command is deterministic and unaffected by
/// any fix attempt.
pub struct NoopFixAgent;

#[async_trait]
impl FixAgent for NoopFixAgent {
    async fn diagnose(&self, failure_output: &str) -> Diagnosis {
        Diagnosis {
            file: None,
            line: None,
            code: None,
            message: failure_output.lines().next().unwrap_or_default().to_string(),
        }
    }

    async fn apply_fix(&self, _diagnosis: &Diagnosis, _cwd: &Path) -> FixLoopResult<()> {
        Ok(())
    }
}

fn marker_regex() -> Regex {
    Regex::new(r"(?i)error|TS\d+").unwrap()
}

fn path_regex() -> Regex {
    Regex::new(r"(?:[\w.\-]+/)+[\w.\-]+\.\w+").unwrap()
}

fn linecol_regex() -> Regex {
    Regex::new(r"\b\d+:\d+\b").unwrap()
}

fn normalize_line(line: &str, paths: &Regex, linecols: &Regex) -> String {
    let with_paths_normalized = paths.replace_all(line, |caps: &regex::Captures| {
        let path = &caps[0];
        let mut parts: Vec<&str> = path.split('/').collect();
        let file = parts.pop().unwrap_or("");
        let dirs: Vec<&str> = parts.iter().map(|_| "X").collect();
        if dirs.is_empty() {
            file.to_string()
        } else {
            format!("{}/{}", dirs.join("/"), file)
        }
    });
    linecols.replace_all(&with_paths_normalized, "X:X").into_owned()
}

/// Select error-marker lines, normalize paths and line:col tuples away so
/// transient details don't defeat repeat-failure detection, keep the first
/// five, join with `|`.
pub fn error_signature(output: &str) -> String {
    let markers = marker_regex();
    let paths = path_regex();
    let linecols = linecol_regex();

    output
        .lines()
        .filter(|line| markers.is_match(line))
        .map(|line| normalize_line(line, &paths, &linecols))
        .take(5)
        .collect::<Vec<_>>()
        .join("|")
}

async fn load_state(path: &Path) -> FixLoopResult<FixLoopState> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| FixLoopError::Corrupted {
            path: path.display().to_string(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FixLoopState::default()),
        Err(source) => Err(FixLoopError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

fn save_state_sync(path: &Path, state: &FixLoopState) -> FixLoopResult<()> {
    let parent = path.parent().expect("state path has a parent");
    std::fs::create_dir_all(parent).map_err(|source| FixLoopError::Io {
        path: parent.display().to_string(),
        source,
    })?;
    let bytes = serde_json::to_vec_pretty(state).expect("fix loop state always serializes");
    let mut tmp = NamedTempFile::new_in(parent).map_err(|source| FixLoopError::Io {
        path: parent.display().to_string(),
        source,
    })?;
    tmp.write_all(&bytes).map_err(|source| FixLoopError::Io {
        path: path.display().to_string(),
        source,
    })?;
    tmp.persist(path).map_err(|e| FixLoopError::Io {
        path: path.display().to_string(),
        source: e.error,
    })?;
    Ok(())
}

async fn clear_state(path: &Path) {
    let _ = tokio::fs::remove_file(path).await;
}

/// Run the bounded fix loop against `cwd`, persisting cycle state to
/// `cfg.state_path` and clearing it on any terminal outcome.
pub async fn run_fix_loop(
    cfg: &FixLoopConfig,
    cwd: &Path,
    agent: &dyn FixAgent,
    cancel: Arc<AtomicBool>,
) -> FixLoopResult<FixLoopOutcome> {
    let mut state = load_state(&cfg.state_path).await?;

    let outcome = loop {
        if cancel.load(Ordering::Relaxed) {
            break FixLoopOutcome::Cancelled { cycles: state.cycle };
        }
        if state.cycle >= cfg.max_cycles {
            break FixLoopOutcome::MaxCycles { cycles: state.cycle };
        }

        let result = run_command(cfg.goal, &cfg.command, cwd, None).await?;
        if result.passed() {
            break FixLoopOutcome::GoalMet { cycles: state.cycle };
        }

        let signature = error_signature(&result.stderr);
        let occurrences = state.signatures.iter().filter(|s| **s == signature).count() as u32 + 1;
        if occurrences >= cfg.same_failure_threshold {
            break FixLoopOutcome::SameFailure {
                cycles: state.cycle,
                signature,
            };
        }

        state.signatures.push(signature.clone());
        state.cycle += 1;
        save_state_sync(&cfg.state_path, &state)?;

        let diagnosis = agent.diagnose(&result.stderr).await;
        agent.apply_fix(&diagnosis, cwd).await?;
    };

    clear_state(&cfg.state_path).await;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_signature_normalizes_paths_and_linecol() {
        let output = "src/foo/bar.rs:10:5: error: mismatched types\nsrc/foo/bar.rs:11:2: error TS2322: type mismatch";
        let sig = error_signature(output);
        assert!(sig.contains("X/X/bar.rs:X:X"));
        assert!(!sig.contains("10:5"));
    }

    #[test]
    fn error_signature_ignores_non_error_lines() {
        let output = "compiling...\nfinished in 2s";
        assert_eq!(error_signature(output), "");
    }

    #[test]
    fn error_signature_caps_at_five_lines() {
        let output = (0..10)
            .map(|i| format!("error: failure {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let sig = error_signature(&output);
        assert_eq!(sig.split('|').count(), 5);
    }

    #[tokio::test]
    async fn goal_met_on_first_passing_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = FixLoopConfig::new(
            VerificationGoal::Custom,
            vec!["true".to_string()],
            dir.path().join("fix-loop-state.json"),
        );
        let outcome = run_fix_loop(&cfg, dir.path(), &NoopFixAgent, Arc::new(AtomicBool::new(false)))
            .await
            .unwrap();
        assert_eq!(outcome, FixLoopOutcome::GoalMet { cycles: 0 });
        assert!(!cfg.state_path.exists());
    }

    #[tokio::test]
    async fn same_failure_detected_after_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("always_fail.sh");
        std::fs::write(&script, "#!/bin/sh\necho 'error: same failure every time' 1>&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&script, std::os::unix::fs::PermissionsExt::from_mode(0o755)).unwrap();

        let mut cfg = FixLoopConfig::new(
            VerificationGoal::Build,
            vec![script.display().to_string()],
            dir.path().join("fix-loop-state.json"),
        );
        cfg.same_failure_threshold = 2;
        cfg.max_cycles = 5;

        let outcome = run_fix_loop(&cfg, dir.path(), &NoopFixAgent, Arc::new(AtomicBool::new(false)))
            .await
            .unwrap();
        match outcome {
            FixLoopOutcome::SameFailure { cycles, .. } => assert!(cycles <= 2),
            other => panic!("expected SameFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_is_observed_between_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = FixLoopConfig::new(
            VerificationGoal::Build,
            vec!["false".to_string()],
            dir.path().join("fix-loop-state.json"),
        );
        let outcome = run_fix_loop(&cfg, dir.path(), &NoopFixAgent, Arc::new(AtomicBool::new(true)))
            .await
            .unwrap();
        assert_eq!(outcome, FixLoopOutcome::Cancelled { cycles: 0 });
    }
}
