//! Quality Gate: aggregates typecheck/lint/tests/build into one verdict,
//! consumed by the merge-point coordinator's integration verification step
//! and by the fix loop's per-cycle check.

use std::path::Path;

use bvs_core::CommandOverrides;

use crate::error::VerifyResult;
use crate::runner::{run_command, CommandResult, VerificationGoal};

#[derive(Debug, Clone)]
pub struct QualityGateResult {
    pub typecheck: Option<CommandResult>,
    pub lint: Option<CommandResult>,
    pub tests: Option<CommandResult>,
    pub build: Option<CommandResult>,
}

impl QualityGateResult {
    pub fn passed(&self) -> bool {
        [&self.typecheck, &self.lint, &self.tests, &self.build]
            .into_iter()
            .flatten()
            .all(|r| r.passed())
    }

    pub fn failures(&self) -> Vec<&CommandResult> {
        [&self.typecheck, &self.lint, &self.tests, &self.build]
            .into_iter()
            .flatten()
            .filter(|r| !r.passed())
            .collect()
    }
}

fn default_command(goal: VerificationGoal) -> Vec<String> {
    match goal {
        VerificationGoal::Typecheck => vec!["cargo".into(), "check".into()],
        VerificationGoal::Lint => vec!["cargo".into(), "clippy".into()],
        VerificationGoal::Tests => vec!["cargo".into(), "test".into()],
        VerificationGoal::Build => vec!["cargo".into(), "build".into()],
        VerificationGoal::Custom => vec![],
    }
}

fn resolve(overrides: &Option<Vec<String>>, goal: VerificationGoal) -> Vec<String> {
    overrides.clone().unwrap_or_else(|| default_command(goal))
}

/// Run every configured command against `cwd` and aggregate the outcome.
pub async fn run_quality_gate(cwd: &Path, overrides: &CommandOverrides) -> VerifyResult<QualityGateResult> {
    let typecheck = run_command(
        VerificationGoal::Typecheck,
        &resolve(&overrides.typecheck, VerificationGoal::Typecheck),
        cwd,
        None,
    )
    .await?;
    let lint = run_command(
        VerificationGoal::Lint,
        &resolve(&overrides.lint, VerificationGoal::Lint),
        cwd,
        None,
    )
    .await?;
    let tests = run_command(
        VerificationGoal::Tests,
        &resolve(&overrides.tests, VerificationGoal::Tests),
        cwd,
        None,
    )
    .await?;
    let build = run_command(
        VerificationGoal::Build,
        &resolve(&overrides.build, VerificationGoal::Build),
        cwd,
        None,
    )
    .await?;

    Ok(QualityGateResult {
        typecheck: Some(typecheck),
        lint: Some(lint),
        tests: Some(tests),
        build: Some(build),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(goal: VerificationGoal) -> CommandResult {
        CommandResult {
            goal,
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 1,
        }
    }

    fn failing(goal: VerificationGoal) -> CommandResult {
        CommandResult {
            goal,
            exit_code: 1,
            stdout: String::new(),
            stderr: "boom".into(),
            duration_ms: 1,
        }
    }

    #[test]
    fn passes_when_every_configured_check_passes() {
        let result = QualityGateResult {
            typecheck: Some(ok(VerificationGoal::Typecheck)),
            lint: Some(ok(VerificationGoal::Lint)),
            tests: None,
            build: None,
        };
        assert!(result.passed());
    }

    #[test]
    fn fails_when_any_configured_check_fails() {
        let result = QualityGateResult {
            typecheck: Some(ok(VerificationGoal::Typecheck)),
            lint: Some(failing(VerificationGoal::Lint)),
            tests: None,
            build: None,
        };
        assert!(!result.passed());
        assert_eq!(result.failures().len(), 1);
    }

    #[tokio::test]
    async fn run_quality_gate_uses_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = CommandOverrides {
            typecheck: Some(vec!["true".into()]),
            lint: Some(vec!["true".into()]),
            tests: Some(vec!["true".into()]),
            build: Some(vec!["true".into()]),
        };
        let result = run_quality_gate(dir.path(), &overrides).await.unwrap();
        assert!(result.passed());
    }
}
