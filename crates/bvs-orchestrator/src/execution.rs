//! The per-section execution pipeline shared by the sequential and
//! parallel schedulers: worktree setup, complexity analysis, the worker
//! executor, the quality gate, a conditional fix loop, and the goal-review
//! gate. One call advances exactly one section to a terminal attempt.
//!
//! Operates on an owned [`Section`] rather than a borrow into the plan so
//! the parallel scheduler can run many of these concurrently without
//! aliasing a shared `&mut Plan` — callers write the returned section back
//! into the plan once each task completes.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use bvs_core::domain::{FileStatus, Section, SectionStatus};
use bvs_core::BvsConfig;
use bvs_verify::{
    run_fix_loop, run_quality_gate, review_section, FixLoopConfig, FixLoopOutcome, QualityGateResult, ReviewConfig,
    Verdict, VerificationGoal,
};
use bvs_worker::{execute_section_with_subtasks, ExecutorConfig};
use chrono::Utc;
use regex::Regex;

use crate::agents::AgentProvider;
use crate::error::OrchestratorResult;
use crate::events::{EventBody, EventSink};

pub struct SectionRunOutcome {
    pub section: Section,
    pub worker_id: String,
    pub branch: String,
    pub success: bool,
}

fn build_or_typecheck_marker() -> Regex {
    Regex::new(r"(?i)build|typescript|type error|TS\d+").unwrap()
}

fn is_build_or_typecheck_related(text: &str) -> bool {
    build_or_typecheck_marker().is_match(text)
}

fn failing_goal(gate: &QualityGateResult) -> Option<(VerificationGoal, String)> {
    gate.failures().first().map(|r| (r.goal, r.stderr.clone()))
}

fn command_for(goal: VerificationGoal, cfg: &BvsConfig) -> Vec<String> {
    let overrides = &cfg.commands;
    let configured = match goal {
        VerificationGoal::Typecheck => &overrides.typecheck,
        VerificationGoal::Lint => &overrides.lint,
        VerificationGoal::Tests => &overrides.tests,
        VerificationGoal::Build => &overrides.build,
        VerificationGoal::Custom => &None,
    };
    configured.clone().unwrap_or_else(|| match goal {
        VerificationGoal::Typecheck => vec!["cargo".into(), "check".into()],
        VerificationGoal::Lint => vec!["cargo".into(), "clippy".into()],
        VerificationGoal::Tests => vec!["cargo".into(), "test".into()],
        VerificationGoal::Build | VerificationGoal::Custom => vec!["cargo".into(), "build".into()],
    })
}

/// Inputs read from the plan/graph that `execute_one_section` needs but
/// must not hold a borrow into, since the parallel scheduler runs many of
/// these futures concurrently.
pub struct SectionContext {
    pub fan_out: u32,
    pub framework: Option<String>,
    pub completed_sections_summary: Vec<String>,
}

/// Run one section to completion (or failure) against `worker_id`'s
/// worktree, returning the updated section for the caller to write back.
pub async fn execute_one_section(
    cfg: &BvsConfig,
    agents: &dyn AgentProvider,
    events: &EventSink,
    mut section: Section,
    ctx: SectionContext,
    worker_id: String,
    repo_root: &Path,
    target_branch: &str,
    worktree_base: &Path,
) -> OrchestratorResult<SectionRunOutcome> {
    let section_id = section.id.clone();
    let branch = format!("bvs-worker-{worker_id}");
    let worktree_path: PathBuf = worktree_base.join(&worker_id);

    section.status = SectionStatus::InProgress;
    section.worker_id = Some(worker_id.to_string());
    section.worktree_path = Some(worktree_path.display().to_string());
    section.started_at = Some(Utc::now());

    events.emit(
        Utc::now(),
        EventBody::SectionUpdate {
            section_id: section_id.clone(),
            status: "in_progress".to_string(),
        },
    );
    events.emit(
        Utc::now(),
        EventBody::WorkerStarted {
            worker_id: worker_id.to_string(),
            section_id: section_id.clone(),
        },
    );

    bvs_worker::git::worktree_add(repo_root, &worktree_path, &branch, target_branch).await?;

    let report = bvs_core::complexity::analyze(&section, ctx.fan_out);
    events.emit(
        Utc::now(),
        EventBody::ComplexityAnalyzed {
            section_id: section_id.clone(),
            score: report.score,
            model: report.model.to_string(),
        },
    );

    let executor_cfg = ExecutorConfig {
        worker_id: worker_id.to_string(),
        worktree_path: worktree_path.clone(),
        complexity_score: report.score,
        framework: ctx.framework,
        completed_sections_summary: ctx.completed_sections_summary,
        typecheck_command: cfg
            .commands
            .typecheck
            .as_ref()
            .and_then(|argv| argv.split_first())
            .map(|(program, args)| (program.clone(), args.to_vec())),
    };

    let agent = agents.code_gen_agent(report.model);
    let worker_outcome = match execute_section_with_subtasks(&executor_cfg, &section, agent.as_ref()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            events.emit(
                Utc::now(),
                EventBody::WorkerFailed {
                    worker_id: worker_id.to_string(),
                    section_id: section_id.clone(),
                    error: e.to_string(),
                },
            );
            finalize(&mut section, false, Vec::new(), Some(e.to_string()));
            return Ok(SectionRunOutcome {
                section,
                worker_id: worker_id.to_string(),
                branch,
                success: false,
            });
        }
    };

    if worker_outcome.success {
        events.emit(
            Utc::now(),
            EventBody::WorkerCompleted {
                worker_id: worker_id.to_string(),
                section_id: section_id.clone(),
            },
        );
    } else {
        events.emit(
            Utc::now(),
            EventBody::WorkerFailed {
                worker_id: worker_id.to_string(),
                section_id: section_id.clone(),
                error: worker_outcome.errors.join("; "),
            },
        );
    }

    let mut gate = run_quality_gate(&worktree_path, &cfg.commands).await?;

    if !gate.passed() {
        if let Some((goal, stderr)) = failing_goal(&gate) {
            if is_build_or_typecheck_related(&stderr) {
                events.emit(Utc::now(), EventBody::FixLoopStarted { section_id: section_id.clone() });
                let fix_cfg = FixLoopConfig {
                    max_cycles: cfg.fix_loop_max_cycles,
                    same_failure_threshold: cfg.fix_loop_same_failure_threshold,
                    goal,
                    command: command_for(goal, cfg),
                    state_path: worktree_path.join("fix-loop-state.json"),
                };
                let outcome = run_fix_loop(
                    &fix_cfg,
                    &worktree_path,
                    agents.fix_agent().as_ref(),
                    Arc::new(AtomicBool::new(false)),
                )
                .await?;
                events.emit(
                    Utc::now(),
                    EventBody::FixLoopCompleted {
                        section_id: section_id.clone(),
                        outcome: format!("{outcome:?}"),
                    },
                );
                if matches!(outcome, FixLoopOutcome::GoalMet { .. }) {
                    gate = run_quality_gate(&worktree_path, &cfg.commands).await?;
                }
            }
        }
    }

    events.emit(Utc::now(), EventBody::GoalReviewStarted { section_id: section_id.clone() });
    let review_cfg = ReviewConfig {
        should_threshold: cfg.should_threshold,
        build_or_tests_failing: !gate.passed(),
    };
    let review = review_section(&section, &worktree_path, &worker_outcome.files_changed, &review_cfg);
    events.emit(
        Utc::now(),
        EventBody::GoalReviewResult {
            section_id: section_id.clone(),
            verdict: format!("{:?}", review.verdict),
        },
    );

    let success = worker_outcome.success && gate.passed() && review.verdict != Verdict::Rejected;
    let error = if success {
        None
    } else if !worker_outcome.errors.is_empty() {
        Some(worker_outcome.errors.join("; "))
    } else if !gate.passed() {
        Some("quality gate failed".to_string())
    } else {
        Some(format!("goal review rejected: {:?}", review.scope_delta.scope_reduction))
    };

    finalize(&mut section, success, worker_outcome.commits.clone(), error);

    Ok(SectionRunOutcome {
        section,
        worker_id: worker_id.to_string(),
        branch,
        success,
    })
}

fn finalize(section: &mut Section, success: bool, commits: Vec<String>, error: Option<String>) {
    if success {
        for file in &mut section.files {
            file.status = FileStatus::Done;
        }
        section.progress = 100;
    }
    section.commits.extend(commits);
    section.last_error = error;
    section.finished_at = Some(Utc::now());

    section.status = if success { SectionStatus::Done } else { SectionStatus::Failed };
    debug_assert!(
        !success || section.satisfies_done_invariant(),
        "section {} marked done without satisfying its done invariant",
        section.id
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_error_text_is_classified_as_build_related() {
        assert!(is_build_or_typecheck_related("error TS2322: type mismatch"));
        assert!(is_build_or_typecheck_related("cargo build failed"));
        assert!(!is_build_or_typecheck_related("assertion failed: left == right"));
    }
}
