//! Worker Executor: the subtask-driven execution path and the legacy
//! single-session fallback.

use std::path::PathBuf;

use bvs_core::domain::{ModelTier, Section, Subtask, SubtaskKind, SubtaskStatus};

use crate::agent::{AgentQuery, AgentStep, CodeGenAgent, TranscriptEntry};
use crate::error::WorkerResult;
use crate::git;
use crate::subtasks::{identify_subtasks, SubtaskSpec};
use crate::tools::{ToolCall, ToolOutcome, WorktreeToolSurface};

const EDITS_PER_TYPECHECK: u32 = 3;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub worker_id: String,
    pub worktree_path: PathBuf,
    /// Section-level complexity score (bvs_core::complexity::analyze).
    pub complexity_score: u32,
    pub framework: Option<String>,
    pub completed_sections_summary: Vec<String>,
    /// (program, args) run every `EDITS_PER_TYPECHECK` edits; `None` skips
    /// the incremental typecheck hook entirely.
    pub typecheck_command: Option<(String, Vec<String>)>,
}

#[derive(Debug, Clone)]
pub struct SubtaskOutcome {
    pub subtask: Subtask,
    pub commit: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SectionOutcome {
    pub section_id: String,
    pub worker_id: String,
    pub subtasks: Vec<SubtaskOutcome>,
    pub commits: Vec<String>,
    pub files_changed: Vec<String>,
    pub success: bool,
    pub errors: Vec<String>,
}

fn summarize_outcome(outcome: &ToolOutcome) -> String {
    match outcome {
        ToolOutcome::FileContents { content } => format!("read {} bytes", content.len()),
        ToolOutcome::Written { path } => format!("wrote {path}"),
        ToolOutcome::Edited { path } => format!("edited {path}"),
        ToolOutcome::Listed { entries } => format!("{} entries", entries.len()),
        ToolOutcome::Command(c) => format!("exit {}", c.status),
        ToolOutcome::Completed => "marked complete".to_string(),
    }
}

fn build_prompt(spec: &SubtaskSpec, section: &Section, cfg: &ExecutorConfig) -> String {
    format!(
        "Subtask `{}` ({:?}) for section `{}`.\nFiles: {}\nFramework: {}\nCompleted sections: {}\nCall mark_complete when done.",
        spec.name,
        spec.kind,
        section.id,
        spec.files.join(", "),
        cfg.framework.as_deref().unwrap_or("unspecified"),
        cfg.completed_sections_summary.join(", "),
    )
}

async fn run_incremental_typecheck(cfg: &ExecutorConfig) -> WorkerResult<()> {
    let Some((program, args)) = &cfg.typecheck_command else {
        return Ok(());
    };
    let mut surface = WorktreeToolSurface::new(cfg.worktree_path.clone());
    match surface
        .apply(ToolCall::RunCommand {
            program: program.clone(),
            args: args.clone(),
        })
        .await?
    {
        ToolOutcome::Command(c) if c.status != 0 => Err(crate::error::WorkerError::AgentFailure(
            format!("incremental typecheck failed: {}", c.stderr),
        )),
        _ => Ok(()),
    }
}

async fn run_subtask(
    section: &Section,
    spec: &SubtaskSpec,
    max_turns: u32,
    model: ModelTier,
    cfg: &ExecutorConfig,
    agent: &dyn CodeGenAgent,
) -> SubtaskOutcome {
    let subtask_id = format!("{}-{}", section.id, spec.name);
    let mut subtask = Subtask::new(
        subtask_id,
        section.id.clone(),
        spec.kind,
        spec.name.clone(),
        spec.files.clone(),
        max_turns,
    );

    let query = AgentQuery {
        prompt: build_prompt(spec, section, cfg),
        max_turns,
        model,
    };

    let mut surface = WorktreeToolSurface::new(cfg.worktree_path.clone());
    let mut transcript: Vec<TranscriptEntry> = Vec::new();
    let mut edits_since_typecheck = 0u32;
    let mut completed = false;
    let mut error: Option<String> = None;

    while subtask.turns_used < max_turns {
        let step = match agent.next_step(&query, &transcript).await {
            Ok(step) => step,
            Err(e) => {
                error = Some(format!("agent failure: {e}"));
                break;
            }
        };

        match step {
            AgentStep::Done => break,
            AgentStep::ToolUse(ToolCall::MarkComplete) => {
                completed = true;
                break;
            }
            AgentStep::ToolUse(call) => {
                let is_edit = matches!(call, ToolCall::WriteFile { .. } | ToolCall::EditFile { .. });
                subtask.turns_used += 1;
                match surface.apply(call.clone()).await {
                    Ok(outcome) => {
                        transcript.push((call, Ok(summarize_outcome(&outcome))));
                        if is_edit {
                            edits_since_typecheck += 1;
                            if edits_since_typecheck >= EDITS_PER_TYPECHECK {
                                edits_since_typecheck = 0;
                                if let Err(e) = run_incremental_typecheck(cfg).await {
                                    // Does not abort the subtask; folded into the
                                    // error surfaced if still failing at completion.
                                    error = Some(e.to_string());
                                }
                            }
                        }
                    }
                    Err(e) => {
                        transcript.push((call, Err(e.to_string())));
                    }
                }
            }
        }
    }

    if !completed && error.is_none() {
        error = Some(format!(
            "subtask `{}` exhausted {} turns without mark_complete",
            spec.name, max_turns
        ));
    }

    let commit = if !surface.files_touched.is_empty() {
        match git::commit_all(
            &cfg.worktree_path,
            &format!("[BVS:{}] {}", cfg.worker_id, spec.name),
        )
        .await
        {
            Ok(sha) => sha,
            Err(e) => {
                error.get_or_insert(e.to_string());
                None
            }
        }
    } else {
        None
    };

    subtask.commit = commit.clone();
    subtask.status = if error.is_none() {
        SubtaskStatus::Done
    } else {
        SubtaskStatus::Failed
    };

    SubtaskOutcome {
        subtask,
        commit,
        error,
    }
}

/// Identify subtasks, run each with a fresh agent context, aggregate.
pub async fn execute_section_with_subtasks(
    cfg: &ExecutorConfig,
    section: &Section,
    agent: &dyn CodeGenAgent,
) -> WorkerResult<SectionOutcome> {
    let specs = identify_subtasks(section);
    if specs.is_empty() {
        return execute_section_legacy(cfg, section, agent).await;
    }

    let mut subtasks = Vec::new();
    let mut commits = Vec::new();
    let mut files_changed = Vec::new();
    let mut errors = Vec::new();

    for spec in &specs {
        let model = bvs_core::complexity::subtask_model(cfg.complexity_score, spec.files.len());
        let max_turns = bvs_core::complexity::default_subtask_max_turns();
        let outcome = run_subtask(section, spec, max_turns, model, cfg, agent).await;

        if let Some(commit) = &outcome.commit {
            commits.push(commit.clone());
        }
        files_changed.extend(outcome.subtask.files.clone());
        if let Some(err) = &outcome.error {
            errors.push(err.clone());
        }
        subtasks.push(outcome);
    }

    let success = subtasks.iter().all(|s| s.subtask.status == SubtaskStatus::Done);

    Ok(SectionOutcome {
        section_id: section.id.clone(),
        worker_id: cfg.worker_id.clone(),
        subtasks,
        commits,
        files_changed,
        success,
        errors,
    })
}

/// The legacy no-subtask path: one bounded turn budget, identical commit
/// and staging semantics as the subtask path.
pub async fn execute_section_legacy(
    cfg: &ExecutorConfig,
    section: &Section,
    agent: &dyn CodeGenAgent,
) -> WorkerResult<SectionOutcome> {
    let max_turns = bvs_core::complexity::default_subtask_max_turns() * 4;
    let model = bvs_core::complexity::subtask_model(cfg.complexity_score, section.files.len());
    let all_files: Vec<String> = section.files.iter().map(|f| f.path.clone()).collect();

    let spec = SubtaskSpec {
        kind: SubtaskKind::Implementation,
        name: "legacy".to_string(),
        files: all_files,
    };

    let outcome = run_subtask(section, &spec, max_turns, model, cfg, agent).await;
    let success = outcome.subtask.status == SubtaskStatus::Done;
    let commits = outcome.commit.clone().into_iter().collect();
    let files_changed = outcome.subtask.files.clone();
    let errors = outcome.error.clone().into_iter().collect();

    Ok(SectionOutcome {
        section_id: section.id.clone(),
        worker_id: cfg.worker_id.clone(),
        subtasks: vec![outcome],
        commits,
        files_changed,
        success,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvs_core::domain::{FileAction, FileStatus, SectionFile};

    fn cfg(worktree: PathBuf) -> ExecutorConfig {
        ExecutorConfig {
            worker_id: "W1".to_string(),
            worktree_path: worktree,
            complexity_score: 1,
            framework: Some("axum".to_string()),
            completed_sections_summary: vec![],
            typecheck_command: None,
        }
    }

    fn init_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let run = |args: &[&str]| {
            let out = std::process::Command::new("git")
                .args(args)
                .current_dir(dir.path())
                .output()
                .unwrap();
            assert!(out.status.success());
        };
        run(&["init", "-b", "main"]);
        run(&["config", "user.name", "test"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["commit", "--allow-empty", "-m", "initial"]);
        dir
    }

    #[tokio::test]
    async fn subtask_path_writes_and_commits_files() {
        let repo = init_repo();
        let mut section = Section::new("sec1", "Sec1", "desc");
        section.files.push(SectionFile {
            path: "src/lib.rs".to_string(),
            action: FileAction::Create,
            status: FileStatus::Pending,
        });

        let agent = crate::agent::ScriptedAgent::new(vec!["src/lib.rs".to_string()], "// body");
        let cfg = cfg(repo.path().to_path_buf());
        let outcome = execute_section_with_subtasks(&cfg, &section, &agent)
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.commits.len(), 1);
        assert!(repo.path().join("src/lib.rs").exists());
    }

    #[tokio::test]
    async fn empty_files_uses_legacy_path_with_no_subtasks_emitted() {
        let repo = init_repo();
        let section = Section::new("sec1", "Sec1", "desc");
        let agent = crate::agent::ScriptedAgent::new(vec![], "// body");
        let cfg = cfg(repo.path().to_path_buf());
        let outcome = execute_section_with_subtasks(&cfg, &section, &agent)
            .await
            .unwrap();
        assert_eq!(outcome.subtasks.len(), 1);
    }
}
