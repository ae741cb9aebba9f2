//! The top-level orchestrator: binds the session registry, the
//! sequential/parallel schedulers, the session-limit gate, and the
//! run ledger into the host-facing start/pause/resume/stop execution
//! surface.
//!
//! Pause cadence by approval mode: `UNATTENDED` runs every runnable batch
//! back to back; `SEMI_ATTENDED` runs automatically but pauses the moment a
//! batch produces a failed section; `ATTENDED_LEVEL` and `ATTENDED_SINGLE`
//! both pause after every dispatched batch for the sequential scheduler —
//! sizing that batch down to exactly one section for a literal single-step
//! cadence is a caller-side `max_workers` choice, not something this
//! scheduler enforces itself (see DESIGN.md). The parallel scheduler runs
//! every level of one `startExecution` call through to completion or
//! failure; its pause cadence is therefore coarser, at the run boundary
//! rather than per level.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bvs_core::domain::{ApprovalMode, ExecutionRun, Learning, RunStatus, SectionStatus, SessionPhase, SessionStatus};
use bvs_core::store::{LearningsLog, ProjectStore, RunLedger};
use bvs_core::BvsConfig;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::agents::AgentProvider;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::events::{EventBody, EventSink};
use crate::limits::{check_limits, UsageCounters};
use crate::parallel::execute_with_merge_points;
use crate::scheduler::{all_selected_sections_done, execute_next_sections, has_unselected_pending_work};
use crate::session::SessionRegistry;

pub struct Orchestrator<St> {
    store: Arc<St>,
    sessions: SessionRegistry<St>,
    agents: Arc<dyn AgentProvider>,
    cfg: BvsConfig,
    cancel_flags: Mutex<HashMap<String, Arc<AtomicBool>>>,
    usage: Mutex<HashMap<String, UsageCounters>>,
}

/// Per-section usage charged against the session-limit gate. No per-call
/// cost figure is threaded up from the agent trait in this codebase, so
/// each section attempt is charged one iteration and this fixed cost unit
/// regardless of how many subtasks or tool calls it actually took.
const COST_UNIT_PER_SECTION: f64 = 0.05;

impl<St> Orchestrator<St>
where
    St: ProjectStore + RunLedger + LearningsLog + Send + Sync + 'static,
{
    pub fn new(store: Arc<St>, agents: Arc<dyn AgentProvider>, cfg: BvsConfig) -> Self {
        Self {
            sessions: SessionRegistry::new(store.clone()),
            store,
            agents,
            cfg,
            cancel_flags: Mutex::new(HashMap::new()),
            usage: Mutex::new(HashMap::new()),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry<St> {
        &self.sessions
    }

    pub fn config(&self) -> &BvsConfig {
        &self.cfg
    }

    pub fn agents(&self) -> Arc<dyn AgentProvider> {
        self.agents.clone()
    }

    /// `stopExecution`: cooperative cancellation observed at the next batch
    /// or level boundary.
    pub async fn stop_execution(&self, session_id: &str) {
        if let Some(flag) = self.cancel_flags.lock().await.get(session_id) {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// `pauseExecution`: a direct, immediate status transition — distinct
    /// from the cooperative `stopExecution`, which only takes effect at the
    /// next safe boundary.
    pub async fn pause_execution(&self, session_id: &str) -> OrchestratorResult<()> {
        self.sessions
            .with_session(session_id, |entry| {
                entry.session.status = SessionStatus::Paused;
            })
            .await
    }

    pub async fn resume_execution(&self, session_id: &str) -> OrchestratorResult<()> {
        self.sessions
            .with_session(session_id, |entry| {
                if entry.session.status == SessionStatus::Paused {
                    entry.session.status = SessionStatus::Running;
                }
            })
            .await
    }

    async fn charge_usage(&self, session_id: &str, sections_run: usize) -> OrchestratorResult<()> {
        let mut usage_map = self.usage.lock().await;
        let usage = usage_map.entry(session_id.to_string()).or_default();
        usage.iteration_count += sections_run as u32;
        usage.subtask_cost = sections_run as f64 * COST_UNIT_PER_SECTION;
        usage.cumulative_cost += sections_run as f64 * COST_UNIT_PER_SECTION;
        check_limits(&self.cfg, usage)
    }

    async fn record_limit_violation(&self, project_id: &str, err: &OrchestratorError) {
        if let OrchestratorError::SessionLimitExceeded { limit_kind, limit, actual } = err {
            let learning = Learning::new(
                format!("learn-{}", Uuid::new_v4()),
                format!("session limit `{limit_kind}` exceeded: {actual} > {limit}"),
                "execution halted before exceeding the configured ceiling".to_string(),
                format!("lower {limit_kind} or split this project into smaller sections"),
            );
            let _ = self.store.capture_learning(&learning).await;
            let _ = project_id;
        }
    }

    async fn finish_run(&self, project_id: &str, run: &mut ExecutionRun, status: RunStatus) {
        run.status = status;
        match status {
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled => {
                run.completed_at = Some(Utc::now());
            }
            RunStatus::Paused => run.paused_at = Some(Utc::now()),
            RunStatus::Running => {}
        }
        let _ = self.store.update_run(project_id, run).await;
    }

    /// `startExecution`: drives the configured scheduler to completion,
    /// failure, a pause boundary, or cancellation.
    pub async fn start_execution(
        &self,
        session_id: &str,
        events: &EventSink,
        repo_root: &Path,
        target_branch: &str,
        worktree_base: &Path,
    ) -> OrchestratorResult<()> {
        let current_status = self
            .sessions
            .with_session(session_id, |entry| entry.session.status)
            .await?;
        if current_status == SessionStatus::Running {
            return Err(OrchestratorError::InvalidState {
                id: session_id.to_string(),
                status: current_status,
            });
        }

        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel_flags
            .lock()
            .await
            .insert(session_id.to_string(), cancel.clone());

        let (project_id, approval_mode, parallel_enabled) = self
            .sessions
            .with_session(session_id, |entry| {
                (
                    entry.session.project_id.clone(),
                    entry.session.approval_mode,
                    entry.plan.parallel.enabled,
                )
            })
            .await?;

        let run_id = format!("run-{}", Uuid::new_v4());
        let mut run = ExecutionRun::new(run_id, project_id.clone(), session_id.to_string());
        self.store.create_run(&project_id, &run).await?;

        self.sessions
            .with_session(session_id, |entry| {
                entry.session.status = SessionStatus::Running;
                entry.session.phase = SessionPhase::Executing;
            })
            .await?;

        if parallel_enabled {
            let succeeded = self
                .run_parallel(session_id, events, repo_root, target_branch, worktree_base)
                .await?;

            self.sessions.persist_progress(session_id).await.ok();

            if !succeeded {
                self.finish_run(&project_id, &mut run, RunStatus::Failed).await;
                return Ok(());
            }

            let done = self.sessions.with_session(session_id, |entry| all_selected_sections_done(entry)).await?;
            if done {
                self.sessions
                    .with_session(session_id, |entry| {
                        entry.session.status = SessionStatus::Completed;
                        entry.session.phase = SessionPhase::Completed;
                    })
                    .await?;
                events.emit(Utc::now(), EventBody::SessionComplete);
                self.finish_run(&project_id, &mut run, RunStatus::Completed).await;
            } else {
                self.sessions
                    .with_session(session_id, |entry| entry.session.status = SessionStatus::Paused)
                    .await?;
                events.emit(
                    Utc::now(),
                    EventBody::SessionPaused {
                        reason: "unselected work remains".to_string(),
                    },
                );
                self.finish_run(&project_id, &mut run, RunStatus::Paused).await;
            }
            return Ok(());
        }

        loop {
            if cancel.load(Ordering::Relaxed) {
                self.sessions
                    .with_session(session_id, |entry| entry.session.status = SessionStatus::Paused)
                    .await?;
                events.emit(
                    Utc::now(),
                    EventBody::SessionPaused {
                        reason: "cancelled".to_string(),
                    },
                );
                self.finish_run(&project_id, &mut run, RunStatus::Cancelled).await;
                return Err(OrchestratorError::Cancelled);
            }

            let mut entry = self.sessions.lock(session_id).await?;
            let advanced_ids = execute_next_sections(
                &self.cfg,
                self.agents.as_ref(),
                events,
                &mut entry,
                repo_root,
                target_branch,
                worktree_base,
            )
            .await?;
            drop(entry);

            if advanced_ids.is_empty() {
                break;
            }

            if let Err(limit_err) = self.charge_usage(session_id, advanced_ids.len()).await {
                self.record_limit_violation(&project_id, &limit_err).await;
                self.sessions
                    .with_session(session_id, |entry| entry.session.status = SessionStatus::Failed)
                    .await?;
                events.emit(
                    Utc::now(),
                    EventBody::SessionFailed {
                        reason: limit_err.to_string(),
                    },
                );
                self.finish_run(&project_id, &mut run, RunStatus::Failed).await;
                return Err(limit_err);
            }

            self.sessions.persist_progress(session_id).await.ok();

            let any_failed = self
                .sessions
                .with_session(session_id, |entry| {
                    advanced_ids
                        .iter()
                        .any(|id| entry.plan.section(id).map(|s| s.status == SectionStatus::Failed).unwrap_or(false))
                })
                .await?;

            let should_pause = match approval_mode {
                ApprovalMode::Unattended => false,
                ApprovalMode::SemiAttended => any_failed,
                ApprovalMode::AttendedLevel | ApprovalMode::AttendedSingle => true,
            };

            if should_pause {
                self.sessions
                    .with_session(session_id, |entry| entry.session.status = SessionStatus::Paused)
                    .await?;
                events.emit(
                    Utc::now(),
                    EventBody::SessionPaused {
                        reason: format!("{approval_mode:?} cadence boundary"),
                    },
                );
                self.finish_run(&project_id, &mut run, RunStatus::Paused).await;
                return Ok(());
            }
        }

        let done = self.sessions.with_session(session_id, |entry| all_selected_sections_done(entry)).await?;
        let pending = self.sessions.with_session(session_id, |entry| has_unselected_pending_work(entry)).await?;

        if done && !pending {
            self.sessions
                .with_session(session_id, |entry| {
                    entry.session.status = SessionStatus::Completed;
                    entry.session.phase = SessionPhase::Completed;
                })
                .await?;
            events.emit(Utc::now(), EventBody::SessionComplete);
            self.finish_run(&project_id, &mut run, RunStatus::Completed).await;
        } else {
            self.sessions
                .with_session(session_id, |entry| entry.session.status = SessionStatus::Paused)
                .await?;
            events.emit(
                Utc::now(),
                EventBody::SessionPaused {
                    reason: "no further runnable sections".to_string(),
                },
            );
            self.finish_run(&project_id, &mut run, RunStatus::Paused).await;
        }

        Ok(())
    }

    async fn run_parallel(
        &self,
        session_id: &str,
        events: &EventSink,
        repo_root: &Path,
        target_branch: &str,
        worktree_base: &Path,
    ) -> OrchestratorResult<bool> {
        let mut entry = self.sessions.lock(session_id).await?;
        execute_with_merge_points(
            &self.cfg,
            self.agents.as_ref(),
            events,
            &mut entry,
            repo_root,
            target_branch,
            worktree_base,
        )
        .await
    }
}
