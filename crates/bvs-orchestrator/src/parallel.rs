//! Parallel scheduler: iterates levels in order, running each level's
//! workers concurrently (bounded by `max_workers`), then gates on the
//! merge-point coordinator before moving to the next level.

use std::path::Path;

use bvs_core::domain::{Section, SectionStatus, SessionStatus};
use bvs_core::BvsConfig;
use bvs_merge::{run_merge_point, CompletedWorker};
use chrono::Utc;
use futures::future::join_all;

use crate::agents::AgentProvider;
use crate::error::OrchestratorResult;
use crate::events::{EventBody, EventSink};
use crate::execution::{execute_one_section, SectionContext};
use crate::session::SessionEntry;

fn worker_id_for_index(i: usize) -> String {
    format!("W{}", i + 1)
}

/// Run every level of `entry.graph` in order. Stops (returning `false`) the
/// first time a level's merge point fails; `true` means every level
/// integrated cleanly.
pub async fn execute_with_merge_points(
    cfg: &BvsConfig,
    agents: &dyn AgentProvider,
    events: &EventSink,
    entry: &mut SessionEntry,
    repo_root: &Path,
    target_branch: &str,
    worktree_base: &Path,
) -> OrchestratorResult<bool> {
    let max_level = entry.graph.max_level();

    for level in 0..=max_level {
        let section_ids: Vec<String> = entry
            .graph
            .levels()
            .get(level)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|id| entry.session.is_selected(id))
            .filter(|id| {
                entry
                    .plan
                    .section(id)
                    .map(|s| !matches!(s.status, SectionStatus::Done))
                    .unwrap_or(false)
            })
            .collect();

        if section_ids.is_empty() {
            continue;
        }

        events.emit(
            Utc::now(),
            EventBody::LevelStarted {
                level,
                section_ids: section_ids.clone(),
            },
        );

        let mut completed_workers = Vec::new();

        for batch in section_ids.chunks(cfg.max_workers.max(1)) {
            // Each future below owns a clone of its `Section` instead of
            // borrowing `entry.plan`, so running them concurrently in
            // `join_all` never aliases a shared `&mut Plan`. The plan is
            // only mutated here in the parent task, serially, once every
            // future in the batch has resolved.
            let mut futures = Vec::new();
            for (i, section_id) in batch.iter().enumerate() {
                let worker_id = worker_id_for_index(i);
                entry.session.current_sections.insert(section_id.clone());
                entry.session.workers.insert(worker_id.clone(), section_id.clone());

                let section: Section = match entry.plan.section(section_id) {
                    Some(s) => s.clone(),
                    None => continue,
                };
                let ctx = SectionContext {
                    fan_out: entry.graph.dependents_of(section_id).len() as u32,
                    framework: entry.plan.codebase_context.framework.clone(),
                    completed_sections_summary: entry
                        .plan
                        .sections
                        .iter()
                        .filter(|s| s.status == SectionStatus::Done)
                        .map(|s| s.name.clone())
                        .collect(),
                };

                futures.push(execute_one_section(
                    cfg,
                    agents,
                    events,
                    section,
                    ctx,
                    worker_id,
                    repo_root,
                    target_branch,
                    worktree_base,
                ));
            }

            let results = join_all(futures).await;
            for result in results {
                let outcome = result?;
                entry.session.current_sections.remove(&outcome.section.id);
                entry.session.workers.remove(&outcome.worker_id);

                if outcome.success {
                    completed_workers.push(CompletedWorker {
                        section_id: outcome.section.id.clone(),
                        worker_id: outcome.worker_id.clone(),
                        branch: outcome.branch.clone(),
                        section_description: outcome.section.description.clone(),
                    });
                }

                if let Some(slot) = entry.plan.section_mut(&outcome.section.id) {
                    *slot = outcome.section;
                }
            }
        }

        if completed_workers.is_empty() {
            entry.session.status = SessionStatus::Failed;
            events.emit(
                Utc::now(),
                EventBody::SessionFailed {
                    reason: format!("no worker completed successfully at level {level}"),
                },
            );
            return Ok(false);
        }

        let merge_result = run_merge_point(
            repo_root,
            target_branch,
            completed_workers,
            agents.conflict_resolver().as_ref(),
            &cfg.commands,
        )
        .await?;

        let succeeded = merge_result.succeeded();
        events.emit(Utc::now(), EventBody::MergePointCompleted { level, succeeded });

        if !succeeded {
            entry.session.status = SessionStatus::Failed;
            events.emit(
                Utc::now(),
                EventBody::SessionFailed {
                    reason: format!("merge point at level {level} failed"),
                },
            );
            return Ok(false);
        }

        for worker_id in &merge_result.merged_worker_ids {
            bvs_merge::git::remove_worktree(repo_root, worktree_base.join(worker_id).as_path()).await;
            bvs_merge::git::delete_branch(repo_root, &format!("bvs-worker-{worker_id}")).await;
        }
    }

    Ok(true)
}
