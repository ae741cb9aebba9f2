//! Sequential scheduler: the next-sections driver, retry, skip, and
//! selected-section partial runs. Dispatches up to `max_workers` runnable
//! sections at once, each against the single worker id `SEQ` in sequence
//! within this scheduler (true concurrency is the parallel scheduler's
//! job; the sequential path favors determinism over throughput).

use std::collections::BTreeSet;
use std::path::Path;

use bvs_core::domain::{Plan, Section, SectionStatus};
use bvs_core::BvsConfig;

use crate::agents::AgentProvider;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::events::EventSink;
use crate::execution::{execute_one_section, SectionContext};
use crate::session::SessionEntry;

fn section_context(entry: &SessionEntry, section_id: &str) -> SectionContext {
    SectionContext {
        fan_out: entry.graph.dependents_of(section_id).len() as u32,
        framework: entry.plan.codebase_context.framework.clone(),
        completed_sections_summary: entry
            .plan
            .sections
            .iter()
            .filter(|s| s.status == SectionStatus::Done)
            .map(|s| s.name.clone())
            .collect(),
    }
}

/// Sections eligible to run right now: not already running/done/verifying,
/// every dependency `done`, and (if a selection is active) a member of it.
pub fn runnable_sections(plan: &Plan, entry_graph: &bvs_core::DependencyGraph, selected: &Option<BTreeSet<String>>) -> Vec<String> {
    let done_ids: BTreeSet<String> = plan
        .sections
        .iter()
        .filter(|s| s.status == SectionStatus::Done)
        .map(|s| s.id.clone())
        .collect();

    let candidates: Vec<&Section> = plan
        .sections
        .iter()
        .filter(|s| !matches!(s.status, SectionStatus::Done | SectionStatus::InProgress | SectionStatus::Verifying))
        .filter(|s| selected.as_ref().map(|sel| sel.contains(&s.id)).unwrap_or(true))
        .collect();

    entry_graph.runnable(candidates.iter().map(|s| s.id.as_str()), &done_ids)
}

/// Run one batch of sequential execution: dispatch up to `maxWorkers -
/// currentlyRunning` runnable sections, running them to completion before
/// returning (the sequential scheduler has no inter-section concurrency).
pub async fn execute_next_sections(
    cfg: &BvsConfig,
    agents: &dyn AgentProvider,
    events: &EventSink,
    entry: &mut SessionEntry,
    repo_root: &Path,
    target_branch: &str,
    worktree_base: &Path,
) -> OrchestratorResult<Vec<String>> {
    let currently_running = entry.session.current_sections.len();
    let slots = cfg.max_workers.saturating_sub(currently_running);
    if slots == 0 {
        return Ok(Vec::new());
    }

    let runnable = runnable_sections(&entry.plan, &entry.graph, &entry.session.selected_section_ids);
    let batch: Vec<String> = runnable.into_iter().take(slots).collect();

    let mut advanced = Vec::new();
    for (i, section_id) in batch.iter().enumerate() {
        let worker_id = format!("SEQ{}", i + 1);
        entry.session.current_sections.insert(section_id.clone());
        entry.session.workers.insert(worker_id.clone(), section_id.clone());

        let section = entry
            .plan
            .section(section_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::SectionNotFound { id: section_id.clone() })?;
        let ctx = section_context(entry, section_id);

        let outcome = execute_one_section(
            cfg,
            agents,
            events,
            section,
            ctx,
            worker_id.clone(),
            repo_root,
            target_branch,
            worktree_base,
        )
        .await?;

        if let Some(slot) = entry.plan.section_mut(section_id) {
            *slot = outcome.section;
        }

        entry.session.current_sections.remove(section_id);
        entry.session.workers.remove(&worker_id);
        entry.session.progress.total = entry.plan.sections.len();
        entry.session.progress.completed =
            entry.plan.sections.iter().filter(|s| s.status == SectionStatus::Done).count();
        entry.session.progress.failed =
            entry.plan.sections.iter().filter(|s| s.status == SectionStatus::Failed).count();

        advanced.push(section_id.clone());
    }

    Ok(advanced)
}

/// `retrySection`: allowed iff the section is not currently running; resets
/// its error and restarts it inline.
pub async fn retry_section(
    cfg: &BvsConfig,
    agents: &dyn AgentProvider,
    events: &EventSink,
    entry: &mut SessionEntry,
    section_id: &str,
    repo_root: &Path,
    target_branch: &str,
    worktree_base: &Path,
) -> OrchestratorResult<()> {
    {
        let section = entry
            .plan
            .section_mut(section_id)
            .ok_or_else(|| OrchestratorError::SectionNotFound { id: section_id.to_string() })?;
        if section.status == SectionStatus::InProgress {
            return Err(OrchestratorError::RetryNotAllowed {
                id: section_id.to_string(),
                reason: "section is currently running".to_string(),
            });
        }
        if !section.can_retry() {
            return Err(OrchestratorError::RetryNotAllowed {
                id: section_id.to_string(),
                reason: format!("retry_count has reached max_retries ({})", section.max_retries),
            });
        }
        section.retry_count += 1;
        section.last_error = None;
        section.status = SectionStatus::Pending;
    }

    let worker_id = format!("SEQ-retry-{}", entry.session.workers.len() + 1);
    let section = entry
        .plan
        .section(section_id)
        .cloned()
        .ok_or_else(|| OrchestratorError::SectionNotFound { id: section_id.to_string() })?;
    let ctx = section_context(entry, section_id);

    let outcome = execute_one_section(
        cfg,
        agents,
        events,
        section,
        ctx,
        worker_id,
        repo_root,
        target_branch,
        worktree_base,
    )
    .await?;

    if let Some(slot) = entry.plan.section_mut(section_id) {
        *slot = outcome.section;
    }
    Ok(())
}

/// `skipSection`: marks a failed section `done` at 0 progress, preserving
/// its error text, and unblocks its dependents.
pub fn skip_section(entry: &mut SessionEntry, section_id: &str) -> OrchestratorResult<()> {
    let section = entry
        .plan
        .section_mut(section_id)
        .ok_or_else(|| OrchestratorError::SectionNotFound { id: section_id.to_string() })?;
    if section.status != SectionStatus::Failed {
        return Err(OrchestratorError::RetryNotAllowed {
            id: section_id.to_string(),
            reason: "only a failed section may be skipped".to_string(),
        });
    }
    section.status = SectionStatus::Done;
    section.progress = 0;
    Ok(())
}

/// `executeSelectedSections`: restricts the runnable set to `section_ids`
/// without touching counts derived from the whole plan.
pub fn select_sections(entry: &mut SessionEntry, section_ids: BTreeSet<String>) {
    entry.session.selected_section_ids = Some(section_ids);
}

/// True once every selected (or, with no selection, every) section has
/// reached a terminal status.
pub fn all_selected_sections_done(entry: &SessionEntry) -> bool {
    entry
        .plan
        .sections
        .iter()
        .filter(|s| entry.session.is_selected(&s.id))
        .all(|s| matches!(s.status, SectionStatus::Done | SectionStatus::Failed))
}

/// True when every selected section is done but unselected pending
/// sections remain — the session should pause, not complete.
pub fn has_unselected_pending_work(entry: &SessionEntry) -> bool {
    entry.session.selected_section_ids.is_some()
        && entry
            .plan
            .sections
            .iter()
            .any(|s| !entry.session.is_selected(&s.id) && s.status == SectionStatus::Pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvs_core::domain::Plan;
    use bvs_core::DependencyGraph;

    fn two_section_plan() -> (Plan, DependencyGraph) {
        let mut a = Section::new("a", "A", "desc");
        let mut b = Section::new("b", "B", "desc");
        b.dependencies.insert("a".to_string());
        let mut sections = vec![a.clone(), b.clone()];
        let graph = DependencyGraph::build(&mut sections).unwrap();
        a = sections[0].clone();
        b = sections[1].clone();
        (Plan::new("p1", vec![a, b]), graph)
    }

    #[test]
    fn runnable_excludes_sections_with_unmet_dependencies() {
        let (plan, graph) = two_section_plan();
        let runnable = runnable_sections(&plan, &graph, &None);
        assert_eq!(runnable, vec!["a".to_string()]);
    }

    #[test]
    fn runnable_respects_selection() {
        let (mut plan, graph) = two_section_plan();
        plan.sections[0].status = SectionStatus::Done;
        let selected = Some(BTreeSet::from(["a".to_string()]));
        let runnable = runnable_sections(&plan, &graph, &selected);
        assert!(runnable.is_empty());
    }

    #[test]
    fn skip_section_requires_failed_status() {
        let (plan, graph) = two_section_plan();
        let mut entry = SessionEntry {
            session: bvs_core::domain::Session::new("s1", "p1", "/repo"),
            plan,
            graph,
        };
        let err = skip_section(&mut entry, "a").unwrap_err();
        assert!(matches!(err, OrchestratorError::RetryNotAllowed { .. }));

        entry.plan.sections[0].status = SectionStatus::Failed;
        skip_section(&mut entry, "a").unwrap();
        assert_eq!(entry.plan.sections[0].status, SectionStatus::Done);
        assert_eq!(entry.plan.sections[0].progress, 0);
    }

    #[test]
    fn unselected_pending_work_blocks_completion() {
        let (plan, graph) = two_section_plan();
        let mut entry = SessionEntry {
            session: bvs_core::domain::Session::new("s1", "p1", "/repo"),
            plan,
            graph,
        };
        entry.plan.sections[0].status = SectionStatus::Done;
        entry.plan.sections[1].status = SectionStatus::Done;
        select_sections(&mut entry, BTreeSet::from(["a".to_string()]));
        entry.plan.sections[1].status = SectionStatus::Pending;
        assert!(all_selected_sections_done(&entry));
        assert!(has_unselected_pending_work(&entry));
    }
}
