//! Session lifecycle: creation from a fresh project, creation from an
//! approved plan, restoration from persisted progress, and direct
//! accessors. Sessions live only in memory — `progress.json` is the
//! durable record a restore reconstructs from.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use bvs_core::domain::{
    Plan, ProgressAggregate, Project, ProjectStatus, SectionStatus, Session, SessionPhase, SessionStatus,
};
use bvs_core::store::{ProgressEntry, ProgressSnapshot, ProjectStore};
use bvs_core::DependencyGraph;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::{OrchestratorError, OrchestratorResult};

/// A session plus the plan it is executing against, held together since
/// the scheduler mutates section status on the plan in lockstep with the
/// session's aggregate progress.
pub struct SessionEntry {
    pub session: Session,
    pub plan: Plan,
    pub graph: DependencyGraph,
}

/// A held lock on one session's entry, for callers that must keep a
/// `&mut SessionEntry` alive across `.await` points.
pub struct SessionGuard<'a> {
    guard: MutexGuard<'a, HashMap<String, SessionEntry>>,
    session_id: String,
}

impl Deref for SessionGuard<'_> {
    type Target = SessionEntry;
    fn deref(&self) -> &SessionEntry {
        self.guard
            .get(&self.session_id)
            .expect("session present for the guard's lifetime")
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut SessionEntry {
        self.guard
            .get_mut(&self.session_id)
            .expect("session present for the guard's lifetime")
    }
}

pub struct SessionRegistry<St> {
    store: Arc<St>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
    /// project_id -> session_id, so a later session for the same project
    /// evicts the earlier one (only one live session per project at a
    /// time).
    by_project: Mutex<HashMap<String, String>>,
}

fn new_session_id() -> String {
    format!("sess-{}", Uuid::new_v4())
}

fn rebuild_graph(plan: &mut Plan) -> OrchestratorResult<DependencyGraph> {
    Ok(DependencyGraph::build(&mut plan.sections)?)
}

fn progress_snapshot(session: &Session, plan: &Plan) -> ProgressSnapshot {
    let sections: Vec<ProgressEntry> = plan
        .sections
        .iter()
        .map(|s| ProgressEntry {
            id: s.id.clone(),
            name: s.name.clone(),
            status: s.status,
            progress: s.progress,
            worker_id: s.worker_id.clone(),
            started_at: s.started_at,
            finished_at: s.finished_at,
            last_error: s.last_error.clone(),
            worker_output: Vec::new(),
            metrics: None,
        })
        .collect();

    ProgressSnapshot {
        session_id: session.id.clone(),
        status: session.status,
        phase: session.phase,
        total: plan.sections.len(),
        completed: plan.sections.iter().filter(|s| s.status == SectionStatus::Done).count(),
        failed: plan.sections.iter().filter(|s| s.status == SectionStatus::Failed).count(),
        sections,
    }
}

fn merge_progress_into_plan(plan: &mut Plan, snapshot: &ProgressSnapshot) {
    for entry in &snapshot.sections {
        if let Some(section) = plan.section_mut(&entry.id) {
            section.status = entry.status;
            section.progress = entry.progress;
            section.worker_id = entry.worker_id.clone();
            section.started_at = entry.started_at;
            section.finished_at = entry.finished_at;
            section.last_error = entry.last_error.clone();
        }
    }
}

impl<St: ProjectStore> SessionRegistry<St> {
    pub fn new(store: Arc<St>) -> Self {
        Self {
            store,
            sessions: Mutex::new(HashMap::new()),
            by_project: Mutex::new(HashMap::new()),
        }
    }

    /// `createSession(repo)`: materialize the project directory and
    /// allocate a fresh, idle session over it. The plan is loaded (and may
    /// be empty/unapproved) separately before execution starts.
    pub async fn create_session(&self, project: &Project, plan: Plan) -> OrchestratorResult<String> {
        self.store.ensure_project_dir(&project.id).await?;
        self.store.save_project(project).await?;

        let session_id = new_session_id();
        let mut plan = plan;
        let graph = rebuild_graph(&mut plan)?;
        let session = Session::new(session_id.clone(), project.id.clone(), project.slug.clone());

        self.insert(project.id.clone(), session_id.clone(), SessionEntry { session, plan, graph })
            .await;
        Ok(session_id)
    }

    /// `createSessionFromPlan(repo, projectId, plan)`: derive sections from
    /// an approved plan, preserving any already-`done` status from loaded
    /// progress, and evict any earlier session for the same project.
    pub async fn create_session_from_plan(
        &self,
        project: &Project,
        mut plan: Plan,
        project_path: &str,
    ) -> OrchestratorResult<String> {
        if !plan.is_approved() {
            return Err(OrchestratorError::PlanNotApproved {
                project_id: project.id.clone(),
            });
        }

        if let Some(snapshot) = self.store.load_progress(&project.id).await? {
            merge_progress_into_plan(&mut plan, &snapshot);
        }

        let graph = rebuild_graph(&mut plan)?;
        let session_id = new_session_id();
        let session = Session::new(session_id.clone(), project.id.clone(), project_path.to_string());

        self.insert(project.id.clone(), session_id.clone(), SessionEntry { session, plan, graph })
            .await;
        Ok(session_id)
    }

    /// `restoreSessionFromProgress(repo, projectId)`: reconstruct a
    /// `paused` session from persisted state when none is in memory.
    /// Never auto-resumes — the returned session starts `paused`.
    pub async fn restore_session_from_progress(&self, project_id: &str) -> OrchestratorResult<Option<String>> {
        if let Some(existing) = self.by_project.lock().await.get(project_id).cloned() {
            return Ok(Some(existing));
        }

        let Some(project) = self.store.load_project(project_id).await? else {
            return Ok(None);
        };
        if !matches!(
            project.status,
            ProjectStatus::InProgress | ProjectStatus::Paused | ProjectStatus::Ready
        ) {
            return Ok(None);
        }

        let Some(mut plan) = self.store.load_plan(Some(project_id)).await? else {
            return Ok(None);
        };
        let snapshot = self.store.load_progress(project_id).await?;

        let graph = rebuild_graph(&mut plan)?;
        let session_id = new_session_id();
        let mut session = Session::new(session_id.clone(), project.id.clone(), project.slug.clone());
        session.status = SessionStatus::Paused;
        session.phase = SessionPhase::Idle;
        if let Some(snapshot) = &snapshot {
            session.progress = ProgressAggregate {
                total: snapshot.total,
                completed: snapshot.completed,
                failed: snapshot.failed,
            };
        }

        self.insert(project.id.clone(), session_id.clone(), SessionEntry { session, plan, graph })
            .await;
        Ok(Some(session_id))
    }

    async fn insert(&self, project_id: String, session_id: String, entry: SessionEntry) {
        let mut by_project = self.by_project.lock().await;
        let mut sessions = self.sessions.lock().await;
        if let Some(old_session_id) = by_project.insert(project_id, session_id.clone()) {
            sessions.remove(&old_session_id);
        }
        sessions.insert(session_id, entry);
    }

    pub async fn delete_session(&self, session_id: &str) -> OrchestratorResult<()> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .remove(session_id)
            .ok_or_else(|| OrchestratorError::SessionNotFound {
                id: session_id.to_string(),
            })?;
        drop(sessions);
        let mut by_project = self.by_project.lock().await;
        by_project.remove(&entry.session.project_id);
        Ok(())
    }

    pub async fn list_session_ids(&self) -> Vec<String> {
        self.sessions.lock().await.keys().cloned().collect()
    }

    pub async fn with_session<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionEntry) -> R,
    ) -> OrchestratorResult<R> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| OrchestratorError::SessionNotFound {
                id: session_id.to_string(),
            })?;
        Ok(f(entry))
    }

    /// Lock one session for the duration of a scheduler pass, which needs
    /// to hold a live `&mut SessionEntry` across many `.await` points
    /// (worktree setup, the agent, the quality gate). `tokio::sync::Mutex`
    /// guards are safe to hold across `.await`, unlike a std mutex's —
    /// the tradeoff is that this registry's other sessions also block on
    /// the same map for as long as the guard is held, so only one
    /// scheduler pass runs at a time across the whole registry.
    pub async fn lock<'a>(&'a self, session_id: &str) -> OrchestratorResult<SessionGuard<'a>> {
        let guard = self.sessions.lock().await;
        if !guard.contains_key(session_id) {
            return Err(OrchestratorError::SessionNotFound {
                id: session_id.to_string(),
            });
        }
        Ok(SessionGuard {
            guard,
            session_id: session_id.to_string(),
        })
    }

    pub async fn snapshot_session(&self, session_id: &str) -> OrchestratorResult<Session> {
        self.with_session(session_id, |entry| entry.session.clone()).await
    }

    pub async fn persist_progress(&self, session_id: &str) -> OrchestratorResult<()> {
        let (project_id, snapshot) = self
            .with_session(session_id, |entry| (entry.session.project_id.clone(), progress_snapshot(&entry.session, &entry.plan)))
            .await?;
        self.store.save_progress(&project_id, &snapshot).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvs_core::domain::{Plan, Section};
    use bvs_core::store::FsStore;

    fn sample_plan(project_id: &str) -> Plan {
        let mut sections = vec![Section::new("a", "A", "desc")];
        sections[0].success_criteria.clear();
        let mut plan = Plan::new(project_id, sections);
        plan.approve();
        plan
    }

    #[tokio::test]
    async fn create_session_from_plan_requires_approval() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsStore::new(dir.path()));
        let registry = SessionRegistry::new(store);
        let project = Project::new("p1", "proj", "Project One");
        let plan = Plan::new("p1", vec![Section::new("a", "A", "desc")]);

        let err = registry
            .create_session_from_plan(&project, plan, dir.path().to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::PlanNotApproved { .. }));
    }

    #[tokio::test]
    async fn creating_a_second_session_for_same_project_evicts_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsStore::new(dir.path()));
        let registry = SessionRegistry::new(store);
        let project = Project::new("p1", "proj", "Project One");

        let first = registry
            .create_session_from_plan(&project, sample_plan("p1"), dir.path().to_str().unwrap())
            .await
            .unwrap();
        let second = registry
            .create_session_from_plan(&project, sample_plan("p1"), dir.path().to_str().unwrap())
            .await
            .unwrap();

        assert_ne!(first, second);
        let ids = registry.list_session_ids().await;
        assert_eq!(ids, vec![second]);
    }

    #[tokio::test]
    async fn delete_session_removes_it_from_the_registry() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsStore::new(dir.path()));
        let registry = SessionRegistry::new(store);
        let project = Project::new("p1", "proj", "Project One");

        let id = registry
            .create_session_from_plan(&project, sample_plan("p1"), dir.path().to_str().unwrap())
            .await
            .unwrap();
        registry.delete_session(&id).await.unwrap();
        assert!(registry.list_session_ids().await.is_empty());
    }
}
