//! Filesystem-backed implementation of the state store.
//!
//! Layout:
//! ```text
//! <bvs-root>/
//!   config.json
//!   learnings.md
//!   learnings.ndjson        (structured index backing `load_learnings`)
//!   projects/<project-id>/
//!     project.json
//!     plan.json
//!     progress.json
//!     runs/<run-id>.json
//! ```
//!
//! All writes go through [`atomic_write`]: write to a sibling temp file in
//! the same directory, then persist/rename — the same pattern this codebase
//! uses for its content-addressed blob store, generalized to whole JSON
//! documents instead of immutable blobs.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::domain::{ExecutionRun, Learning, Plan, Project, ProjectStatus};
use crate::error::{StateError, StateResult};

use super::traits::{LearningsLog, ProgressSnapshot, ProjectStore, RunLedger};

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn project_dir(&self, project_id: &str) -> PathBuf {
        self.root.join("projects").join(project_id)
    }

    fn project_json(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("project.json")
    }

    fn plan_json(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("plan.json")
    }

    fn progress_json(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("progress.json")
    }

    fn runs_dir(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("runs")
    }

    fn legacy_plan_json(&self) -> PathBuf {
        self.root.join("plan.json")
    }

    fn learnings_md(&self) -> PathBuf {
        self.root.join("learnings.md")
    }

    fn learnings_ndjson(&self) -> PathBuf {
        self.root.join("learnings.ndjson")
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn json_err(path: &Path, source: serde_json::Error) -> StateError {
    StateError::CorruptedJson {
        path: path.display().to_string(),
        source,
    }
}

/// Write `value` to `path` atomically: temp file in the same directory,
/// then rename. Missing parent directories are created first.
fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> StateResult<()> {
    let parent = path.parent().expect("json path always has a parent");
    std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| json_err(path, e))?;
    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| io_err(parent, e))?;
    tmp.write_all(&bytes).map_err(|e| io_err(path, e))?;
    tmp.persist(path).map_err(|e| io_err(path, e.error))?;
    Ok(())
}

fn read_json_opt<T: serde::de::DeserializeOwned>(path: &Path) -> StateResult<Option<T>> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes).map_err(|e| json_err(path, e))?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(path, e)),
    }
}

#[async_trait]
impl ProjectStore for FsStore {
    async fn ensure_project_dir(&self, project_id: &str) -> StateResult<()> {
        let dir = self.project_dir(project_id);
        std::fs::create_dir_all(dir.join("runs")).map_err(|e| io_err(&dir, e))?;
        std::fs::create_dir_all(dir.join("logs")).map_err(|e| io_err(&dir, e))?;
        std::fs::create_dir_all(dir.join("checkpoints")).map_err(|e| io_err(&dir, e))?;
        Ok(())
    }

    async fn save_project(&self, project: &Project) -> StateResult<()> {
        self.ensure_project_dir(&project.id).await?;
        atomic_write_json(&self.project_json(&project.id), project)
    }

    async fn load_project(&self, project_id: &str) -> StateResult<Option<Project>> {
        read_json_opt(&self.project_json(project_id))
    }

    async fn list_projects(&self) -> StateResult<Vec<Project>> {
        let dir = self.root.join("projects");
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids: Vec<String> = std::fs::read_dir(&dir)
            .map_err(|e| io_err(&dir, e))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        ids.sort();

        let mut projects = Vec::new();
        for id in ids {
            if let Some(p) = self.load_project(&id).await? {
                projects.push(p);
            }
        }
        Ok(projects)
    }

    async fn delete_project(&self, project_id: &str, physical: bool) -> StateResult<()> {
        if physical {
            let dir = self.project_dir(project_id);
            if dir.exists() {
                std::fs::remove_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
            }
            return Ok(());
        }
        match self.load_project(project_id).await? {
            Some(mut p) => {
                p.cancel();
                self.save_project(&p).await
            }
            None => Err(StateError::ProjectNotFound {
                project_id: project_id.to_string(),
            }),
        }
    }

    async fn save_plan(&self, project_id: &str, plan: &Plan) -> StateResult<()> {
        self.ensure_project_dir(project_id).await?;
        atomic_write_json(&self.plan_json(project_id), plan)
    }

    async fn load_plan(&self, project_id: Option<&str>) -> StateResult<Option<Plan>> {
        let mut plan = match project_id {
            Some(id) => read_json_opt::<Plan>(&self.plan_json(id))?,
            None => {
                let candidate = self.first_active_project_id().await?;
                match candidate {
                    Some(id) => read_json_opt::<Plan>(&self.plan_json(&id))?,
                    None => read_json_opt::<Plan>(&self.legacy_plan_json())?,
                }
            }
        };

        if let Some(plan) = plan.as_mut() {
            if let Some(progress) = self.load_progress(&plan.project_id).await? {
                merge_progress_onto_plan(plan, &progress);
            }
        }

        Ok(plan)
    }

    async fn save_progress(&self, project_id: &str, snapshot: &ProgressSnapshot) -> StateResult<()> {
        self.ensure_project_dir(project_id).await?;
        atomic_write_json(&self.progress_json(project_id), snapshot)
    }

    async fn load_progress(&self, project_id: &str) -> StateResult<Option<ProgressSnapshot>> {
        read_json_opt(&self.progress_json(project_id))
    }
}

impl FsStore {
    async fn first_active_project_id(&self) -> StateResult<Option<String>> {
        for project in self.list_projects().await? {
            if matches!(
                project.status,
                ProjectStatus::Ready | ProjectStatus::InProgress | ProjectStatus::Paused
            ) {
                return Ok(Some(project.id));
            }
        }
        Ok(None)
    }
}

/// For each progress entry matching a section id, overwrite status,
/// progress, worker id, timing, error, and metrics fields.
fn merge_progress_onto_plan(plan: &mut Plan, progress: &ProgressSnapshot) {
    for entry in &progress.sections {
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

#[async_trait]
impl RunLedger for FsStore {
    async fn create_run(&self, project_id: &str, run: &ExecutionRun) -> StateResult<()> {
        self.ensure_project_dir(project_id).await?;
        let path = self.runs_dir(project_id).join(format!("{}.json", run.id));
        atomic_write_json(&path, run)
    }

    async fn update_run(&self, project_id: &str, run: &ExecutionRun) -> StateResult<()> {
        let path = self.runs_dir(project_id).join(format!("{}.json", run.id));
        atomic_write_json(&path, run)
    }

    async fn get_run(&self, project_id: &str, run_id: &str) -> StateResult<ExecutionRun> {
        let path = self.runs_dir(project_id).join(format!("{run_id}.json"));
        read_json_opt(&path)?.ok_or_else(|| StateError::RunNotFound {
            run_id: run_id.to_string(),
        })
    }

    async fn list_runs(&self, project_id: &str) -> StateResult<Vec<ExecutionRun>> {
        let dir = self.runs_dir(project_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names: Vec<PathBuf> = std::fs::read_dir(&dir)
            .map_err(|e| io_err(&dir, e))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect();
        names.sort();

        let mut runs = Vec::new();
        for path in names {
            if let Some(run) = read_json_opt(&path)? {
                runs.push(run);
            }
        }
        Ok(runs)
    }

    async fn delete_run(&self, project_id: &str, run_id: &str) -> StateResult<()> {
        let path = self.runs_dir(project_id).join(format!("{run_id}.json"));
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path, e)),
        }
    }
}

#[async_trait]
impl LearningsLog for FsStore {
    async fn capture_learning(&self, learning: &Learning) -> StateResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| io_err(&self.root, e))?;

        let md_path = self.learnings_md();
        let mut md = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&md_path)
            .map_err(|e| io_err(&md_path, e))?;
        md.write_all(learning.to_markdown().as_bytes())
            .map_err(|e| io_err(&md_path, e))?;
        md.write_all(b"\n").map_err(|e| io_err(&md_path, e))?;

        let ndjson_path = self.learnings_ndjson();
        let mut ndjson = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&ndjson_path)
            .map_err(|e| io_err(&ndjson_path, e))?;
        let line = serde_json::to_string(learning).map_err(|e| json_err(&ndjson_path, e))?;
        ndjson
            .write_all(line.as_bytes())
            .map_err(|e| io_err(&ndjson_path, e))?;
        ndjson.write_all(b"\n").map_err(|e| io_err(&ndjson_path, e))?;
        Ok(())
    }

    async fn load_learnings(&self) -> StateResult<Vec<Learning>> {
        let path = self.learnings_ndjson();
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&path, e)),
        };
        contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(|e| json_err(&path, e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Section, SectionStatus};
    use crate::store::traits::ProgressEntry;

    fn store() -> (tempfile::TempDir, FsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn project_roundtrip() {
        let (_dir, store) = store();
        let project = Project::new("p1", "demo", "Demo");
        store.save_project(&project).await.unwrap();
        let loaded = store.load_project("p1").await.unwrap().unwrap();
        assert_eq!(loaded.id, "p1");
        assert_eq!(loaded.status, ProjectStatus::Planning);
    }

    #[tokio::test]
    async fn missing_project_is_none_not_error() {
        let (_dir, store) = store();
        assert!(store.load_project("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn load_plan_merges_progress_onto_sections() {
        let (_dir, store) = store();
        let plan = Plan::new("p1", vec![Section::new("a", "A", "desc")]);
        store.save_plan("p1", &plan).await.unwrap();

        let snapshot = ProgressSnapshot {
            session_id: "s1".into(),
            status: crate::domain::SessionStatus::Running,
            phase: crate::domain::SessionPhase::Executing,
            total: 1,
            completed: 0,
            failed: 0,
            sections: vec![ProgressEntry {
                id: "a".into(),
                name: "A".into(),
                status: SectionStatus::Done,
                progress: 100,
                worker_id: Some("W1".into()),
                started_at: None,
                finished_at: None,
                last_error: None,
                worker_output: vec![],
                metrics: None,
            }],
        };
        store.save_progress("p1", &snapshot).await.unwrap();

        let loaded = store.load_plan(Some("p1")).await.unwrap().unwrap();
        let section = loaded.section("a").unwrap();
        assert_eq!(section.status, SectionStatus::Done);
        assert_eq!(section.progress, 100);
        assert_eq!(section.worker_id.as_deref(), Some("W1"));
    }

    #[tokio::test]
    async fn load_plan_without_project_id_picks_first_active_project() {
        let (_dir, store) = store();
        let mut planning = Project::new("p0", "planning", "Planning");
        planning.status = ProjectStatus::Planning;
        store.save_project(&planning).await.unwrap();
        store
            .save_plan("p0", &Plan::new("p0", vec![]))
            .await
            .unwrap();

        let mut ready = Project::new("p1", "ready", "Ready");
        ready.status = ProjectStatus::Ready;
        store.save_project(&ready).await.unwrap();
        store
            .save_plan("p1", &Plan::new("p1", vec![Section::new("x", "X", "d")]))
            .await
            .unwrap();

        let loaded = store.load_plan(None).await.unwrap().unwrap();
        assert_eq!(loaded.project_id, "p1");
    }

    #[tokio::test]
    async fn run_roundtrip_and_list() {
        let (_dir, store) = store();
        store.ensure_project_dir("p1").await.unwrap();
        let run = ExecutionRun::new("r1", "p1", "s1");
        store.create_run("p1", &run).await.unwrap();
        let loaded = store.get_run("p1", "r1").await.unwrap();
        assert_eq!(loaded.id, "r1");
        assert_eq!(store.list_runs("p1").await.unwrap().len(), 1);
        store.delete_run("p1", "r1").await.unwrap();
        assert!(store.list_runs("p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_run_missing_is_run_not_found() {
        let (_dir, store) = store();
        store.ensure_project_dir("p1").await.unwrap();
        let err = store.get_run("p1", "ghost").await.unwrap_err();
        assert!(matches!(err, StateError::RunNotFound { .. }));
    }

    #[tokio::test]
    async fn learnings_capture_is_appendable_and_loadable() {
        let (_dir, store) = store();
        let l1 = Learning::new("l1", "p1", "s1", "rule1");
        let l2 = Learning::new("l2", "p2", "s2", "rule2");
        store.capture_learning(&l1).await.unwrap();
        store.capture_learning(&l2).await.unwrap();

        let loaded = store.load_learnings().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "l1");
        assert_eq!(loaded[1].id, "l2");

        let md = std::fs::read_to_string(store.learnings_md()).unwrap();
        assert!(md.contains("## l1"));
        assert!(md.contains("## l2"));
    }

    #[tokio::test]
    async fn corrupted_json_surfaces_as_error() {
        let (dir, store) = store();
        let path = dir.path().join("projects").join("p1").join("project.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{not valid json").unwrap();
        let err = store.load_project("p1").await.unwrap_err();
        assert!(matches!(err, StateError::CorruptedJson { .. }));
    }
}
