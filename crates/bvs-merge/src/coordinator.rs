//! Merge-Point Coordinator: serial, deterministic-by-worker-id branch
//! integration with AI-assisted conflict resolution, gated by an
//! integration-wide quality check. Grounded on this codebase's rule-based
//! parallel-output merge, generalized from merging structured role outputs
//! in memory to merging git branches on disk via worktree-isolated workers.

use std::path::{Component, Path, PathBuf};

use bvs_core::CommandOverrides;
use bvs_verify::{run_quality_gate, QualityGateResult};

use crate::error::{MergeError, MergeResult};
use crate::git;
use crate::resolver::{validate_resolution, ConflictContext, ConflictResolver};

#[derive(Debug, Clone)]
pub struct CompletedWorker {
    pub section_id: String,
    pub worker_id: String,
    pub branch: String,
    pub section_description: String,
}

#[derive(Debug, Clone)]
pub struct ConflictRecord {
    pub worker_id: String,
    pub path: String,
    pub resolved: bool,
}

#[derive(Debug, Clone)]
pub struct MergePointResult {
    pub merged_worker_ids: Vec<String>,
    pub failed_worker_ids: Vec<String>,
    pub conflicts: Vec<ConflictRecord>,
    pub auto_resolved_count: u32,
    pub integration: Option<QualityGateResult>,
    pub errors: Vec<String>,
}

impl MergePointResult {
    pub fn succeeded(&self) -> bool {
        self.failed_worker_ids.is_empty() && self.integration.as_ref().map(|q| q.passed()).unwrap_or(true)
    }
}

fn branch_merge_message(branch: &str) -> String {
    format!("[BVS] Merge {branch}")
}

fn conflict_resolution_message(branch: &str) -> String {
    format!("[BVS] Merge {branch} with auto-resolved conflicts")
}

/// Reject absolute paths and any `..` component — the resolved file must
/// land back inside the repository the merge is running in.
fn confine(repo_root: &Path, relative: &str) -> MergeResult<PathBuf> {
    let candidate = Path::new(relative);
    let mut out = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => {
                return Err(MergeError::Git {
                    args: "path-confine".to_string(),
                    detail: format!("path escapes repository root: {relative}"),
                })
            }
        }
    }
    Ok(repo_root.join(out))
}

async fn read_conflicted_file(repo_root: &Path, relative: &str) -> Option<String> {
    let path = confine(repo_root, relative).ok()?;
    let content = tokio::fs::read_to_string(&path).await.ok()?;
    if content.is_empty() {
        None
    } else {
        Some(content)
    }
}

async fn resolve_worker_conflicts(
    repo_root: &Path,
    worker: &CompletedWorker,
    resolver: &dyn ConflictResolver,
) -> MergeResult<(Vec<ConflictRecord>, bool)> {
    let paths = git::conflicted_paths(repo_root).await?;
    let mut records = Vec::new();
    let mut all_resolved = true;

    for path in paths {
        let Some(content) = read_conflicted_file(repo_root, &path).await else {
            records.push(ConflictRecord {
                worker_id: worker.worker_id.clone(),
                path,
                resolved: false,
            });
            all_resolved = false;
            continue;
        };

        let ctx = ConflictContext {
            path: path.clone(),
            conflicted_content: content,
            target_branch: "HEAD".to_string(),
            incoming_branch: worker.branch.clone(),
            section_description: worker.section_description.clone(),
        };

        let resolved = resolver.resolve(&ctx).await.filter(|body| validate_resolution(body));

        match resolved {
            Some(body) => {
                let absolute = confine(repo_root, &path)?;
                tokio::fs::write(&absolute, body).await.map_err(|source| MergeError::Io {
                    path: absolute.display().to_string(),
                    source,
                })?;
                git::stage(repo_root, &path).await?;
                records.push(ConflictRecord {
                    worker_id: worker.worker_id.clone(),
                    path,
                    resolved: true,
                });
            }
            None => {
                records.push(ConflictRecord {
                    worker_id: worker.worker_id.clone(),
                    path,
                    resolved: false,
                });
                all_resolved = false;
            }
        }
    }

    Ok((records, all_resolved))
}

/// Run one merge point: integrate every completed worker's branch into
/// `target_branch` in deterministic worker-id order, then gate on an
/// integration-wide quality check.
pub async fn run_merge_point(
    repo_root: &Path,
    target_branch: &str,
    mut completed: Vec<CompletedWorker>,
    resolver: &dyn ConflictResolver,
    command_overrides: &CommandOverrides,
) -> MergeResult<MergePointResult> {
    completed.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));

    git::checkout(repo_root, target_branch).await?;

    let mut merged_worker_ids = Vec::new();
    let mut failed_worker_ids = Vec::new();
    let mut all_conflicts = Vec::new();
    let mut auto_resolved_count = 0u32;
    let mut errors = Vec::new();

    for worker in &completed {
        let clean = git::merge_no_ff(repo_root, &worker.branch, &branch_merge_message(&worker.branch)).await?;

        if clean {
            merged_worker_ids.push(worker.worker_id.clone());
            continue;
        }

        let (records, all_resolved) = resolve_worker_conflicts(repo_root, worker, resolver).await?;
        let resolved_count = records.iter().filter(|r| r.resolved).count() as u32;
        all_conflicts.extend(records);

        if !all_resolved {
            git::abort_merge(repo_root).await?;
            failed_worker_ids.push(worker.worker_id.clone());
            errors.push(format!("unresolvable conflicts merging {}", worker.branch));
            return Ok(MergePointResult {
                merged_worker_ids,
                failed_worker_ids,
                conflicts: all_conflicts,
                auto_resolved_count,
                integration: None,
                errors,
            });
        }

        auto_resolved_count += resolved_count;
        git::commit_if_staged(repo_root, &conflict_resolution_message(&worker.branch)).await?;
        merged_worker_ids.push(worker.worker_id.clone());
    }

    let integration = run_quality_gate(repo_root, command_overrides).await?;
    if !integration.passed() {
        errors.push("integration verification failed after merge".to_string());
    }

    Ok(MergePointResult {
        merged_worker_ids,
        failed_worker_ids,
        conflicts: all_conflicts,
        auto_resolved_count,
        integration: Some(integration),
        errors,
    })
}
