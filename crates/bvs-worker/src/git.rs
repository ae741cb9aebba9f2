//! Worker-side git operations: worktree creation and per-subtask commits.
//! Grounded on this codebase's `git.rs` shell-out pattern, ported to
//! `tokio::process::Command` so a worker suspends cleanly while git runs.

use std::path::Path;

use tokio::process::Command;

use crate::error::{WorkerError, WorkerResult};

async fn run_git(dir: &Path, args: &[&str]) -> WorkerResult<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| WorkerError::Git(format!("failed to run git {args:?}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(WorkerError::Git(format!("git {args:?} failed: {stderr}")));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `git worktree add -b <branch> <path> <base>`.
pub async fn worktree_add(repo_root: &Path, path: &Path, branch: &str, base: &str) -> WorkerResult<()> {
    run_git(
        repo_root,
        &[
            "worktree",
            "add",
            "-b",
            branch,
            &path.display().to_string(),
            base,
        ],
    )
    .await?;
    Ok(())
}

/// Stage every change in `worktree_path` and commit with `message`.
/// Returns `None` when there was nothing to commit.
pub async fn commit_all(worktree_path: &Path, message: &str) -> WorkerResult<Option<String>> {
    run_git(worktree_path, &["add", "-A"]).await?;

    let status = run_git(worktree_path, &["status", "--porcelain"]).await?;
    if status.is_empty() {
        return Ok(None);
    }

    run_git(worktree_path, &["commit", "-m", message]).await?;
    let sha = run_git(worktree_path, &["rev-parse", "HEAD"]).await?;
    Ok(Some(sha))
}

pub async fn rev_parse_head(dir: &Path) -> WorkerResult<String> {
    run_git(dir, &["rev-parse", "HEAD"]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn run_sync(dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git").args(args).current_dir(dir).output().unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn init_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_sync(dir.path(), &["init", "-b", "main"]);
        run_sync(dir.path(), &["config", "user.name", "test"]);
        run_sync(dir.path(), &["config", "user.email", "test@example.com"]);
        run_sync(dir.path(), &["commit", "--allow-empty", "-m", "initial"]);
        dir
    }

    #[tokio::test]
    async fn worktree_add_creates_a_new_branch_checkout() {
        let repo = init_repo();
        let wt_path = repo.path().join("../wt-a");
        let wt_path = wt_path.canonicalize().unwrap_or(wt_path);
        worktree_add(repo.path(), &wt_path, "bvs-worker-W1", "main")
            .await
            .unwrap();
        assert!(wt_path.join(".git").exists());
        run_sync(&wt_path, &["rev-parse", "--abbrev-ref", "HEAD"]);
        let _ = std::fs::remove_dir_all(&wt_path);
    }

    #[tokio::test]
    async fn commit_all_returns_none_when_nothing_changed() {
        let repo = init_repo();
        let sha = commit_all(repo.path(), "empty").await.unwrap();
        assert!(sha.is_none());
    }

    #[tokio::test]
    async fn commit_all_commits_new_file() {
        let repo = init_repo();
        std::fs::write(repo.path().join("new.txt"), "content").unwrap();
        let sha = commit_all(repo.path(), "add new.txt").await.unwrap();
        assert!(sha.is_some());
        let head = rev_parse_head(repo.path()).await.unwrap();
        assert_eq!(sha.unwrap(), head);
    }
}
