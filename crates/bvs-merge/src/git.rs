//! Repository-level git operations for merge integration: checkout,
//! `--no-ff` merge, conflict enumeration, merge abort, and worktree/branch
//! cleanup. Grounded on the same `tokio::process::Command` shell-out idiom
//! `bvs-worker`'s git module uses, generalized from worktree/commit
//! operations to cross-branch merge operations.

use std::path::Path;

use tokio::process::Command;

use crate::error::MergeError;

async fn run_git(dir: &Path, args: &[&str]) -> Result<(bool, String, String), MergeError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| MergeError::Git {
            args: args.join(" "),
            detail: e.to_string(),
        })?;
    Ok((
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).trim().to_string(),
        String::from_utf8_lossy(&output.stderr).trim().to_string(),
    ))
}

pub async fn checkout(repo_root: &Path, branch: &str) -> Result<(), MergeError> {
    let (ok, _, stderr) = run_git(repo_root, &["checkout", branch]).await?;
    if !ok {
        return Err(MergeError::CheckoutFailed {
            branch: branch.to_string(),
            detail: stderr,
        });
    }
    Ok(())
}

/// `true` on a clean no-ff merge, `false` when conflicts were left staged.
pub async fn merge_no_ff(repo_root: &Path, branch: &str, message: &str) -> Result<bool, MergeError> {
    let (ok, _, _) = run_git(repo_root, &["merge", "--no-ff", "-m", message, branch]).await?;
    Ok(ok)
}

pub async fn conflicted_paths(repo_root: &Path) -> Result<Vec<String>, MergeError> {
    let (_, stdout, _) = run_git(repo_root, &["diff", "--name-only", "--diff-filter=U"]).await?;
    Ok(stdout.lines().map(str::to_string).filter(|l| !l.is_empty()).collect())
}

pub async fn stage(repo_root: &Path, path: &str) -> Result<(), MergeError> {
    run_git(repo_root, &["add", path]).await?;
    Ok(())
}

pub async fn abort_merge(repo_root: &Path) -> Result<(), MergeError> {
    run_git(repo_root, &["merge", "--abort"]).await?;
    Ok(())
}

/// `true` when something was actually committed (there was staged content).
pub async fn commit_if_staged(repo_root: &Path, message: &str) -> Result<bool, MergeError> {
    let (_, stdout, _) = run_git(repo_root, &["diff", "--cached", "--name-only"]).await?;
    if stdout.is_empty() {
        return Ok(false);
    }
    let (ok, _, stderr) = run_git(repo_root, &["commit", "-m", message]).await?;
    if !ok {
        return Err(MergeError::Git {
            args: "commit".to_string(),
            detail: stderr,
        });
    }
    Ok(true)
}

pub async fn remove_worktree(repo_root: &Path, worktree_path: &Path) {
    let _ = run_git(
        repo_root,
        &["worktree", "remove", "--force", &worktree_path.display().to_string()],
    )
    .await;
}

pub async fn delete_branch(repo_root: &Path, branch: &str) {
    let _ = run_git(repo_root, &["branch", "-D", branch]).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn run_sync(dir: &Path, args: &[&str]) -> bool {
        StdCommand::new("git").args(args).current_dir(dir).output().unwrap().status.success()
    }

    fn init_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_sync(dir.path(), &["init", "-b", "main"]);
        run_sync(dir.path(), &["config", "user.name", "test"]);
        run_sync(dir.path(), &["config", "user.email", "test@example.com"]);
        std::fs::write(dir.path().join("base.txt"), "base\n").unwrap();
        run_sync(dir.path(), &["add", "-A"]);
        run_sync(dir.path(), &["commit", "-m", "initial"]);
        dir
    }

    #[tokio::test]
    async fn clean_merge_reports_success() {
        let repo = init_repo();
        run_sync(repo.path(), &["checkout", "-b", "feature"]);
        std::fs::write(repo.path().join("feature.txt"), "feature\n").unwrap();
        run_sync(repo.path(), &["add", "-A"]);
        run_sync(repo.path(), &["commit", "-m", "add feature"]);
        run_sync(repo.path(), &["checkout", "main"]);

        let clean = merge_no_ff(repo.path(), "feature", "[BVS] merge feature").await.unwrap();
        assert!(clean);
        assert!(repo.path().join("feature.txt").exists());
    }

    #[tokio::test]
    async fn conflicting_merge_is_reported_and_abortable() {
        let repo = init_repo();
        run_sync(repo.path(), &["checkout", "-b", "feature"]);
        std::fs::write(repo.path().join("base.txt"), "feature change\n").unwrap();
        run_sync(repo.path(), &["add", "-A"]);
        run_sync(repo.path(), &["commit", "-m", "change base"]);
        run_sync(repo.path(), &["checkout", "main"]);
        std::fs::write(repo.path().join("base.txt"), "main change\n").unwrap();
        run_sync(repo.path(), &["add", "-A"]);
        run_sync(repo.path(), &["commit", "-m", "change base on main"]);

        let clean = merge_no_ff(repo.path(), "feature", "[BVS] merge feature").await.unwrap();
        assert!(!clean);
        let conflicts = conflicted_paths(repo.path()).await.unwrap();
        assert_eq!(conflicts, vec!["base.txt".to_string()]);

        abort_merge(repo.path()).await.unwrap();
        let conflicts_after_abort = conflicted_paths(repo.path()).await.unwrap();
        assert!(conflicts_after_abort.is_empty());
    }
}
