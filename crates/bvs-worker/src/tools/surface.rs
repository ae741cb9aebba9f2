use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{WorkerError, WorkerResult};

use super::path::normalize_in_root;

const DENYLIST: &[&str] = &["rm", "del", "rmdir", "format", "dd", "mkfs"];
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
const READ_TRUNCATE_BYTES: usize = 256 * 1024;
const TRUNCATION_MARKER: &str = "\n...[truncated]...\n";
const OUTPUT_CAP_BYTES: usize = 10 * 1024 * 1024;
const OUTPUT_CAP_MARKER: &str = "\n...[output truncated]...\n";

fn cap_output(mut output: String) -> String {
    if output.len() > OUTPUT_CAP_BYTES {
        output.truncate(OUTPUT_CAP_BYTES);
        output.push_str(OUTPUT_CAP_MARKER);
    }
    output
}

/// One invocation of a named tool, as requested by the agent during a subtask.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    ReadFile { path: String },
    WriteFile { path: String, content: String },
    EditFile { path: String, old: String, new: String },
    ListFiles { path: String },
    RunCommand { program: String, args: Vec<String> },
    MarkComplete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCommandOutcome {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolOutcome {
    FileContents { content: String },
    Written { path: String },
    Edited { path: String },
    Listed { entries: Vec<String> },
    Command(RunCommandOutcome),
    Completed,
}

/// Executes tool calls confined to one worker's worktree directory.
pub struct WorktreeToolSurface {
    root: PathBuf,
    command_timeout: Duration,
    pub files_touched: Vec<String>,
}

impl WorktreeToolSurface {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            files_touched: Vec::new(),
        }
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub async fn apply(&mut self, call: ToolCall) -> WorkerResult<ToolOutcome> {
        match call {
            ToolCall::ReadFile { path } => self.read_file(&path).await,
            ToolCall::WriteFile { path, content } => self.write_file(&path, &content).await,
            ToolCall::EditFile { path, old, new } => self.edit_file(&path, &old, &new).await,
            ToolCall::ListFiles { path } => self.list_files(&path).await,
            ToolCall::RunCommand { program, args } => self.run_command(&program, &args).await,
            ToolCall::MarkComplete => Ok(ToolOutcome::Completed),
        }
    }

    async fn read_file(&self, path: &str) -> WorkerResult<ToolOutcome> {
        let resolved = normalize_in_root(&self.root, path)?;
        let bytes = tokio::fs::read(&resolved)
            .await
            .map_err(|e| WorkerError::Io {
                path: resolved.display().to_string(),
                source: e,
            })?;
        let mut content = String::from_utf8_lossy(&bytes).into_owned();
        if content.len() > READ_TRUNCATE_BYTES {
            content.truncate(READ_TRUNCATE_BYTES);
            content.push_str(TRUNCATION_MARKER);
        }
        Ok(ToolOutcome::FileContents { content })
    }

    async fn write_file(&mut self, path: &str, content: &str) -> WorkerResult<ToolOutcome> {
        let resolved = normalize_in_root(&self.root, path)?;
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WorkerError::Io {
                    path: parent.display().to_string(),
                    source: e,
                })?;
        }
        tokio::fs::write(&resolved, content)
            .await
            .map_err(|e| WorkerError::Io {
                path: resolved.display().to_string(),
                source: e,
            })?;
        self.files_touched.push(path.to_string());
        Ok(ToolOutcome::Written {
            path: path.to_string(),
        })
    }

    async fn edit_file(&mut self, path: &str, old: &str, new: &str) -> WorkerResult<ToolOutcome> {
        let resolved = normalize_in_root(&self.root, path)?;
        let contents = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| WorkerError::Io {
                path: resolved.display().to_string(),
                source: e,
            })?;
        let occurrences = contents.matches(old).count();
        if occurrences != 1 {
            return Err(WorkerError::NonUniqueEdit {
                path: path.to_string(),
                occurrences,
            });
        }
        let updated = contents.replacen(old, new, 1);
        tokio::fs::write(&resolved, updated)
            .await
            .map_err(|e| WorkerError::Io {
                path: resolved.display().to_string(),
                source: e,
            })?;
        self.files_touched.push(path.to_string());
        Ok(ToolOutcome::Edited {
            path: path.to_string(),
        })
    }

    async fn list_files(&self, path: &str) -> WorkerResult<ToolOutcome> {
        let resolved = normalize_in_root(&self.root, path)?;
        let mut read_dir = tokio::fs::read_dir(&resolved)
            .await
            .map_err(|e| WorkerError::Io {
                path: resolved.display().to_string(),
                source: e,
            })?;
        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| WorkerError::Io {
            path: resolved.display().to_string(),
            source: e,
        })? {
            entries.push(entry.file_name().to_string_lossy().into_owned());
        }
        entries.sort();
        Ok(ToolOutcome::Listed { entries })
    }

    async fn run_command(&self, program: &str, args: &[String]) -> WorkerResult<ToolOutcome> {
        if DENYLIST.contains(&program) {
            return Err(WorkerError::DangerousCommand {
                program: program.to_string(),
            });
        }

        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(&self.root);

        let output = tokio::time::timeout(self.command_timeout, cmd.output())
            .await
            .map_err(|_| WorkerError::CommandTimeout {
                program: program.to_string(),
                timeout_secs: self.command_timeout.as_secs(),
            })?
            .map_err(|e| WorkerError::Io {
                path: program.to_string(),
                source: e,
            })?;

        Ok(ToolOutcome::Command(RunCommandOutcome {
            status: output.status.code().unwrap_or(-1),
            stdout: cap_output(String::from_utf8_lossy(&output.stdout).into_owned()),
            stderr: cap_output(String::from_utf8_lossy(&output.stderr).into_owned()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(root: &std::path::Path) -> WorktreeToolSurface {
        WorktreeToolSurface::new(root.to_path_buf())
    }

    #[tokio::test]
    async fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = surface(dir.path());
        s.apply(ToolCall::WriteFile {
            path: "a.txt".into(),
            content: "hello".into(),
        })
        .await
        .unwrap();
        let out = s
            .apply(ToolCall::ReadFile { path: "a.txt".into() })
            .await
            .unwrap();
        match out {
            ToolOutcome::FileContents { content } => assert_eq!(content, "hello"),
            _ => panic!("expected file contents"),
        }
        assert_eq!(s.files_touched, vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn path_escape_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = surface(dir.path());
        let err = s
            .apply(ToolCall::WriteFile {
                path: "../escape.txt".into(),
                content: "x".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::PathEscaped { .. }));
    }

    #[tokio::test]
    async fn edit_requires_unique_match() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = surface(dir.path());
        s.apply(ToolCall::WriteFile {
            path: "a.txt".into(),
            content: "foo foo".into(),
        })
        .await
        .unwrap();
        let err = s
            .apply(ToolCall::EditFile {
                path: "a.txt".into(),
                old: "foo".into(),
                new: "bar".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::NonUniqueEdit { occurrences: 2, .. }));
    }

    #[tokio::test]
    async fn edit_applies_when_unique() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = surface(dir.path());
        s.apply(ToolCall::WriteFile {
            path: "a.txt".into(),
            content: "foo bar".into(),
        })
        .await
        .unwrap();
        s.apply(ToolCall::EditFile {
            path: "a.txt".into(),
            old: "foo".into(),
            new: "baz".into(),
        })
        .await
        .unwrap();
        let out = s
            .apply(ToolCall::ReadFile { path: "a.txt".into() })
            .await
            .unwrap();
        match out {
            ToolOutcome::FileContents { content } => assert_eq!(content, "baz bar"),
            _ => panic!("expected file contents"),
        }
    }

    #[tokio::test]
    async fn denylisted_command_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let s = surface(dir.path());
        let err = s
            .apply(ToolCall::RunCommand {
                program: "rm".into(),
                args: vec!["-rf".into(), ".".into()],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::DangerousCommand { .. }));
    }

    #[tokio::test]
    async fn run_command_executes_and_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let s = surface(dir.path());
        let out = s
            .apply(ToolCall::RunCommand {
                program: "echo".into(),
                args: vec!["hi".into()],
            })
            .await
            .unwrap();
        match out {
            ToolOutcome::Command(c) => {
                assert_eq!(c.status, 0);
                assert!(c.stdout.contains("hi"));
            }
            _ => panic!("expected command outcome"),
        }
    }

    #[tokio::test]
    async fn run_command_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let s = surface(dir.path()).with_command_timeout(Duration::from_millis(50));
        let err = s
            .apply(ToolCall::RunCommand {
                program: "sleep".into(),
                args: vec!["5".into()],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::CommandTimeout { .. }));
    }

    #[tokio::test]
    async fn list_files_returns_sorted_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = surface(dir.path());
        s.apply(ToolCall::WriteFile {
            path: "b.txt".into(),
            content: "".into(),
        })
        .await
        .unwrap();
        s.apply(ToolCall::WriteFile {
            path: "a.txt".into(),
            content: "".into(),
        })
        .await
        .unwrap();
        let out = s.apply(ToolCall::ListFiles { path: ".".into() }).await.unwrap();
        match out {
            ToolOutcome::Listed { entries } => assert_eq!(entries, vec!["a.txt", "b.txt"]),
            _ => panic!("expected listing"),
        }
    }
}
