//! The code-generation agent interface: an async source of messages the
//! worker executor drives turn by turn, feeding back each tool's outcome
//! before asking for the next step.

use async_trait::async_trait;
use bvs_core::domain::ModelTier;

use crate::error::WorkerResult;
use crate::tools::ToolCall;

#[derive(Debug, Clone)]
pub struct AgentQuery {
    pub prompt: String,
    pub max_turns: u32,
    pub model: ModelTier,
}

/// One step the agent asks the executor to take.
#[derive(Debug, Clone)]
pub enum AgentStep {
    ToolUse(ToolCall),
    /// The agent has nothing further to do without having called
    /// `mark_complete` — treated as an implicit stop, not success.
    Done,
}

/// One entry of the running transcript fed back to the agent: the tool call
/// it previously requested and a human-readable outcome summary (errors are
/// flattened to their `Display` text — the agent only ever sees strings).
pub type TranscriptEntry = (ToolCall, Result<String, String>);

#[async_trait]
pub trait CodeGenAgent: Send + Sync {
    async fn next_step(
        &self,
        query: &AgentQuery,
        transcript: &[TranscriptEntry],
    ) -> WorkerResult<AgentStep>;
}

/// A deterministic stand-in used in tests and the legacy no-agent-configured
/// path: writes a placeholder body to every file named in the prompt's file
/// list, then marks the subtask complete.
pub struct ScriptedAgent {
    files: Vec<String>,
    body: String,
}

impl ScriptedAgent {
    pub fn new(files: Vec<String>, body: impl Into<String>) -> Self {
        Self {
            files,
            body: body.into(),
        }
    }
}

#[async_trait]
impl CodeGenAgent for ScriptedAgent {
    async fn next_step(
        &self,
        _query: &AgentQuery,
        transcript: &[TranscriptEntry],
    ) -> WorkerResult<AgentStep> {
        let step_index = transcript.len();
        if step_index < self.files.len() {
            Ok(AgentStep::ToolUse(ToolCall::WriteFile {
                path: self.files[step_index].clone(),
                content: self.body.clone(),
            }))
        } else {
            Ok(AgentStep::ToolUse(ToolCall::MarkComplete))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_agent_writes_each_file_then_completes() {
        let agent = ScriptedAgent::new(vec!["a.rs".into(), "b.rs".into()], "// stub");
        let query = AgentQuery {
            prompt: "do it".into(),
            max_turns: 5,
            model: ModelTier::Fast,
        };
        let step0 = agent.next_step(&query, &[]).await.unwrap();
        assert!(matches!(step0, AgentStep::ToolUse(ToolCall::WriteFile { .. })));
    }
}
