//! Default agent wiring for a CLI invocation with no externally configured
//! code-generation, fix, or conflict-resolution backend bound in. A real
//! deployment binds its own [`AgentProvider`] at this same seam; this one
//! exists so every subcommand has something to drive.

use std::sync::Arc;

use async_trait::async_trait;
use bvs_merge::{ConflictContext, ConflictResolver};
use bvs_orchestrator::{AgentProvider, ScriptedAgentProvider};
use bvs_verify::NoopFixAgent;
use bvs_worker::ScriptedAgent;

/// Refuses every conflict. The safe default when no real resolver is wired
/// in: a merge point fails loudly rather than writing a guessed-at
/// resolution.
pub struct RefusingResolver;

#[async_trait]
impl ConflictResolver for RefusingResolver {
    async fn resolve(&self, _ctx: &ConflictContext) -> Option<String> {
        None
    }
}

pub fn scripted_agent_provider() -> Arc<dyn AgentProvider> {
    Arc::new(ScriptedAgentProvider {
        fast: Arc::new(ScriptedAgent::new(Vec::new(), "// written by the scripted stand-in agent\n")),
        slow: Arc::new(ScriptedAgent::new(Vec::new(), "// written by the scripted stand-in agent\n")),
        fix: Arc::new(NoopFixAgent),
        resolver: Arc::new(RefusingResolver),
    })
}
