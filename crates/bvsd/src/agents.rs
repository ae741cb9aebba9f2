//! Default agent wiring for a daemon process with no externally configured
//! code-generation, fix, or conflict-resolution backend bound in. Mirrors
//! `bvs-cli`'s own seam — each host binds its own [`AgentProvider`]
//! independently rather than sharing one through a common crate.

use std::sync::Arc;

use async_trait::async_trait;
use bvs_merge::{ConflictContext, ConflictResolver};
use bvs_orchestrator::{AgentProvider, ScriptedAgentProvider};
use bvs_verify::NoopFixAgent;
use bvs_worker::ScriptedAgent;

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
