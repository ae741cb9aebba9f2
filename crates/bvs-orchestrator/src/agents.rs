//! The seam between the orchestrator and the three external-agent
//! contracts it drives: code generation (per model tier), fix-loop
//! diagnosis/repair, and merge conflict resolution. A host binds real
//! implementations at the edge (`bvsd`, `bvs-cli`); the orchestrator itself
//! only ever sees these trait objects.

use std::sync::Arc;

use bvs_core::domain::ModelTier;
use bvs_merge::ConflictResolver;
use bvs_verify::FixAgent;
use bvs_worker::CodeGenAgent;

pub trait AgentProvider: Send + Sync {
    fn code_gen_agent(&self, tier: ModelTier) -> Arc<dyn CodeGenAgent>;
    fn fix_agent(&self) -> Arc<dyn FixAgent>;
    fn conflict_resolver(&self) -> Arc<dyn ConflictResolver>;
}

/// Wires the same scripted stand-ins used across `bvs-worker`/`bvs-verify`
/// tests into one provider, for integration tests and for running a
/// session with no externally configured agent at all.
pub struct ScriptedAgentProvider {
    pub fast: Arc<dyn CodeGenAgent>,
    pub slow: Arc<dyn CodeGenAgent>,
    pub fix: Arc<dyn FixAgent>,
    pub resolver: Arc<dyn ConflictResolver>,
}

impl AgentProvider for ScriptedAgentProvider {
    fn code_gen_agent(&self, tier: ModelTier) -> Arc<dyn CodeGenAgent> {
        match tier {
            ModelTier::Fast => self.fast.clone(),
            ModelTier::Slow => self.slow.clone(),
        }
    }

    fn fix_agent(&self) -> Arc<dyn FixAgent> {
        self.fix.clone()
    }

    fn conflict_resolver(&self) -> Arc<dyn ConflictResolver> {
        self.resolver.clone()
    }
}
