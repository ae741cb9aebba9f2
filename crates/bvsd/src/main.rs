//! `bvsd`: a long-running host over one on-disk project store.
//!
//! Unlike `bvs-cli`, whose session lifecycle is scoped to a single process
//! invocation, a daemon is the natural home for a [`bvs_orchestrator::Orchestrator`]
//! whose `SessionRegistry` stays resident across many requests — sessions
//! live only in memory, and here that memory persists for as long as the
//! process runs. No transport (HTTP, gRPC, a socket) is wired in yet; this
//! binary initializes the same orchestrator a transport layer would sit in
//! front of and idles until told to stop.

mod agents;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bvs_core::store::FsStore;
use bvs_core::BvsConfig;
use bvs_orchestrator::Orchestrator;
use tracing::Level;

fn load_config(store_root: &Path) -> Result<BvsConfig> {
    let path = store_root.join("config.json");
    if !path.exists() {
        return Ok(BvsConfig::default());
    }
    let content = std::fs::read_to_string(&path).with_context(|| format!("failed to read {path:?}"))?;
    serde_json::from_str(&content).with_context(|| format!("invalid config JSON in {path:?}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    bvs_core::telemetry::init_tracing(false, Level::INFO);

    let store_root: PathBuf = std::env::var("BVS_STORE_ROOT").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(".bvs"));
    let cfg = load_config(&store_root).context("failed to load configuration")?;
    let store = Arc::new(FsStore::new(&store_root));
    let _orchestrator: Orchestrator<FsStore> = Orchestrator::new(store, agents::scripted_agent_provider(), cfg);

    tracing::info!(store_root = %store_root.display(), "bvsd initialized, awaiting shutdown signal");
    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    tracing::info!("bvsd shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn main_has_the_expected_signature() {
        // Compile-time check: #[tokio::main] expands `main` to a sync fn.
        let _: fn() -> anyhow::Result<()> = super::main;
    }
}
