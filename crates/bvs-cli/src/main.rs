//! `bvs`: the command-line host-call surface over one on-disk project
//! store. Each invocation is a fresh process — since a [`SessionEntry`]
//! (bvs_orchestrator::session) lives only in memory, `session`/`exec`
//! subcommands restore or create the session they need within the same
//! invocation that acts on it rather than assuming one persists across
//! separate `bvs` calls. A long-lived registry across calls is `bvsd`'s
//! job, not this binary's.

mod agents;
mod cli;
mod commands;

use std::sync::Arc;

use anyhow::{Context, Result};
use bvs_core::store::FsStore;
use bvs_orchestrator::Orchestrator;
use clap::Parser;
use cli::{Cli, Commands};
use tracing::Level;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    bvs_core::telemetry::init_tracing(cli.json, level);

    let store = Arc::new(FsStore::new(&cli.store_root));

    match cli.command {
        Commands::Project { action } => commands::project::run(store.as_ref(), action, cli.json).await,
        Commands::Plan { action } => commands::plan::run(store.as_ref(), action, cli.json).await,
        Commands::Run { action } => commands::run::run(store.as_ref(), action, cli.json).await,
        Commands::Learning { action } => commands::learning::run(store.as_ref(), action, cli.json).await,
        Commands::Config { action } => commands::config::run(&cli.store_root, action, cli.json).await,
        Commands::Session { action } => {
            let orchestrator = build_orchestrator(&cli.store_root, store.clone())?;
            commands::session::run(&orchestrator, store.as_ref(), action, cli.json).await
        }
        Commands::Exec { action } => {
            let orchestrator = build_orchestrator(&cli.store_root, store.clone())?;
            commands::exec::run(&orchestrator, action, cli.json).await
        }
    }
}

fn build_orchestrator(store_root: &std::path::Path, store: Arc<FsStore>) -> Result<Orchestrator<FsStore>> {
    let cfg = commands::config::load(store_root).context("failed to load configuration")?;
    Ok(Orchestrator::new(store, agents::scripted_agent_provider(), cfg))
}
