//! Argument parsing for the `bvs` command: one subcommand group per
//! host-call surface area (project, plan, session, exec, run, learning,
//! config).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bvs")]
#[command(author = "BVS")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build-Verify-Ship orchestrator CLI", long_about = None)]
pub struct Cli {
    /// Root directory of the state store (config.json, projects/, ...)
    #[arg(long, global = true, default_value = ".bvs")]
    pub store_root: PathBuf,

    /// Emit verbose (DEBUG) logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print command output as JSON instead of plain text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Project lifecycle
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Plan loading and approval
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },
    /// In-memory session lifecycle (scoped to this process invocation)
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Execution control
    Exec {
        #[command(subcommand)]
        action: ExecAction,
    },
    /// Execution run ledger
    Run {
        #[command(subcommand)]
        action: RunAction,
    },
    /// Learnings log
    Learning {
        #[command(subcommand)]
        action: LearningAction,
    },
    /// Orchestrator configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a new project
    Create {
        id: String,
        slug: String,
        name: String,
    },
    /// List all projects
    List,
    /// Show one project
    Get { id: String },
    /// Update a project's name/description
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a project
    Delete {
        id: String,
        /// Remove the project directory as well as the logical record
        #[arg(long)]
        physical: bool,
    },
}

#[derive(Subcommand)]
pub enum PlanAction {
    /// Load a plan from a JSON file and save it against a project
    Load {
        project_id: String,
        plan_path: PathBuf,
    },
    /// Approve the currently loaded plan for a project
    Approve { project_id: String },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Create a session from a project's approved plan
    Create { project_id: String },
    /// Restore a paused session from persisted progress
    Restore { project_id: String },
    /// List sessions live in this process
    List,
    /// Show one session
    Get { session_id: String },
    /// Delete a session
    Delete { session_id: String },
}

#[derive(Subcommand)]
pub enum ExecAction {
    /// Run the scheduler to completion, a pause boundary, or failure
    Start(ExecTarget),
    /// Run the scheduler restricted to a set of sections
    StartSelected {
        #[command(flatten)]
        target: ExecTarget,
        /// Section ids to restrict execution to
        #[arg(required = true)]
        section_ids: Vec<String>,
    },
    /// Pause a running session
    Pause { session_id: String },
    /// Resume a paused session
    Resume { session_id: String },
    /// Request cooperative cancellation
    Stop { session_id: String },
    /// Retry one failed section inline
    Retry {
        #[command(flatten)]
        target: ExecTarget,
        section_id: String,
    },
    /// Mark a failed section done, unblocking its dependents
    Skip {
        session_id: String,
        section_id: String,
    },
}

#[derive(clap::Args)]
pub struct ExecTarget {
    pub session_id: String,
    /// Working copy the worker executor and merge coordinator operate on
    #[arg(long)]
    pub repo_root: PathBuf,
    /// Branch merge points integrate into
    #[arg(long, default_value = "main")]
    pub target_branch: String,
    /// Directory worker worktrees are created under
    #[arg(long, default_value = ".bvs/worktrees")]
    pub worktree_base: PathBuf,
}

#[derive(Subcommand)]
pub enum RunAction {
    /// List runs recorded for a project
    List { project_id: String },
    /// Show one run
    Get { project_id: String, run_id: String },
    /// Delete a run record
    Delete { project_id: String, run_id: String },
}

#[derive(Subcommand)]
pub enum LearningAction {
    /// Capture a learning directly (outside the automatic limit-violation path)
    Capture {
        problem: String,
        solution: String,
        prevention_rule: String,
    },
    /// List all captured learnings
    List,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (defaults merged with config.json)
    Get,
    /// Set one top-level configuration field and persist it
    Set { field: String, value: String },
}
