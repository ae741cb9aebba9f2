//! Domain model, state store, dependency graph, and complexity analyzer for BVS.
//!
//! This crate has no dependency on any other BVS crate — it is the shared
//! vocabulary that `bvs-worker`, `bvs-merge`, `bvs-verify` and
//! `bvs-orchestrator` all build on.

pub mod complexity;
pub mod config;
pub mod domain;
pub mod error;
pub mod graph;
pub mod store;
pub mod telemetry;

pub use config::{BvsConfig, CommandOverrides};
pub use error::{GraphError, GraphResult, StateError, StateResult};
pub use graph::DependencyGraph;
