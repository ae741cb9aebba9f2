//! Typed configuration loaded from `<bvs-root>/config.json`.
//!
//! Every field carries a `serde(default)`, following the defaulted-config
//! convention already idiomatic to this stack: a partial or missing config
//! file degrades to documented defaults rather than an error.

use serde::{Deserialize, Serialize};

use crate::domain::ApprovalMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BvsConfig {
    pub max_workers: usize,
    pub max_iterations_per_subtask: u32,
    pub max_cost_per_subtask: f64,
    pub max_total_cost: f64,
    pub approval_mode: ApprovalMode,
    pub fix_loop_max_cycles: u32,
    pub fix_loop_same_failure_threshold: u32,
    pub should_threshold: f64,
    pub commands: CommandOverrides,
}

impl Default for BvsConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            max_iterations_per_subtask: 20,
            max_cost_per_subtask: 2.0,
            max_total_cost: 20.0,
            approval_mode: ApprovalMode::Unattended,
            fix_loop_max_cycles: 3,
            fix_loop_same_failure_threshold: 2,
            should_threshold: 0.8,
            commands: CommandOverrides::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandOverrides {
    pub typecheck: Option<Vec<String>>,
    pub lint: Option<Vec<String>>,
    pub tests: Option<Vec<String>>,
    pub build: Option<Vec<String>>,
}

impl Default for CommandOverrides {
    fn default() -> Self {
        Self {
            typecheck: None,
            lint: None,
            tests: None,
            build: None,
        }
    }
}

impl BvsConfig {
    /// Parse `config.json` contents. A missing file is handled by the
    /// caller (returns `Self::default()`); malformed JSON for a file that
    /// does exist is the only failure mode here.
    pub fn parse(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let cfg = BvsConfig::parse("{}").unwrap();
        assert_eq!(cfg.max_workers, 3);
        assert_eq!(cfg.fix_loop_max_cycles, 3);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let cfg = BvsConfig::parse(r#"{"max_workers": 5}"#).unwrap();
        assert_eq!(cfg.max_workers, 5);
        assert_eq!(cfg.max_total_cost, 20.0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(BvsConfig::parse("{not json").is_err());
    }
}
