//! `config.json` lives directly under the store root rather than behind a
//! `ProjectStore` method — it is read once at process start, not part of
//! the per-project persistence surface `FsStore` otherwise covers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bvs_core::BvsConfig;

use crate::cli::ConfigAction;
use crate::commands::render;

fn config_path(store_root: &Path) -> PathBuf {
    store_root.join("config.json")
}

/// Defaulted read: a missing or partial file degrades to [`BvsConfig::default`],
/// matching the field-level `serde(default)` this type already carries.
pub fn load(store_root: &Path) -> Result<BvsConfig> {
    let path = config_path(store_root);
    if !path.exists() {
        return Ok(BvsConfig::default());
    }
    let content = std::fs::read_to_string(&path).with_context(|| format!("failed to read {path:?}"))?;
    serde_json::from_str(&content).with_context(|| format!("invalid config JSON in {path:?}"))
}

fn save(store_root: &Path, cfg: &BvsConfig) -> Result<()> {
    std::fs::create_dir_all(store_root).context("failed to create store root")?;
    let path = config_path(store_root);
    let content = serde_json::to_string_pretty(cfg)?;
    std::fs::write(&path, content).with_context(|| format!("failed to write {path:?}"))
}

pub async fn run(store_root: &Path, action: ConfigAction, json: bool) -> Result<()> {
    match action {
        ConfigAction::Get => {
            let cfg = load(store_root)?;
            render(&cfg, json, |c| format!("{c:#?}"))
        }
        ConfigAction::Set { field, value } => {
            let mut cfg = load(store_root)?;
            set_field(&mut cfg, &field, &value)?;
            save(store_root, &cfg)?;
            render(&cfg, json, |c| format!("{c:#?}"))
        }
    }
}

fn set_field(cfg: &mut BvsConfig, field: &str, value: &str) -> Result<()> {
    match field {
        "max_workers" => cfg.max_workers = value.parse().context("max_workers must be an integer")?,
        "max_iterations_per_subtask" => {
            cfg.max_iterations_per_subtask = value.parse().context("max_iterations_per_subtask must be an integer")?
        }
        "max_cost_per_subtask" => cfg.max_cost_per_subtask = value.parse().context("max_cost_per_subtask must be a number")?,
        "max_total_cost" => cfg.max_total_cost = value.parse().context("max_total_cost must be a number")?,
        "fix_loop_max_cycles" => cfg.fix_loop_max_cycles = value.parse().context("fix_loop_max_cycles must be an integer")?,
        "fix_loop_same_failure_threshold" => {
            cfg.fix_loop_same_failure_threshold =
                value.parse().context("fix_loop_same_failure_threshold must be an integer")?
        }
        "should_threshold" => cfg.should_threshold = value.parse().context("should_threshold must be a number")?,
        "approval_mode" => {
            cfg.approval_mode = serde_json::from_value(serde_json::Value::String(value.to_string()))
                .context("approval_mode must be one of ATTENDED_SINGLE, ATTENDED_LEVEL, SEMI_ATTENDED, UNATTENDED")?
        }
        other => anyhow::bail!("unknown config field: {other}"),
    }
    Ok(())
}
