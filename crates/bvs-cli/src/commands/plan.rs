use std::path::Path;

use anyhow::{Context, Result};
use bvs_core::domain::Plan;
use bvs_core::store::ProjectStore;

use crate::cli::PlanAction;
use crate::commands::render;

pub async fn run<St: ProjectStore>(store: &St, action: PlanAction, json: bool) -> Result<()> {
    match action {
        PlanAction::Load { project_id, plan_path } => {
            let plan = load_plan_file(&plan_path)?;
            store.save_plan(&project_id, &plan).await.context("failed to save plan")?;
            render(&plan, json, |p| format!("loaded plan for {} with {} sections", p.project_id, p.sections.len()))
        }
        PlanAction::Approve { project_id } => {
            let mut plan = store
                .load_plan(Some(&project_id))
                .await
                .context("failed to load plan")?
                .with_context(|| format!("no plan found for project {project_id}"))?;
            plan.approve();
            store.save_plan(&project_id, &plan).await.context("failed to save approved plan")?;
            render(&plan, json, |p| format!("approved plan for {}", p.project_id))
        }
    }
}

fn load_plan_file(path: &Path) -> Result<Plan> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read plan file: {path:?}"))?;
    serde_json::from_str(&content).with_context(|| format!("invalid plan JSON in {path:?}"))
}
