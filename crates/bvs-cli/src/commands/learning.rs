use anyhow::{Context, Result};
use bvs_core::domain::Learning;
use bvs_core::store::LearningsLog;
use uuid::Uuid;

use crate::cli::LearningAction;
use crate::commands::render;

pub async fn run<St: LearningsLog>(store: &St, action: LearningAction, json: bool) -> Result<()> {
    match action {
        LearningAction::Capture { problem, solution, prevention_rule } => {
            let learning = Learning::new(format!("learn-{}", Uuid::new_v4()), problem, solution, prevention_rule);
            store.capture_learning(&learning).await.context("failed to capture learning")?;
            render(&learning, json, |l| l.to_markdown())
        }
        LearningAction::List => {
            let learnings = store.load_learnings().await.context("failed to load learnings")?;
            render(&learnings, json, |ls| {
                if ls.is_empty() {
                    return "no learnings captured".to_string();
                }
                ls.iter().map(Learning::to_markdown).collect::<Vec<_>>().join("\n")
            })
        }
    }
}
