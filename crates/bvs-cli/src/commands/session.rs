use anyhow::{Context, Result};
use bvs_core::store::ProjectStore;
use bvs_orchestrator::Orchestrator;

use crate::cli::SessionAction;
use crate::commands::render;

pub async fn run<St>(orchestrator: &Orchestrator<St>, store: &St, action: SessionAction, json: bool) -> Result<()>
where
    St: ProjectStore + bvs_core::store::RunLedger + bvs_core::store::LearningsLog + Send + Sync + 'static,
{
    match action {
        SessionAction::Create { project_id } => {
            let project = store
                .load_project(&project_id)
                .await
                .context("failed to load project")?
                .with_context(|| format!("project not found: {project_id}"))?;
            let plan = store
                .load_plan(Some(&project_id))
                .await
                .context("failed to load plan")?
                .with_context(|| format!("no plan found for project {project_id}"))?;
            let session_id = orchestrator
                .sessions()
                .create_session_from_plan(&project, plan, &project.slug)
                .await
                .context("failed to create session")?;
            println!("{session_id}");
            Ok(())
        }
        SessionAction::Restore { project_id } => match orchestrator
            .sessions()
            .restore_session_from_progress(&project_id)
            .await
            .context("failed to restore session")?
        {
            Some(session_id) => {
                println!("{session_id}");
                Ok(())
            }
            None => {
                println!("no restorable session for project {project_id}");
                Ok(())
            }
        },
        SessionAction::List => {
            let ids = orchestrator.sessions().list_session_ids().await;
            render(&ids, json, |ids| {
                if ids.is_empty() {
                    "no sessions".to_string()
                } else {
                    ids.join("\n")
                }
            })
        }
        SessionAction::Get { session_id } => {
            let session = orchestrator
                .sessions()
                .snapshot_session(&session_id)
                .await
                .context("failed to snapshot session")?;
            render(&session, json, |s| format!("{s:#?}"))
        }
        SessionAction::Delete { session_id } => {
            orchestrator
                .sessions()
                .delete_session(&session_id)
                .await
                .context("failed to delete session")?;
            println!("deleted session {session_id}");
            Ok(())
        }
    }
}
