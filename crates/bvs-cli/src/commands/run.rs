use anyhow::{Context, Result};
use bvs_core::store::RunLedger;

use crate::cli::RunAction;
use crate::commands::render;

pub async fn run<St: RunLedger>(store: &St, action: RunAction, json: bool) -> Result<()> {
    match action {
        RunAction::List { project_id } => {
            let runs = store.list_runs(&project_id).await.context("failed to list runs")?;
            render(&runs, json, |rs| {
                if rs.is_empty() {
                    return "no runs".to_string();
                }
                rs.iter()
                    .map(|r| format!("{}\t{:?}\tstarted {}", r.id, r.status, r.started_at.to_rfc3339()))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        RunAction::Get { project_id, run_id } => {
            let run = store.get_run(&project_id, &run_id).await.context("failed to load run")?;
            render(&run, json, |r| format!("{r:#?}"))
        }
        RunAction::Delete { project_id, run_id } => {
            store.delete_run(&project_id, &run_id).await.context("failed to delete run")?;
            println!("deleted run {run_id}");
            Ok(())
        }
    }
}
