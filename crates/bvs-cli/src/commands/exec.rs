use std::collections::BTreeSet;

use anyhow::{Context, Result};
use bvs_core::store::{LearningsLog, ProjectStore, RunLedger};
use bvs_orchestrator::{retry_section, select_sections, skip_section, Event, EventSink, Orchestrator};
use tokio::sync::mpsc;

use crate::cli::{ExecAction, ExecTarget};

/// Spawns a task that prints events as they arrive for the duration of one
/// exec subcommand, returning the sink to hand to the orchestrator and a
/// handle to join once that sink is dropped.
fn start_event_printer(session_id: &str, json: bool) -> (EventSink, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let sink = EventSink::new(session_id, tx);
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if json {
                if let Ok(line) = serde_json::to_string(&event) {
                    println!("{line}");
                }
            } else {
                println!("[{}] {:?}", event.timestamp.format("%H:%M:%S"), event.body);
            }
        }
    });
    (sink, handle)
}

pub async fn run<St>(orchestrator: &Orchestrator<St>, action: ExecAction, json: bool) -> Result<()>
where
    St: ProjectStore + RunLedger + LearningsLog + Send + Sync + 'static,
{
    match action {
        ExecAction::Start(target) => start(orchestrator, &target, json).await,
        ExecAction::StartSelected { target, section_ids } => {
            orchestrator
                .sessions()
                .with_session(&target.session_id, |entry| {
                    select_sections(entry, section_ids.into_iter().collect::<BTreeSet<_>>());
                })
                .await
                .context("failed to restrict execution to the given sections")?;
            start(orchestrator, &target, json).await
        }
        ExecAction::Pause { session_id } => {
            orchestrator.pause_execution(&session_id).await.context("failed to pause session")?;
            println!("paused {session_id}");
            Ok(())
        }
        ExecAction::Resume { session_id } => {
            orchestrator.resume_execution(&session_id).await.context("failed to resume session")?;
            println!("resumed {session_id}");
            Ok(())
        }
        ExecAction::Stop { session_id } => {
            orchestrator.stop_execution(&session_id).await;
            println!("cancellation requested for {session_id}");
            Ok(())
        }
        ExecAction::Retry { target, section_id } => {
            let (sink, printer) = start_event_printer(&target.session_id, json);
            let mut guard = orchestrator
                .sessions()
                .lock(&target.session_id)
                .await
                .context("failed to lock session")?;
            let agents = orchestrator.agents();
            retry_section(
                orchestrator.config(),
                agents.as_ref(),
                &sink,
                &mut guard,
                &section_id,
                &target.repo_root,
                &target.target_branch,
                &target.worktree_base,
            )
            .await
            .context("retry failed")?;
            drop(guard);
            drop(sink);
            printer.await.ok();
            println!("retried section {section_id}");
            Ok(())
        }
        ExecAction::Skip { session_id, section_id } => {
            orchestrator
                .sessions()
                .with_session(&session_id, |entry| skip_section(entry, &section_id))
                .await
                .context("failed to skip section")??;
            println!("skipped section {section_id}");
            Ok(())
        }
    }
}

async fn start<St>(orchestrator: &Orchestrator<St>, target: &ExecTarget, json: bool) -> Result<()>
where
    St: ProjectStore + RunLedger + LearningsLog + Send + Sync + 'static,
{
    let (sink, printer) = start_event_printer(&target.session_id, json);
    let result = orchestrator
        .start_execution(&target.session_id, &sink, &target.repo_root, &target.target_branch, &target.worktree_base)
        .await;
    drop(sink);
    printer.await.ok();
    result.context("execution did not complete cleanly")
}
