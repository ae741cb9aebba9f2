use anyhow::{Context, Result};
use bvs_core::domain::Project;
use bvs_core::store::ProjectStore;

use crate::cli::ProjectAction;
use crate::commands::render;

pub async fn run<St: ProjectStore>(store: &St, action: ProjectAction, json: bool) -> Result<()> {
    match action {
        ProjectAction::Create { id, slug, name } => {
            let project = Project::new(&id, &slug, &name);
            store.ensure_project_dir(&id).await.context("failed to create project directory")?;
            store.save_project(&project).await.context("failed to save project")?;
            render(&project, json, |p| format!("created project {} ({})", p.id, p.name))
        }
        ProjectAction::List => {
            let projects = store.list_projects().await.context("failed to list projects")?;
            render(&projects, json, |ps| {
                if ps.is_empty() {
                    return "no projects".to_string();
                }
                ps.iter()
                    .map(|p| format!("{}\t{}\t{:?}", p.id, p.name, p.status))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        ProjectAction::Get { id } => {
            let project = store
                .load_project(&id)
                .await
                .context("failed to load project")?
                .with_context(|| format!("project not found: {id}"))?;
            render(&project, json, |p| format!("{p:#?}"))
        }
        ProjectAction::Update { id, name, description } => {
            let mut project = store
                .load_project(&id)
                .await
                .context("failed to load project")?
                .with_context(|| format!("project not found: {id}"))?;
            if let Some(name) = name {
                project.name = name;
            }
            if let Some(description) = description {
                project.description = Some(description);
            }
            project.updated_at = chrono::Utc::now();
            store.save_project(&project).await.context("failed to save project")?;
            render(&project, json, |p| format!("updated project {}", p.id))
        }
        ProjectAction::Delete { id, physical } => {
            store
                .delete_project(&id, physical)
                .await
                .context("failed to delete project")?;
            println!("deleted project {id}");
            Ok(())
        }
    }
}
