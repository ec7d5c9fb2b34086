//! Project command handlers.

use super::commands::ProjectCommands;
use sitesmith::{
    ProjectQuery, ProjectStatus, SitesmithConfig, SitesmithResult, open_store, project_detail,
    project_table,
};
use sitesmith_error::ConfigError;
use std::str::FromStr;
use tracing::info;

/// Handle project commands.
pub async fn handle_project_command(
    config: &SitesmithConfig,
    cmd: ProjectCommands,
) -> SitesmithResult<()> {
    let store = open_store(config)?;
    match cmd {
        ProjectCommands::List {
            owner,
            status,
            limit,
            offset,
        } => {
            let mut query = ProjectQuery::default().with_page(limit, offset);
            query.owner_id = owner;
            if let Some(status) = status {
                let status = ProjectStatus::from_str(&status)
                    .map_err(|_| ConfigError::new(format!("Unknown project status '{}'", status)))?;
                query = query.with_status(status);
            }
            let total = store.count_projects(query.owner_id.as_deref()).await?;
            let projects = store.list_projects(query).await?;
            print!("{}", project_table(&projects));
            println!("Showing {} of {} projects", projects.len(), total);
        }
        ProjectCommands::Show { id } => {
            let Some(project) = store.get_project(id).await? else {
                eprintln!("No project with id {}", id);
                return Ok(());
            };
            let records = store.list_step_records(id).await?;
            print!("{}", project_detail(&project, &records));
        }
        ProjectCommands::Delete { id } => {
            if store.delete_project(id).await? {
                info!(%id, "Project deleted");
                println!("Deleted project {}", id);
            } else {
                eprintln!("No project with id {}", id);
            }
        }
    }
    Ok(())
}
