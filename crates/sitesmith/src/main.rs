//! Sitesmith CLI binary.
//!
//! This binary provides command-line access to Sitesmith's functionality:
//! - Generate a website from a description
//! - Inspect and check configured providers
//! - List, show and delete projects
//! - Read build logs and usage, and apply retention cleanup

use clap::Parser;
use sitesmith::{ObservabilityConfig, SitesmithConfig, init_observability_with_config};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{
        Cli, Commands, handle_log_command, handle_project_command, list_providers, run_cleanup,
        run_generate, show_usage,
    };

    // Environment before configuration, so API keys in .env are visible
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SitesmithConfig::from_file(path)?,
        None => SitesmithConfig::load()?,
    };

    init_observability_with_config(
        ObservabilityConfig::from_settings(&config.logging)
            .with_verbose(cli.verbose)
            .with_json_logs(cli.json_logs),
    )?;

    match cli.command {
        Commands::Generate(args) => run_generate(&config, args).await?,
        Commands::Providers { check, timeout } => list_providers(&config, check, timeout).await?,
        Commands::Project(project_cmd) => handle_project_command(&config, project_cmd).await?,
        Commands::Log(log_cmd) => handle_log_command(&config, log_cmd).await?,
        Commands::Cleanup { days } => run_cleanup(&config, days).await?,
        Commands::Usage { owner, days } => show_usage(&config, owner.as_deref(), days).await?,
    }

    Ok(())
}
