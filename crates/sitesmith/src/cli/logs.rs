//! Build log command handlers.

use super::commands::LogCommands;
use sitesmith::{SitesmithConfig, SitesmithResult, open_store};

/// Handle build log commands.
pub async fn handle_log_command(config: &SitesmithConfig, cmd: LogCommands) -> SitesmithResult<()> {
    let store = open_store(config)?;
    match cmd {
        LogCommands::Show { session } => {
            let Some(record) = store.get_build_log(&session).await? else {
                eprintln!("No build log for session '{}'", session);
                return Ok(());
            };
            println!(
                "Session {} [{}] project {}",
                record.session_id,
                record.status,
                record
                    .project_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
            println!("{:-<80}", "");
            for entry in &record.entries {
                println!(
                    "{:>8.2}s {:<8} {}",
                    entry.elapsed_ms as f64 / 1000.0,
                    entry.level,
                    entry.message
                );
            }
            println!("{:-<80}", "");
            println!(
                "{} entries, {} errors, {} warnings, {:.2}s",
                record.summary.total_entries,
                record.summary.errors,
                record.summary.warnings,
                record.summary.elapsed_sec
            );
        }
        LogCommands::Recent { limit } => {
            let records = store.recent_build_logs(limit).await?;
            for record in &records {
                println!(
                    "{}  {:<10} {:>8}ms  {}",
                    record.created_at.format("%Y-%m-%d %H:%M:%S"),
                    record.status,
                    record.duration_ms,
                    record.session_id
                );
            }
            println!("Total: {} logs", records.len());
        }
    }
    Ok(())
}
