//! Provider listing, usage and retention commands.

use chrono::{Duration, Utc};
use sitesmith::{
    ProviderRegistry, SitesmithConfig, SitesmithResult, check_report, open_store, usage_report,
};
use tracing::info;

/// Print configured providers in failover order, or check that each answers.
pub async fn list_providers(
    config: &SitesmithConfig,
    check: bool,
    timeout_secs: u64,
) -> SitesmithResult<()> {
    let registry = ProviderRegistry::from_config(config)?;
    let described = registry.describe();
    if described.is_empty() {
        println!("No providers configured. Set an API key environment variable, e.g. DEEPSEEK_API_KEY.");
        return Ok(());
    }
    if check {
        let checks = registry
            .check_all(std::time::Duration::from_secs(timeout_secs))
            .await;
        print!("{}", check_report(&checks));
        let failed = checks.iter().filter(|c| !c.is_ok()).count();
        println!("{} of {} providers answered", checks.len() - failed, checks.len());
        return Ok(());
    }
    for provider in &described {
        let pricing = provider
            .pricing
            .map(|p| {
                format!(
                    "${}/M in, ${}/M out",
                    p.input_per_million,
                    p.output_per_million
                )
            })
            .unwrap_or_else(|| "pricing unknown".to_string());
        println!(
            "{:<9} {:<18} {:<28} {}{}",
            provider.id,
            provider.label,
            provider.model,
            pricing,
            if provider.supports_vision { "  vision" } else { "" }
        );
    }
    Ok(())
}

/// Delete build logs and usage records past retention.
pub async fn run_cleanup(config: &SitesmithConfig, days: Option<u32>) -> SitesmithResult<()> {
    let days = days.unwrap_or(config.logging.retention_days);
    let cutoff = Utc::now() - Duration::days(i64::from(days));
    let store = open_store(config)?;

    let logs = store.cleanup_build_logs(cutoff).await?;
    let usage = store.cleanup_usage(cutoff).await?;
    info!(days, logs, usage, "Retention cleanup finished");
    println!("Removed {} build logs and {} usage records older than {} days", logs, usage, days);
    Ok(())
}

/// Print usage totals with per-provider and per-day breakdowns.
pub async fn show_usage(
    config: &SitesmithConfig,
    owner: Option<&str>,
    days: u32,
) -> SitesmithResult<()> {
    let store = open_store(config)?;
    let summary = store.usage_summary(owner).await?;
    let since = Utc::now() - Duration::days(i64::from(days));
    let daily = store.daily_usage(owner, since).await?;
    print!("{}", usage_report(&summary, &daily));
    Ok(())
}
