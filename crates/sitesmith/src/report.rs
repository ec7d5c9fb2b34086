//! Plain-text renderings of stored data for the CLI.

use sitesmith_core::{DailyUsage, GenerationRecord, Project, UsageSummary};
use sitesmith_pipeline::ProviderCheck;
use std::fmt::Write;

/// One line per project: id, status, update time, tokens, cost and name.
pub fn project_table(projects: &[Project]) -> String {
    let mut out = String::new();
    for project in projects {
        let _ = writeln!(
            out,
            "{}  {:<10} {}  {:>8} tokens  ${:<10.6} {}",
            project.id(),
            project.status(),
            project.updated_at().format("%Y-%m-%d %H:%M"),
            project.total_tokens(),
            project.total_cost(),
            project.name()
        );
    }
    out
}

/// A project header followed by its step records in run order.
pub fn project_detail(project: &Project, records: &[GenerationRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Project  {} ({})", project.id(), project.name());
    let _ = writeln!(out, "Owner    {}", project.owner_id());
    let _ = writeln!(out, "Status   {}", project.status());
    let _ = writeln!(
        out,
        "Mode     {}  provider {}",
        project.mode(),
        project.provider().as_deref().unwrap_or("-")
    );
    let _ = writeln!(
        out,
        "Usage    {} tokens, ${:.6}",
        project.total_tokens(),
        project.total_cost()
    );
    let _ = writeln!(
        out,
        "Artifact {}",
        project
            .generated_code()
            .as_ref()
            .map(|code| format!("{} bytes", code.len()))
            .unwrap_or_else(|| "none".to_string())
    );
    let _ = writeln!(out, "{:-<80}", "");
    if records.is_empty() {
        let _ = writeln!(out, "No step records");
    }
    for record in records {
        let _ = writeln!(
            out,
            "step {} {:<13} {:<9} {:<9} {:>6} tokens  ${:.6}  {}ms{}",
            record.step(),
            record.step_name(),
            record.provider(),
            record.status(),
            record.prompt_tokens() + record.completion_tokens(),
            record.cost(),
            record.duration_ms(),
            record
                .error()
                .as_deref()
                .map(|e| format!("  {}", e))
                .unwrap_or_default()
        );
    }
    out
}

/// Totals, then the per-provider split, then the daily split.
pub fn usage_report(summary: &UsageSummary, daily: &[DailyUsage]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Total    {} requests, {} in / {} out tokens, ${:.6}",
        summary.total_requests, summary.input_tokens, summary.output_tokens, summary.total_cost
    );
    if !summary.by_provider.is_empty() {
        let _ = writeln!(out, "By provider");
        for (provider, totals) in &summary.by_provider {
            let _ = writeln!(
                out,
                "  {:<9} {:>6} requests {:>10} tokens  ${:.6}",
                provider,
                totals.requests,
                totals.total_tokens(),
                totals.cost
            );
        }
    }
    if !daily.is_empty() {
        let _ = writeln!(out, "By day");
        for day in daily {
            let _ = writeln!(
                out,
                "  {}  {:>6} requests {:>10} tokens  ${:.6}",
                day.day,
                day.totals.requests,
                day.totals.total_tokens(),
                day.totals.cost
            );
        }
    }
    out
}

/// One line per checked provider.
pub fn check_report(checks: &[ProviderCheck]) -> String {
    let mut out = String::new();
    for check in checks {
        let verdict = match &check.error {
            None => format!("ok       {}ms", check.latency_ms),
            Some(error) => format!("FAILED   {}", error),
        };
        let _ = writeln!(out, "{:<9} {:<28} {}", check.id, check.model, verdict);
    }
    out
}
