//! `generate` command handler.

use super::commands::GenerateArgs;
use sitesmith::{
    GenerationRequest, SitesmithConfig, SitesmithResult, build_orchestrator, open_store,
};
use sitesmith_error::ConfigError;

/// Run one generation and print or save the artifact.
pub async fn run_generate(config: &SitesmithConfig, args: GenerateArgs) -> SitesmithResult<()> {
    let orchestrator = build_orchestrator(config, open_store(config)?)?;

    let mut request = GenerationRequest::builder();
    request.caller_id(args.caller).description(args.description);
    if let Some(mode) = args.mode {
        request.mode(mode);
    }
    if let Some(provider) = args.provider {
        request.provider(provider);
    }
    if let Some(step) = args.step {
        request.step(step);
    }
    if let Some(project) = args.project {
        request.project_id(project);
    }
    if let Some(name) = args.name {
        request.name(name);
    }
    if let Some(website_type) = args.website_type {
        request.website_type(website_type);
    }
    if let Some(industry) = args.industry {
        request.industry(industry);
    }
    let request = request
        .build()
        .map_err(|e| ConfigError::new(format!("Invalid request: {}", e)))?;

    let outcome = match orchestrator.generate(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Generation failed [{}]: {}", e.code(), e.message());
            return Err(e.into());
        }
    };

    eprintln!("Project:  {}", outcome.project_id);
    eprintln!("Session:  {}", outcome.log_session_id);
    for step in &outcome.steps {
        eprintln!(
            "  step {} {:<13} {:<9} {:>6} tokens  ${:.6}{}",
            step.step,
            step.name,
            step.provider,
            step.tokens,
            step.cost,
            if step.cached { "  (cached)" } else { "" }
        );
    }
    eprintln!(
        "Total:    {} tokens, ${:.6}",
        outcome.total_tokens, outcome.total_cost
    );

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &outcome.artifact).await?;
            eprintln!("Wrote {} bytes to {}", outcome.artifact.len(), path.display());
        }
        None => println!("{}", outcome.artifact),
    }
    Ok(())
}
