//! Sitesmith - multi-provider website generation.
//!
//! Sitesmith turns a natural-language site description into a website
//! artifact by running an ordered pipeline of prompt steps against a pool of
//! LLM providers, with automatic failover, response caching, per-caller rate
//! limiting, artifact validation and a persisted build log per run.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sitesmith::{GenerationRequest, SitesmithConfig, build_orchestrator, open_store};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SitesmithConfig::load()?;
//!     let orchestrator = build_orchestrator(&config, open_store(&config)?)?;
//!
//!     let request = GenerationRequest::builder()
//!         .caller_id("cli")
//!         .description("A landing page for a neighbourhood bakery")
//!         .build()?;
//!     let outcome = orchestrator.generate(request).await?;
//!     println!("{}", outcome.artifact);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `sitesmith_error` - Error types
//! - `sitesmith_core` - Data model
//! - `sitesmith_interface` - Provider and storage traits
//! - `sitesmith_cache` - Ephemeral store and response cache
//! - `sitesmith_rate_limit` - Configuration and per-caller rate limiting
//! - `sitesmith_models` - Provider adapters
//! - `sitesmith_database` - SQLite persistence
//! - `sitesmith_pipeline` - Steps, failover, validation, logging and orchestration
//!
//! This crate re-exports everything for convenience.

mod bootstrap;
mod observability;
mod report;

pub use bootstrap::{EphemeralStores, build_orchestrator, completion_options, open_store};
pub use observability::{ObservabilityConfig, init_observability, init_observability_with_config};
pub use report::{check_report, project_detail, project_table, usage_report};

pub use sitesmith_cache::*;
pub use sitesmith_core::*;
pub use sitesmith_error::*;
pub use sitesmith_interface::*;
pub use sitesmith_rate_limit::*;

pub use sitesmith_database::SqliteProjectStore;
pub use sitesmith_models::{
    AnthropicClient, GeminiClient, OpenAiCompatibleClient, Pricing, build_provider,
};
pub use sitesmith_pipeline::{
    ArtifactCombiner, ArtifactExtractor, ArtifactKind, BuildLogger, BuildValidator,
    CleanupAction, Extraction, ExtractionMethod, GenerationMode, InMemoryProjectStore,
    LiveViewSettings, Orchestrator, PipelineOutput, PipelinePlan, PipelineRunner,
    PromptContext, ProviderCheck, ProviderChoice, ProviderDescription, ProviderRegistry,
    ProviderRouter, Step, ValidationReport, build_step_prompt, live_key,
};
