//! Wiring an [`Orchestrator`] from configuration.

use sitesmith_cache::{MemoryStore, MemoryStoreConfig, ResponseCache, ResponseCacheConfig};
use sitesmith_core::CompletionOptions;
use sitesmith_database::SqliteProjectStore;
use sitesmith_error::{ConfigError, SitesmithResult};
use sitesmith_interface::ProjectStore;
use sitesmith_pipeline::{LiveViewSettings, Orchestrator, ProviderRegistry};
use sitesmith_rate_limit::{CallerRateLimiter, SitesmithConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Open the configured SQLite store, applying migrations.
///
/// # Errors
///
/// Returns a storage error if the database cannot be opened or migrated.
#[instrument(skip(config))]
pub fn open_store(config: &SitesmithConfig) -> SitesmithResult<Arc<dyn ProjectStore>> {
    let url = config.database.resolved_url();
    let store = SqliteProjectStore::connect(&url)?;
    info!(url = %url, "Opened project store");
    Ok(Arc::new(store))
}

/// Provider call options from the `[generation]` section.
///
/// # Errors
///
/// Returns a configuration error if the options cannot be built.
pub fn completion_options(config: &SitesmithConfig) -> SitesmithResult<CompletionOptions> {
    let generation = &config.generation;
    let mut builder = CompletionOptions::builder();
    builder
        .temperature(generation.temperature)
        .max_tokens(generation.max_tokens);
    if let Some(prompt) = &generation.system_prompt {
        builder.system_prompt(prompt.as_str());
    }
    Ok(builder
        .build()
        .map_err(|e| ConfigError::new(format!("Invalid generation options: {}", e)))?)
}

/// In-process stores backing the live log view and the response cache.
///
/// Kept apart so response churn cannot evict an in-flight session's view.
#[derive(Debug, Clone)]
pub struct EphemeralStores {
    /// Live log views, one entry per in-flight session
    pub live: Arc<MemoryStore>,
    /// Cached provider responses
    pub responses: Arc<MemoryStore>,
}

impl EphemeralStores {
    /// Size both stores from the `[logging]` and `[cache]` sections.
    pub fn from_config(config: &SitesmithConfig) -> Self {
        Self {
            live: Arc::new(MemoryStore::new(
                MemoryStoreConfig::default().with_max_entries(config.logging.live_view_sessions),
            )),
            responses: Arc::new(MemoryStore::new(
                MemoryStoreConfig::default().with_max_entries(config.cache.max_entries),
            )),
        }
    }
}

/// Build an orchestrator over `store` from `config`.
///
/// Providers without an API key in the environment are left out.
///
/// # Errors
///
/// Returns a configuration error for an invalid failover order or options.
#[instrument(skip(config, store))]
pub fn build_orchestrator(
    config: &SitesmithConfig,
    store: Arc<dyn ProjectStore>,
) -> SitesmithResult<Orchestrator> {
    let registry = ProviderRegistry::from_config(config)?;
    let EphemeralStores { live, responses } = EphemeralStores::from_config(config);

    let mut orchestrator = Orchestrator::new(
        registry,
        store,
        live,
        CallerRateLimiter::new(config.rate_limit),
    )?
    .with_options(completion_options(config)?)
    .with_step_delay(Duration::from_millis(config.generation.step_delay_ms))
    .with_timeout(Duration::from_secs(config.generation.timeout_secs))
    .with_live_view(LiveViewSettings::from(&config.logging));

    if config.cache.enabled {
        let cache_config = ResponseCacheConfig::default()
            .with_ttl_secs(config.cache.ttl_secs)
            .with_prompt_prefix_chars(config.cache.prompt_prefix_chars)
            .with_enabled(true);
        orchestrator = orchestrator.with_cache(ResponseCache::new(responses, cache_config));
    }

    info!(
        providers = ?orchestrator.registry().configured(),
        cache = config.cache.enabled,
        "Orchestrator ready"
    );
    Ok(orchestrator)
}
