//! Layered TOML configuration.
//!
//! This module provides TOML-based configuration for the whole engine. The
//! configuration system supports:
//! - Bundled defaults (include_str! from sitesmith.toml)
//! - User overrides (./sitesmith.toml or ~/.config/sitesmith/sitesmith.toml)
//! - Automatic merging with user values taking precedence

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use sitesmith_core::ProviderId;
use sitesmith_error::{ConfigError, SitesmithError, SitesmithResult};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, instrument, warn};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../sitesmith.toml");

/// Pipeline-wide request settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GenerationSettings {
    /// Provider used when a request names none
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// System prompt override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Pause between steps, in milliseconds
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Deadline for one whole generation, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_step_delay_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    600
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: None,
            step_delay_ms: default_step_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Static failover priority.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FailoverSettings {
    /// Provider wire names, most preferred first
    #[serde(default = "default_order")]
    pub order: Vec<String>,
}

fn default_order() -> Vec<String> {
    ProviderId::priority_order()
        .iter()
        .map(|p| p.to_string())
        .collect()
}

impl Default for FailoverSettings {
    fn default() -> Self {
        Self {
            order: default_order(),
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheSettings {
    /// Whether provider responses are cached
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Entry lifetime in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    /// Prompt characters folded into the cache key (0 = whole prompt)
    #[serde(default = "default_prompt_prefix_chars")]
    pub prompt_prefix_chars: usize,
    /// In-memory store capacity
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_prompt_prefix_chars() -> usize {
    200
}

fn default_max_entries() -> usize {
    1000
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl(),
            prompt_prefix_chars: default_prompt_prefix_chars(),
            max_entries: default_max_entries(),
        }
    }
}

/// Per-caller request cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimitSettings {
    /// Requests allowed per period (0 disables the limit)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Period length in seconds
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
}

fn default_max_requests() -> u32 {
    100
}

fn default_period_secs() -> u64 {
    3600
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            period_secs: default_period_secs(),
        }
    }
}

/// Logging and build-log settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON-formatted logs
    #[serde(default)]
    pub json: bool,
    /// Entries kept in the live view
    #[serde(default = "default_live_view_cap")]
    pub live_view_cap: usize,
    /// Live view expiry in seconds
    #[serde(default = "default_live_view_ttl")]
    pub live_view_ttl_secs: u64,
    /// In-flight sessions whose live view is held in memory
    #[serde(default = "default_live_view_sessions")]
    pub live_view_sessions: usize,
    /// Age in days after which build logs and usage are cleaned up
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_live_view_cap() -> usize {
    100
}

fn default_live_view_ttl() -> u64 {
    3600
}

fn default_live_view_sessions() -> usize {
    256
}

fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            live_view_cap: default_live_view_cap(),
            live_view_ttl_secs: default_live_view_ttl(),
            live_view_sessions: default_live_view_sessions(),
            retention_days: default_retention_days(),
        }
    }
}

/// Durable store location.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatabaseSettings {
    /// Database path or URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "sitesmith.db".to_string()
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl DatabaseSettings {
    /// Database URL, with `DATABASE_URL` taking precedence over the file.
    pub fn resolved_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.url.clone())
    }
}

/// One provider's adapter settings and pricing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, derive_getters::Getters)]
pub struct ProviderSettings {
    /// Model identifier
    model: String,
    /// Environment variable holding the API key
    api_key_env: String,
    /// Endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    /// USD per million prompt tokens
    #[serde(default)]
    cost_per_million_input_tokens: f64,
    /// USD per million completion tokens
    #[serde(default)]
    cost_per_million_output_tokens: f64,
    /// Requests-per-minute throttle applied by the adapter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rpm: Option<u32>,
    /// Adapter-level retry cap override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_retries: Option<usize>,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    request_timeout_secs: u64,
    /// Whether the model accepts reference images
    #[serde(default)]
    supports_vision: bool,
}

fn default_request_timeout() -> u64 {
    120
}

impl ProviderSettings {
    /// API key from the configured environment variable, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct SitesmithConfig {
    /// Request settings
    #[serde(default)]
    pub generation: GenerationSettings,
    /// Failover order
    #[serde(default)]
    pub failover: FailoverSettings,
    /// Cache settings
    #[serde(default)]
    pub cache: CacheSettings,
    /// Per-caller rate limit
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Durable store
    #[serde(default)]
    pub database: DatabaseSettings,
    /// Provider settings keyed by provider wire name
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,
}

impl SitesmithConfig {
    /// Load configuration from a single TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> SitesmithResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                SitesmithError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                SitesmithError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Parse configuration layered over the bundled defaults from a TOML string.
    pub fn from_toml_str(toml: &str) -> SitesmithResult<Self> {
        Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| {
                SitesmithError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                SitesmithError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Load configuration with precedence: current dir > home dir > bundled defaults.
    #[instrument]
    pub fn load() -> SitesmithResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/sitesmith/sitesmith.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("sitesmith").required(false));

        builder
            .build()
            .map_err(|e| {
                SitesmithError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                SitesmithError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Settings for one provider.
    pub fn provider(&self, id: ProviderId) -> Option<&ProviderSettings> {
        self.providers.get(id.as_ref())
    }

    /// Failover order as provider ids.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown provider names.
    pub fn failover_order(&self) -> SitesmithResult<Vec<ProviderId>> {
        self.failover
            .order
            .iter()
            .map(|name| {
                ProviderId::from_str(name).map_err(|_| {
                    SitesmithError::from(ConfigError::new(format!(
                        "Unknown provider '{}' in failover order",
                        name
                    )))
                })
            })
            .collect()
    }

    /// Providers whose API key is present, in failover order.
    ///
    /// Entries under `[providers]` with unknown names are skipped with a warning.
    pub fn configured_providers(&self) -> Vec<(ProviderId, &ProviderSettings, String)> {
        for name in self.providers.keys() {
            if ProviderId::from_str(name).is_err() {
                warn!(provider = %name, "Ignoring unknown provider section");
            }
        }

        let order = self
            .failover_order()
            .unwrap_or_else(|_| ProviderId::priority_order().to_vec());
        let mut seen = Vec::new();
        order
            .into_iter()
            .chain(ProviderId::priority_order().iter().copied())
            .filter(|id| {
                if seen.contains(id) {
                    false
                } else {
                    seen.push(*id);
                    true
                }
            })
            .filter_map(|id| {
                let settings = self.provider(id)?;
                let key = settings.api_key()?;
                Some((id, settings, key))
            })
            .collect()
    }
}
