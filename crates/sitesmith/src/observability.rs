//! Tracing subscriber setup for the CLI.

use sitesmith_error::{ConfigError, SitesmithResult};
use sitesmith_rate_limit::LoggingSettings;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// How log lines are filtered and rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// Name attached to the startup line
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// One JSON object per line instead of human-readable text
    pub json_logs: bool,
}

impl ObservabilityConfig {
    /// Text output at `info`.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Start from the `[logging]` section of the configuration.
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self::default()
            .with_log_level(settings.level.clone())
            .with_json_logs(settings.json)
    }

    /// Replace the filter directive.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Force `debug` regardless of the configured level.
    pub fn with_verbose(self, verbose: bool) -> Self {
        if verbose {
            self.with_log_level("debug")
        } else {
            self
        }
    }

    /// Switch JSON output on. Never switches it off once the config asked for it.
    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs |= enabled;
        self
    }

    fn filter(&self) -> SitesmithResult<EnvFilter> {
        let directive = std::env::var("RUST_LOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| self.log_level.clone());
        EnvFilter::try_new(&directive).map_err(|e| {
            ConfigError::new(format!("Invalid log filter '{}': {}", directive, e)).into()
        })
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"))
    }
}

/// Install the subscriber with default settings.
pub fn init_observability() -> SitesmithResult<()> {
    init_observability_with_config(ObservabilityConfig::default())
}

/// Install the subscriber. Output goes to stderr so stdout stays free for artifacts.
///
/// `RUST_LOG` wins over [`ObservabilityConfig::log_level`] when set.
///
/// # Errors
///
/// Fails on an unparsable filter or when a global subscriber is already set.
pub fn init_observability_with_config(config: ObservabilityConfig) -> SitesmithResult<()> {
    let filter = config.filter()?;

    let output = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_level(true);
    let output = if config.json_logs {
        output.json().with_target(true).boxed()
    } else {
        output.with_target(false).compact().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .map_err(|e| ConfigError::new(format!("Logging already initialized: {}", e)))?;

    tracing::debug!(
        service = %config.service_name,
        level = %config.log_level,
        json = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_configured_level() {
        let settings = LoggingSettings::default();
        let config = ObservabilityConfig::from_settings(&settings).with_verbose(true);
        assert_eq!(config.log_level, "debug");

        let config = ObservabilityConfig::from_settings(&settings).with_verbose(false);
        assert_eq!(config.log_level, settings.level);
    }

    #[test]
    fn test_json_flag_is_sticky() {
        let config = ObservabilityConfig::default()
            .with_json_logs(true)
            .with_json_logs(false);
        assert!(config.json_logs);
    }
}
