//! Shared HTTP plumbing for adapters: settings, client construction, error mapping.

use crate::{Pricing, Throttle};
use serde_json::Value as JsonValue;
use sitesmith_error::{ProviderError, ProviderErrorKind};
use sitesmith_rate_limit::ProviderSettings;
use std::time::Duration;
use tracing::error;

/// Transport settings common to every adapter.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct AdapterSettings {
    /// Per-request timeout in seconds
    #[builder(default = "120")]
    timeout_secs: u64,
    /// Retry cap override (None uses the error's own strategy)
    #[builder(default, setter(into, strip_option))]
    max_retries: Option<usize>,
    /// Requests per minute throttle
    #[builder(default, setter(into, strip_option))]
    rpm: Option<u32>,
    /// Token pricing
    #[builder(default)]
    pricing: Pricing,
    /// Whether images are forwarded
    #[builder(default)]
    supports_vision: bool,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            max_retries: None,
            rpm: None,
            pricing: Pricing::default(),
            supports_vision: false,
        }
    }
}

impl AdapterSettings {
    /// Creates a new settings builder.
    pub fn builder() -> AdapterSettingsBuilder {
        AdapterSettingsBuilder::default()
    }

    /// Derive adapter settings from a provider's configuration section.
    pub fn from_provider_settings(settings: &ProviderSettings) -> Self {
        Self {
            timeout_secs: *settings.request_timeout_secs(),
            max_retries: *settings.max_retries(),
            rpm: *settings.rpm(),
            pricing: Pricing::new(
                *settings.cost_per_million_input_tokens(),
                *settings.cost_per_million_output_tokens(),
            ),
            supports_vision: *settings.supports_vision(),
        }
    }

    pub(crate) fn throttle(&self) -> Throttle {
        Throttle::per_minute(self.rpm)
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client, ProviderError> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| {
                ProviderError::new(ProviderErrorKind::InvalidRequest(format!(
                    "Failed to build HTTP client: {}",
                    e
                )))
            })
    }
}

/// Map a transport failure to a provider error.
#[track_caller]
pub(crate) fn transport_error(err: reqwest::Error) -> ProviderError {
    let kind = if err.is_timeout() {
        ProviderErrorKind::Timeout(err.to_string())
    } else if err.is_decode() {
        ProviderErrorKind::Parse(err.to_string())
    } else if err.is_builder() {
        ProviderErrorKind::InvalidRequest(err.to_string())
    } else {
        ProviderErrorKind::Connection(err.to_string())
    };
    ProviderError::new(kind)
}

/// Extract the most useful message from an error body.
///
/// Understands `{"error": {"message": ...}}`, `{"error": "..."}` and
/// `{"message": ...}`; anything else is returned verbatim.
pub(crate) fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<JsonValue>(body) else {
        return body.trim().to_string();
    };
    json.get("error")
        .and_then(|e| {
            e.get("message")
                .and_then(JsonValue::as_str)
                .or_else(|| e.as_str())
        })
        .or_else(|| json.get("message").and_then(JsonValue::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Map a non-success status and body to a provider error.
#[track_caller]
pub(crate) fn status_error(provider: &str, status: u16, body: &str) -> ProviderError {
    let message = error_message(body);
    error!(provider, status, message = %message, "Provider API returned error");
    ProviderError::new(ProviderErrorKind::Api {
        status_code: status,
        message,
    })
}
