//! Configured provider adapters, built once per orchestrator.

use futures::future::join_all;
use serde::Serialize;
use sitesmith_core::{CompletionOptions, ProviderId};
use sitesmith_error::{GenerationError, GenerationErrorKind, GenerationResult, SitesmithResult};
use sitesmith_interface::CompletionProvider;
use sitesmith_models::{Pricing, build_provider};
use sitesmith_rate_limit::SitesmithConfig;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const CHECK_PROMPT: &str = "Reply with the single word OK.";

/// Listing entry for one configured provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderDescription {
    /// Provider id
    pub id: ProviderId,
    /// Human-facing name
    pub label: String,
    /// Model served
    pub model: String,
    /// Whether images are forwarded
    pub supports_vision: bool,
    /// Token pricing, when known
    pub pricing: Option<Pricing>,
}

/// Result of sending one small completion to a configured provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderCheck {
    /// Provider id
    pub id: ProviderId,
    /// Model served
    pub model: String,
    /// Wall time of the call
    pub latency_ms: u64,
    /// Tokens billed for the call
    pub tokens: u64,
    /// Failure message, `None` when the provider answered
    pub error: Option<String>,
}

impl ProviderCheck {
    /// Whether the provider answered with a completion.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of resolving the preferred provider for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderChoice {
    /// Provider placed first in the candidate list
    pub provider: ProviderId,
    /// Why the requested provider was not used, if it was not
    pub fallback_reason: Option<String>,
}

/// Provider adapters keyed by id, plus the static failover priority.
///
/// # Examples
///
/// ```
/// use sitesmith_core::ProviderId;
/// use sitesmith_pipeline::ProviderRegistry;
///
/// let registry = ProviderRegistry::new(ProviderId::priority_order().to_vec());
/// assert!(registry.is_empty());
/// assert!(registry.candidates(Some(ProviderId::Claude)).is_empty());
/// ```
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn CompletionProvider>>,
    pricing: HashMap<ProviderId, Pricing>,
    order: Vec<ProviderId>,
    default_provider: Option<ProviderId>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("configured", &self.configured())
            .field("default_provider", &self.default_provider)
            .finish()
    }
}

impl ProviderRegistry {
    /// Empty registry with the given failover priority.
    pub fn new(order: Vec<ProviderId>) -> Self {
        Self {
            providers: HashMap::new(),
            pricing: HashMap::new(),
            order,
            default_provider: None,
        }
    }

    /// Set the provider used when a request names none.
    pub fn with_default(mut self, provider: ProviderId) -> Self {
        self.default_provider = Some(provider);
        self
    }

    /// Build adapters for every provider whose API key is present.
    ///
    /// A provider whose adapter cannot be constructed is skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the failover order names an unknown provider.
    pub fn from_config(config: &SitesmithConfig) -> SitesmithResult<Self> {
        let mut registry = Self::new(config.failover_order()?);
        match ProviderId::from_str(&config.generation.default_provider) {
            Ok(id) => registry.default_provider = Some(id),
            Err(_) => warn!(
                provider = %config.generation.default_provider,
                "Unknown default provider, falling back to failover order"
            ),
        }

        for (id, settings, api_key) in config.configured_providers() {
            match build_provider(id, settings, api_key) {
                Ok(provider) => {
                    registry.pricing.insert(
                        id,
                        Pricing::new(
                            *settings.cost_per_million_input_tokens(),
                            *settings.cost_per_million_output_tokens(),
                        ),
                    );
                    registry.register(provider);
                }
                Err(e) => warn!(provider = %id, error = %e, "Skipping provider"),
            }
        }
        info!(providers = ?registry.configured(), "Provider registry ready");
        Ok(registry)
    }

    /// Add or replace an adapter, keyed by its provider id.
    pub fn register(&mut self, provider: Arc<dyn CompletionProvider>) {
        let id = provider.provider_id();
        if !self.order.contains(&id) {
            self.order.push(id);
        }
        self.providers.insert(id, provider);
    }

    /// Adapter for `id`.
    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn CompletionProvider>> {
        self.providers.get(&id).cloned()
    }

    /// Whether no provider is configured.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Number of configured providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Configured providers in failover order.
    pub fn configured(&self) -> Vec<ProviderId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.providers.contains_key(id))
            .collect()
    }

    /// Candidate adapters: the preferred provider first, then the failover order.
    ///
    /// Only configured providers appear, each once.
    pub fn candidates(
        &self,
        preferred: Option<ProviderId>,
    ) -> Vec<(ProviderId, Arc<dyn CompletionProvider>)> {
        let mut ids: Vec<ProviderId> = Vec::with_capacity(self.order.len() + 1);
        for id in preferred.into_iter().chain(self.order.iter().copied()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids.into_iter()
            .filter_map(|id| self.get(id).map(|p| (id, p)))
            .collect()
    }

    /// Pick the provider to try first for a request.
    ///
    /// The requested provider wins when configured, then the default
    /// provider, then the first configured provider in failover order.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationErrorKind::NoProvidersAvailable`] when nothing is configured.
    pub fn resolve_preferred(&self, requested: Option<&str>) -> GenerationResult<ProviderChoice> {
        let Some(first) = self.configured().first().copied() else {
            return Err(GenerationError::new(
                GenerationErrorKind::NoProvidersAvailable,
            ));
        };

        let requested = requested.map(str::trim).filter(|r| !r.is_empty());
        let mut reason = None;
        if let Some(name) = requested {
            match ProviderId::from_str(name) {
                Ok(id) if self.providers.contains_key(&id) => {
                    return Ok(ProviderChoice {
                        provider: id,
                        fallback_reason: None,
                    });
                }
                Ok(id) => reason = Some(format!("Provider '{}' is not configured", id)),
                Err(_) => reason = Some(format!("Unknown provider '{}'", name)),
            }
        }

        if let Some(id) = self
            .default_provider
            .filter(|id| self.providers.contains_key(id))
        {
            return Ok(ProviderChoice {
                provider: id,
                fallback_reason: reason,
            });
        }

        Ok(ProviderChoice {
            provider: first,
            fallback_reason: Some(reason.unwrap_or_else(|| {
                "Default provider is not configured, using failover order".to_string()
            })),
        })
    }

    /// Describe configured providers in failover order.
    pub fn describe(&self) -> Vec<ProviderDescription> {
        self.configured()
            .into_iter()
            .filter_map(|id| {
                let provider = self.providers.get(&id)?;
                Some(ProviderDescription {
                    id,
                    label: id.label().to_string(),
                    model: provider.model_name().to_string(),
                    supports_vision: provider.supports_vision(),
                    pricing: self.pricing.get(&id).copied(),
                })
            })
            .collect()
    }

    /// Send a tiny completion to every configured provider concurrently.
    ///
    /// Results follow failover order. A provider that does not answer within
    /// `timeout` is reported as failed.
    pub async fn check_all(&self, timeout: Duration) -> Vec<ProviderCheck> {
        let options = CompletionOptions::builder()
            .temperature(0.0f32)
            .max_tokens(16u32)
            .system_prompt("Answer as briefly as possible.")
            .build()
            .unwrap_or_default();

        let checks = self.configured().into_iter().filter_map(|id| {
            let provider = self.providers.get(&id)?.clone();
            let options = options.clone();
            Some(async move {
                let started = Instant::now();
                let outcome =
                    tokio::time::timeout(timeout, provider.complete(CHECK_PROMPT, &options, &[]))
                        .await;
                let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                let (tokens, error) = match outcome {
                    Ok(Ok(result)) => (result.total_tokens(), None),
                    Ok(Err(e)) => (0, Some(e.message())),
                    Err(_) => (0, Some(format!("No answer within {}s", timeout.as_secs()))),
                };
                match &error {
                    None => info!(provider = %id, latency_ms, "Provider answered"),
                    Some(error) => warn!(provider = %id, latency_ms, %error, "Provider check failed"),
                }
                ProviderCheck {
                    id,
                    model: provider.model_name().to_string(),
                    latency_ms,
                    tokens,
                    error,
                }
            })
        });
        join_all(checks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sitesmith_core::{CompletionOptions, CompletionResult, ImageInput};
    use sitesmith_error::{ProviderError, ProviderErrorKind, ProviderResult};

    struct Named(ProviderId);

    struct Rejecting(ProviderId);

    #[async_trait]
    impl CompletionProvider for Rejecting {
        async fn complete(
            &self,
            _prompt: &str,
            _options: &CompletionOptions,
            _images: &[ImageInput],
        ) -> ProviderResult<CompletionResult> {
            Err(ProviderError::new(ProviderErrorKind::Api {
                status_code: 401,
                message: "invalid api key".to_string(),
            }))
        }

        fn provider_id(&self) -> ProviderId {
            self.0
        }

        fn model_name(&self) -> &str {
            "rejecting"
        }
    }

    struct Silent(ProviderId);

    #[async_trait]
    impl CompletionProvider for Silent {
        async fn complete(
            &self,
            _prompt: &str,
            _options: &CompletionOptions,
            _images: &[ImageInput],
        ) -> ProviderResult<CompletionResult> {
            futures::future::pending().await
        }

        fn provider_id(&self) -> ProviderId {
            self.0
        }

        fn model_name(&self) -> &str {
            "silent"
        }
    }

    #[async_trait]
    impl CompletionProvider for Named {
        async fn complete(
            &self,
            _prompt: &str,
            _options: &CompletionOptions,
            _images: &[ImageInput],
        ) -> ProviderResult<CompletionResult> {
            Ok(CompletionResult::builder().content("ok").build().unwrap())
        }

        fn provider_id(&self) -> ProviderId {
            self.0
        }

        fn model_name(&self) -> &str {
            "named"
        }
    }

    fn registry(ids: &[ProviderId]) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new(ProviderId::priority_order().to_vec());
        for id in ids {
            registry.register(Arc::new(Named(*id)));
        }
        registry
    }

    #[test]
    fn test_candidates_preferred_first_without_duplicates() {
        let registry = registry(&[ProviderId::Claude, ProviderId::DeepSeek, ProviderId::Gemini]);
        let ids: Vec<ProviderId> = registry
            .candidates(Some(ProviderId::Claude))
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(
            ids,
            vec![ProviderId::Claude, ProviderId::DeepSeek, ProviderId::Gemini]
        );
    }

    #[test]
    fn test_unconfigured_preference_is_ignored() {
        let registry = registry(&[ProviderId::Gemini]);
        let ids: Vec<ProviderId> = registry
            .candidates(Some(ProviderId::OpenAi))
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec![ProviderId::Gemini]);
    }

    #[test]
    fn test_resolve_preferred() {
        let registry = registry(&[ProviderId::Gemini, ProviderId::OpenAi])
            .with_default(ProviderId::OpenAi);

        let choice = registry.resolve_preferred(Some("gemini")).unwrap();
        assert_eq!(choice.provider, ProviderId::Gemini);
        assert!(choice.fallback_reason.is_none());

        let choice = registry.resolve_preferred(Some("claude")).unwrap();
        assert_eq!(choice.provider, ProviderId::OpenAi);
        assert!(choice.fallback_reason.is_some());

        let choice = registry.resolve_preferred(None).unwrap();
        assert_eq!(choice.provider, ProviderId::OpenAi);
        assert!(choice.fallback_reason.is_none());
    }

    #[test]
    fn test_resolve_without_default_uses_failover_order() {
        let registry = registry(&[ProviderId::Claude, ProviderId::Gemini]);
        let choice = registry.resolve_preferred(Some("bogus")).unwrap();
        assert_eq!(choice.provider, ProviderId::Gemini);
        assert_eq!(
            choice.fallback_reason.as_deref(),
            Some("Unknown provider 'bogus'")
        );
    }

    #[test]
    fn test_empty_registry_has_no_providers() {
        let err = registry(&[]).resolve_preferred(None).unwrap_err();
        assert_eq!(err.code(), "no_providers_available");
    }

    #[test]
    fn test_describe_lists_in_order() {
        let described = registry(&[ProviderId::Claude, ProviderId::DeepSeek]).describe();
        assert_eq!(described.len(), 2);
        assert_eq!(described[0].id, ProviderId::DeepSeek);
        assert_eq!(described[1].label, "Anthropic Claude");
        assert!(described[0].pricing.is_none());
    }

    #[tokio::test]
    async fn test_check_all_reports_each_provider_in_order() {
        let mut registry = registry(&[ProviderId::Gemini]);
        registry.register(Arc::new(Rejecting(ProviderId::DeepSeek)));

        let checks = registry.check_all(Duration::from_secs(5)).await;
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].id, ProviderId::DeepSeek);
        assert!(!checks[0].is_ok());
        assert_eq!(
            checks[0].error.as_deref(),
            Some("HTTP 401 error: invalid api key")
        );
        assert_eq!(checks[1].id, ProviderId::Gemini);
        assert!(checks[1].is_ok());
        assert_eq!(checks[1].model, "named");
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_all_times_out_silent_provider() {
        let mut registry = registry(&[ProviderId::OpenAi]);
        registry.register(Arc::new(Silent(ProviderId::Claude)));

        let checks = registry.check_all(Duration::from_secs(3)).await;
        let silent = checks
            .iter()
            .find(|c| c.id == ProviderId::Claude)
            .unwrap();
        assert_eq!(silent.error.as_deref(), Some("No answer within 3s"));
        assert!(checks.iter().any(|c| c.id == ProviderId::OpenAi && c.is_ok()));
    }
}
