//! Provider failover.

use crate::{BuildLogger, ProviderRegistry};
use sitesmith_core::{CompletionOptions, CompletionResult, ImageInput, ProviderId};
use sitesmith_error::{
    GenerationError, GenerationErrorKind, GenerationResult, ProviderError, RetryableError,
};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Routes one completion across the configured providers.
///
/// Candidates are tried in order: the preferred provider, then the static
/// failover priority. Any failure moves on to the next candidate; retrying
/// in place is left to the adapters. When every candidate fails, the last
/// error is returned.
#[derive(Debug, Clone)]
pub struct ProviderRouter {
    registry: Arc<ProviderRegistry>,
}

impl ProviderRouter {
    /// Create a router over a registry.
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// The registry being routed over.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Complete `prompt` with the first provider that succeeds.
    ///
    /// # Errors
    ///
    /// - [`GenerationErrorKind::NoProvidersAvailable`] when there are no candidates
    /// - [`GenerationErrorKind::ProviderFailure`] carrying the last provider error
    #[instrument(skip(self, prompt, options, images, logger), fields(preferred = ?preferred, prompt_chars = prompt.len()))]
    pub async fn request_with_failover(
        &self,
        preferred: Option<ProviderId>,
        prompt: &str,
        options: &CompletionOptions,
        images: &[ImageInput],
        logger: &BuildLogger,
    ) -> GenerationResult<CompletionResult> {
        let candidates = self.registry.candidates(preferred);
        if candidates.is_empty() {
            return Err(GenerationError::new(
                GenerationErrorKind::NoProvidersAvailable,
            ));
        }

        let mut last_error: Option<(ProviderId, ProviderError)> = None;
        for (id, provider) in candidates {
            logger
                .provider_request(id, provider.model_name(), prompt.chars().count())
                .await;
            let started = Instant::now();

            match provider.complete(prompt, options, images).await {
                Ok(result) => {
                    let duration_ms =
                        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                    let model = result
                        .model()
                        .clone()
                        .unwrap_or_else(|| provider.model_name().to_string());
                    let result = result.stamped(id, model);
                    logger
                        .provider_response(id, result.total_tokens(), *result.cost(), duration_ms)
                        .await;
                    debug!(provider = %id, duration_ms, "Provider succeeded");
                    return Ok(result);
                }
                Err(e) => {
                    warn!(
                        provider = %id,
                        code = %e.kind.code(),
                        retryable = e.is_retryable(),
                        error = %e.kind,
                        "Provider failed, trying next candidate"
                    );
                    logger
                        .provider_error(id, &e.kind.code(), &e.kind.to_string())
                        .await;
                    last_error = Some((id, e));
                }
            }
        }

        Err(match last_error {
            Some((id, error)) => GenerationError::new(GenerationErrorKind::ProviderFailure {
                provider: id.to_string(),
                error,
            }),
            None => GenerationError::new(GenerationErrorKind::NoProvidersAvailable),
        })
    }
}
