//! Trait definitions for completion providers.

use async_trait::async_trait;
use sitesmith_core::{CompletionOptions, CompletionResult, ImageInput, ProviderId};
use sitesmith_error::ProviderResult;

/// Uniform contract every LLM provider adapter implements.
///
/// Adapters own their low-level retry and backoff; callers treat any error
/// returned here as final for this provider.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete a prompt with shared options and optional reference images.
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        images: &[ImageInput],
    ) -> ProviderResult<CompletionResult>;

    /// Provider this adapter serves.
    fn provider_id(&self) -> ProviderId;

    /// Model identifier (e.g., "deepseek-chat").
    fn model_name(&self) -> &str;

    /// Whether reference images are forwarded to the model.
    fn supports_vision(&self) -> bool {
        false
    }
}
