//! Adapter construction from configuration.

use crate::{AdapterSettings, AnthropicClient, GeminiClient, OpenAiCompatibleClient};
use sitesmith_core::ProviderId;
use sitesmith_error::ProviderResult;
use sitesmith_interface::CompletionProvider;
use sitesmith_rate_limit::ProviderSettings;
use std::sync::Arc;
use tracing::info;

const DEEPSEEK_URL: &str = "https://api.deepseek.com/v1/chat/completions";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Build the adapter for `id` from its configuration section and API key.
///
/// `base_url` overrides the provider's default endpoint (the full
/// chat-completions URL for DeepSeek and OpenAI, the messages URL for
/// Claude, the models base URL for Gemini).
pub fn build_provider(
    id: ProviderId,
    settings: &ProviderSettings,
    api_key: String,
) -> ProviderResult<Arc<dyn CompletionProvider>> {
    let adapter = AdapterSettings::from_provider_settings(settings);
    let model = settings.model().clone();
    info!(provider = %id, model = %model, "Building provider adapter");

    let provider: Arc<dyn CompletionProvider> = match id {
        ProviderId::DeepSeek | ProviderId::OpenAi => {
            let default_url = if id == ProviderId::DeepSeek {
                DEEPSEEK_URL
            } else {
                OPENAI_URL
            };
            let endpoint = settings
                .base_url()
                .clone()
                .unwrap_or_else(|| default_url.to_string());
            Arc::new(OpenAiCompatibleClient::new(
                id, api_key, model, endpoint, adapter,
            )?)
        }
        ProviderId::Claude => {
            let client = AnthropicClient::new(api_key, model, adapter)?;
            match settings.base_url() {
                Some(url) => Arc::new(client.with_endpoint(url.clone())),
                None => Arc::new(client),
            }
        }
        ProviderId::Gemini => {
            let client = GeminiClient::new(api_key, model, adapter)?;
            match settings.base_url() {
                Some(url) => Arc::new(client.with_base_url(url.clone())),
                None => Arc::new(client),
            }
        }
    };
    Ok(provider)
}
