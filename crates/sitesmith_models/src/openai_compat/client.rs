use super::dto::{
    ChatContent, ChatMessage, ChatRequest, ChatResponse, ChatRole, ContentPart, ImageUrl,
};
use crate::http::{status_error, transport_error};
use crate::{AdapterSettings, Throttle, with_retry};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use sitesmith_core::{CompletionOptions, CompletionResult, ImageInput, ProviderId};
use sitesmith_error::{ProviderError, ProviderErrorKind, ProviderResult};
use sitesmith_interface::CompletionProvider;
use tracing::{debug, error, instrument};

/// Client for any chat-completions compatible endpoint.
///
/// Serves both OpenAI and DeepSeek; the two differ only in endpoint, model
/// and pricing.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    provider: ProviderId,
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    settings: AdapterSettings,
    throttle: Throttle,
}

impl OpenAiCompatibleClient {
    /// Creates a new chat-completions client.
    ///
    /// # Arguments
    ///
    /// * `provider` - Provider identity reported on results
    /// * `api_key` - Bearer token
    /// * `model` - Model identifier (e.g., "gpt-4o")
    /// * `endpoint` - Full chat-completions URL
    /// * `settings` - Timeout, retry, throttle and pricing
    pub fn new(
        provider: ProviderId,
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
        settings: AdapterSettings,
    ) -> ProviderResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::new(ProviderErrorKind::MissingApiKey(
                provider.to_string(),
            )));
        }
        debug!(provider = %provider, "Creating new chat-completions client");
        Ok(Self {
            provider,
            client: settings.http_client()?,
            api_key,
            model: model.into(),
            endpoint: endpoint.into(),
            throttle: settings.throttle(),
            settings,
        })
    }

    fn build_request(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        images: &[ImageInput],
    ) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = options.system_prompt() {
            messages.push(ChatMessage {
                role: ChatRole::System,
                content: ChatContent::Text(system.clone()),
            });
        }

        let content = if images.is_empty() || !self.settings.supports_vision() {
            ChatContent::Text(prompt.to_string())
        } else {
            let mut parts = vec![ContentPart::Text {
                text: prompt.to_string(),
            }];
            parts.extend(images.iter().map(|image| ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!(
                        "data:{};base64,{}",
                        image.mime_type,
                        STANDARD.encode(&image.data)
                    ),
                },
            }));
            ChatContent::Parts(parts)
        };
        messages.push(ChatMessage {
            role: ChatRole::User,
            content,
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: *options.temperature(),
            max_tokens: *options.max_tokens(),
        }
    }

    /// Decode a success body into a priced, stamped result.
    fn parse_response(&self, body: &str) -> ProviderResult<CompletionResult> {
        let response: ChatResponse = serde_json::from_str(body).map_err(|e| {
            error!(error = ?e, "Failed to parse chat-completions response");
            ProviderError::new(ProviderErrorKind::Parse(e.to_string()))
        })?;

        let text = response
            .text()
            .ok_or_else(|| ProviderError::new(ProviderErrorKind::EmptyCompletion))?;
        let usage = response.usage;
        let cost = self
            .settings
            .pricing()
            .cost(usage.prompt_tokens, usage.completion_tokens);

        CompletionResult::builder()
            .content(text)
            .prompt_tokens(usage.prompt_tokens)
            .completion_tokens(usage.completion_tokens)
            .cost(cost)
            .build()
            .map(|r| r.stamped(self.provider, self.model.clone()))
            .map_err(|e| ProviderError::new(ProviderErrorKind::Parse(e.to_string())))
    }

    async fn send_once(&self, request: &ChatRequest) -> ProviderResult<CompletionResult> {
        self.throttle.acquire().await;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(status_error(self.provider.as_ref(), status.as_u16(), &body));
        }
        self.parse_response(&body)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleClient {
    #[instrument(skip(self, prompt, options, images), fields(provider = %self.provider, model = %self.model))]
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        images: &[ImageInput],
    ) -> ProviderResult<CompletionResult> {
        let request = self.build_request(prompt, options, images);
        debug!(messages = request.messages.len(), "Sending chat-completions request");
        let result = with_retry(*self.settings.max_retries(), || self.send_once(&request)).await?;
        debug!(
            prompt_tokens = result.prompt_tokens(),
            completion_tokens = result.completion_tokens(),
            "Received chat-completions response"
        );
        Ok(result)
    }

    fn provider_id(&self) -> ProviderId {
        self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn supports_vision(&self) -> bool {
        *self.settings.supports_vision()
    }
}
