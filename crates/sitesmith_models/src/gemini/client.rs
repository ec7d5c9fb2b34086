use super::dto::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
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

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Client for Google's Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    settings: AdapterSettings,
    throttle: Throttle,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        settings: AdapterSettings,
    ) -> ProviderResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::new(ProviderErrorKind::MissingApiKey(
                "GEMINI_API_KEY".to_string(),
            )));
        }
        let model = model.into();
        debug!(model = %model, "Creating new Gemini client");
        Ok(Self {
            client: settings.http_client()?,
            api_key,
            model,
            base_url: GEMINI_API_BASE.to_string(),
            throttle: settings.throttle(),
            settings,
        })
    }

    /// Override the models base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    fn build_request(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        images: &[ImageInput],
    ) -> GenerateContentRequest {
        let mut parts = vec![Part::Text {
            text: prompt.to_string(),
        }];
        if *self.settings.supports_vision() {
            parts.extend(images.iter().map(|image| Part::Inline {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: STANDARD.encode(&image.data),
                },
            }));
        }

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
            system_instruction: options.system_prompt().as_ref().map(|system| Content {
                role: None,
                parts: vec![Part::Text {
                    text: system.clone(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: *options.temperature(),
                max_output_tokens: *options.max_tokens(),
            },
        }
    }

    fn parse_response(&self, body: &str) -> ProviderResult<CompletionResult> {
        let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
            error!(error = ?e, "Failed to parse Gemini response");
            ProviderError::new(ProviderErrorKind::Parse(e.to_string()))
        })?;

        let text = response
            .text()
            .ok_or_else(|| ProviderError::new(ProviderErrorKind::EmptyCompletion))?;
        let usage = response.usage_metadata;

        CompletionResult::builder()
            .content(text)
            .prompt_tokens(usage.prompt_token_count)
            .completion_tokens(usage.candidates_token_count)
            .cost(
                self.settings
                    .pricing()
                    .cost(usage.prompt_token_count, usage.candidates_token_count),
            )
            .build()
            .map(|r| r.stamped(ProviderId::Gemini, self.model.clone()))
            .map_err(|e| ProviderError::new(ProviderErrorKind::Parse(e.to_string())))
    }

    async fn send_once(
        &self,
        url: &str,
        request: &GenerateContentRequest,
    ) -> ProviderResult<CompletionResult> {
        self.throttle.acquire().await;

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(status_error("gemini", status.as_u16(), &body));
        }
        self.parse_response(&body)
    }
}

#[async_trait]
impl CompletionProvider for GeminiClient {
    #[instrument(skip(self, prompt, options, images), fields(model = %self.model))]
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        images: &[ImageInput],
    ) -> ProviderResult<CompletionResult> {
        let url = self.endpoint();
        let request = self.build_request(prompt, options, images);
        with_retry(*self.settings.max_retries(), || self.send_once(&url, &request)).await
    }

    fn provider_id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn supports_vision(&self) -> bool {
        *self.settings.supports_vision()
    }
}
