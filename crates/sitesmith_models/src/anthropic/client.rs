use super::dto::{ContentBlock, ImageSource, Message, MessagesRequest, MessagesResponse};
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

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic API client.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    settings: AdapterSettings,
    throttle: Throttle,
}

impl AnthropicClient {
    /// Creates a new Anthropic client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Anthropic API key
    /// * `model` - Model identifier (e.g., "claude-3-5-sonnet-20241022")
    /// * `settings` - Timeout, retry, throttle and pricing
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        settings: AdapterSettings,
    ) -> ProviderResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::new(ProviderErrorKind::MissingApiKey(
                "ANTHROPIC_API_KEY".to_string(),
            )));
        }
        debug!("Creating new Anthropic client");
        Ok(Self {
            client: settings.http_client()?,
            api_key,
            model: model.into(),
            endpoint: ANTHROPIC_API_URL.to_string(),
            throttle: settings.throttle(),
            settings,
        })
    }

    /// Override the messages endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_request(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        images: &[ImageInput],
    ) -> MessagesRequest {
        let mut content = Vec::with_capacity(images.len() + 1);
        if *self.settings.supports_vision() && !images.is_empty() {
            content.extend(images.iter().map(|image| ContentBlock::Image {
                source: ImageSource {
                    source_type: "base64",
                    media_type: image.mime_type.clone(),
                    data: STANDARD.encode(&image.data),
                },
            }));
        }
        content.push(ContentBlock::Text {
            text: prompt.to_string(),
        });

        MessagesRequest {
            model: self.model.clone(),
            max_tokens: *options.max_tokens(),
            temperature: *options.temperature(),
            system: options.system_prompt().clone(),
            messages: vec![Message {
                role: "user",
                content,
            }],
        }
    }

    fn parse_response(&self, body: &str) -> ProviderResult<CompletionResult> {
        let response: MessagesResponse = serde_json::from_str(body).map_err(|e| {
            error!(error = ?e, "Failed to parse Anthropic response");
            ProviderError::new(ProviderErrorKind::Parse(e.to_string()))
        })?;

        let text = response
            .text()
            .ok_or_else(|| ProviderError::new(ProviderErrorKind::EmptyCompletion))?;
        let usage = response.usage;

        CompletionResult::builder()
            .content(text)
            .prompt_tokens(usage.input_tokens)
            .completion_tokens(usage.output_tokens)
            .cost(
                self.settings
                    .pricing()
                    .cost(usage.input_tokens, usage.output_tokens),
            )
            .build()
            .map(|r| r.stamped(ProviderId::Claude, self.model.clone()))
            .map_err(|e| ProviderError::new(ProviderErrorKind::Parse(e.to_string())))
    }

    async fn send_once(&self, request: &MessagesRequest) -> ProviderResult<CompletionResult> {
        self.throttle.acquire().await;

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Failed to send request to Anthropic API");
                transport_error(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(status_error("claude", status.as_u16(), &body));
        }
        self.parse_response(&body)
    }
}

#[async_trait]
impl CompletionProvider for AnthropicClient {
    #[instrument(skip(self, prompt, options, images), fields(model = %self.model))]
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        images: &[ImageInput],
    ) -> ProviderResult<CompletionResult> {
        let request = self.build_request(prompt, options, images);
        debug!("Sending request to Anthropic API");
        with_retry(*self.settings.max_retries(), || self.send_once(&request)).await
    }

    fn provider_id(&self) -> ProviderId {
        ProviderId::Claude
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn supports_vision(&self) -> bool {
        *self.settings.supports_vision()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pricing;

    fn client() -> AnthropicClient {
        let settings = AdapterSettings::builder()
            .pricing(Pricing::new(3.0, 15.0))
            .supports_vision(true)
            .build()
            .unwrap();
        AnthropicClient::new("key", "claude-3-5-sonnet-20241022", settings).unwrap()
    }

    #[test]
    fn test_system_prompt_is_top_level_parameter() {
        let request = client().build_request("hi", &CompletionOptions::default(), &[]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["system"].as_str().unwrap().contains("web developer"));
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
    }

    #[test]
    fn test_images_precede_text_as_base64_blocks() {
        let image = ImageInput {
            mime_type: "image/jpeg".to_string(),
            data: vec![0xff, 0xd8],
        };
        let request = client().build_request("hi", &CompletionOptions::default(), &[image]);
        let json = serde_json::to_value(&request).unwrap();
        let block = &json["messages"][0]["content"][0];
        assert_eq!(block["type"], "image");
        assert_eq!(block["source"]["type"], "base64");
        assert_eq!(block["source"]["media_type"], "image/jpeg");
        assert_eq!(json["messages"][0]["content"][1]["text"], "hi");
    }

    #[test]
    fn test_parse_response_joins_text_blocks() {
        let body = r#"{
            "id": "msg_1",
            "content": [
                {"type": "text", "text": "<main>"},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "</main>"}
            ],
            "usage": {"input_tokens": 1000, "output_tokens": 2000}
        }"#;
        let result = client().parse_response(body).unwrap();
        assert_eq!(result.content(), "<main></main>");
        assert_eq!(result.total_tokens(), 3000);
        assert_eq!(*result.cost(), 0.033);
        assert_eq!(*result.provider(), Some(ProviderId::Claude));
    }

    #[test]
    fn test_parse_response_without_text_fails() {
        let err = client().parse_response(r#"{"content": []}"#).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::EmptyCompletion);
    }
}
