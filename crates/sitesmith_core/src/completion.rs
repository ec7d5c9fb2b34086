//! Uniform completion request options and results shared by every adapter.

use crate::ProviderId;
use serde::{Deserialize, Serialize};

/// Options passed unchanged to whichever provider serves a request.
///
/// # Examples
///
/// ```
/// use sitesmith_core::CompletionOptions;
///
/// let options = CompletionOptions::builder()
///     .temperature(0.2f32)
///     .max_tokens(1024u32)
///     .build()
///     .unwrap();
/// assert_eq!(*options.max_tokens(), 1024);
/// assert!(options.system_prompt().is_some());
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct CompletionOptions {
    /// Sampling temperature
    #[builder(default = "0.7")]
    temperature: f32,
    /// Maximum tokens to generate
    #[builder(default = "4096")]
    max_tokens: u32,
    /// System prompt prepended by the adapter
    #[builder(default = "Some(default_system_prompt())", setter(into, strip_option))]
    system_prompt: Option<String>,
}

/// System prompt used when the configuration does not provide one.
pub fn default_system_prompt() -> String {
    "You are an expert web developer. Produce clean, semantic, responsive \
     HTML, CSS and JavaScript. Return only code unless asked otherwise."
        .to_string()
}

impl CompletionOptions {
    /// Creates a new options builder.
    pub fn builder() -> CompletionOptionsBuilder {
        CompletionOptionsBuilder::default()
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
            system_prompt: Some(default_system_prompt()),
        }
    }
}

/// An image attached to a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInput {
    /// MIME type such as `image/png`
    pub mime_type: String,
    /// Raw image bytes
    pub data: Vec<u8>,
}

/// Result of one successful completion call.
///
/// Serializes to a JSON record with a `content` field so cached values and
/// fresh results pass through the same response-shape check.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct CompletionResult {
    /// Generated text
    content: String,
    /// Tokens consumed by the prompt
    #[builder(default)]
    #[serde(default)]
    prompt_tokens: u64,
    /// Tokens produced by the completion
    #[builder(default)]
    #[serde(default)]
    completion_tokens: u64,
    /// Cost in USD
    #[builder(default)]
    #[serde(default)]
    cost: f64,
    /// Provider that actually served the request
    #[builder(default, setter(into, strip_option))]
    #[serde(default)]
    provider: Option<ProviderId>,
    /// Model that actually served the request
    #[builder(default, setter(into, strip_option))]
    #[serde(default)]
    model: Option<String>,
}

impl CompletionResult {
    /// Creates a new result builder.
    pub fn builder() -> CompletionResultBuilder {
        CompletionResultBuilder::default()
    }

    /// Prompt plus completion tokens.
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Stamp the result with the provider and model that served it.
    pub fn stamped(mut self, provider: ProviderId, model: impl Into<String>) -> Self {
        self.provider = Some(provider);
        self.model = Some(model.into());
        self
    }
}
