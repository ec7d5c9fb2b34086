//! Scriptable completion provider.

use async_trait::async_trait;
use sitesmith_core::{CompletionOptions, CompletionResult, ImageInput, ProviderId};
use sitesmith_error::{ProviderError, ProviderErrorKind, ProviderResult};
use sitesmith_interface::CompletionProvider;
use std::sync::{Arc, Mutex};

/// Behavior configuration for mock responses.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always return success with the given text
    Success(String),
    /// Always return the specified error
    Error(ProviderErrorKind),
    /// Return a sequence of responses, then fail once exhausted
    Sequence(Vec<MockResponse>),
    /// Panic inside `complete` with the given message
    Panic(String),
}

/// A single mock response (success or error).
#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(String),
    Error(ProviderErrorKind),
}

/// Mock provider recording every prompt it receives.
pub struct MockProvider {
    id: ProviderId,
    behavior: MockBehavior,
    prompts: Arc<Mutex<Vec<String>>>,
    model_name: String,
}

impl MockProvider {
    fn with_behavior(id: ProviderId, behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self {
            id,
            behavior,
            prompts: Arc::new(Mutex::new(Vec::new())),
            model_name: format!("mock-{}", id),
        })
    }

    /// Always succeeds with `text`.
    pub fn new_success(id: ProviderId, text: impl Into<String>) -> Arc<Self> {
        Self::with_behavior(id, MockBehavior::Success(text.into()))
    }

    /// Always fails with `error`.
    pub fn new_error(id: ProviderId, error: ProviderErrorKind) -> Arc<Self> {
        Self::with_behavior(id, MockBehavior::Error(error))
    }

    /// Answers from `responses` in order.
    pub fn new_sequence(id: ProviderId, responses: Vec<MockResponse>) -> Arc<Self> {
        Self::with_behavior(id, MockBehavior::Sequence(responses))
    }

    /// Panics on every call.
    pub fn new_panic(id: ProviderId, message: impl Into<String>) -> Arc<Self> {
        Self::with_behavior(id, MockBehavior::Panic(message.into()))
    }

    /// Number of times complete() was called.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn success(&self, text: &str) -> ProviderResult<CompletionResult> {
        Ok(CompletionResult::builder()
            .content(text)
            .prompt_tokens(100u64)
            .completion_tokens(50u64)
            .cost(0.001)
            .build()
            .unwrap())
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
        _images: &[ImageInput],
    ) -> ProviderResult<CompletionResult> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len() - 1
        };

        match &self.behavior {
            MockBehavior::Success(text) => self.success(text),
            MockBehavior::Error(kind) => Err(ProviderError::new(kind.clone())),
            MockBehavior::Panic(message) => panic!("{}", message),
            MockBehavior::Sequence(responses) => match responses.get(call) {
                Some(MockResponse::Success(text)) => self.success(text),
                Some(MockResponse::Error(kind)) => Err(ProviderError::new(kind.clone())),
                None => Err(ProviderError::new(ProviderErrorKind::Connection(format!(
                    "Mock sequence exhausted (call {} beyond {} responses)",
                    call + 1,
                    responses.len()
                )))),
            },
        }
    }

    fn provider_id(&self) -> ProviderId {
        self.id
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
