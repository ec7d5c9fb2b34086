//! LLM provider adapters for Sitesmith.
//!
//! Every adapter implements [`CompletionProvider`](sitesmith_interface::CompletionProvider)
//! and owns its own transport concerns: request timeout, retry with backoff
//! for transient failures, an optional requests-per-minute throttle, and
//! token pricing.
//!
//! # Available Providers
//!
//! - **DeepSeek** and **OpenAI** via [`OpenAiCompatibleClient`]
//! - **Anthropic Claude** via [`AnthropicClient`]
//! - **Google Gemini** via [`GeminiClient`]
//!
//! ```no_run
//! use sitesmith_core::{CompletionOptions, ProviderId};
//! use sitesmith_interface::CompletionProvider;
//! use sitesmith_models::{AdapterSettings, OpenAiCompatibleClient};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiCompatibleClient::new(
//!     ProviderId::DeepSeek,
//!     std::env::var("DEEPSEEK_API_KEY")?,
//!     "deepseek-chat",
//!     "https://api.deepseek.com/v1/chat/completions",
//!     AdapterSettings::default(),
//! )?;
//! let result = client
//!     .complete("A hero section for a bakery", &CompletionOptions::default(), &[])
//!     .await?;
//! println!("{}", result.content());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod anthropic;
mod factory;
mod gemini;
mod http;
mod openai_compat;
mod pricing;
mod retry;
mod throttle;

pub use anthropic::AnthropicClient;
pub use factory::build_provider;
pub use gemini::GeminiClient;
pub use http::{AdapterSettings, AdapterSettingsBuilder};
pub use openai_compat::OpenAiCompatibleClient;
pub use pricing::Pricing;
pub use retry::with_retry;
pub use throttle::Throttle;
