//! Completion provider identifiers.

use serde::{Deserialize, Serialize};

/// A completion provider the engine knows how to route to.
///
/// The declaration order is the static failover priority: cheaper providers
/// come first.
///
/// # Examples
///
/// ```
/// use sitesmith_core::ProviderId;
/// use std::str::FromStr;
///
/// assert_eq!(ProviderId::from_str("openai").unwrap(), ProviderId::OpenAi);
/// assert_eq!(ProviderId::DeepSeek.to_string(), "deepseek");
/// assert_eq!(ProviderId::priority_order()[0], ProviderId::DeepSeek);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderId {
    /// DeepSeek chat models
    DeepSeek,
    /// Google Gemini models
    Gemini,
    /// OpenAI chat models
    OpenAi,
    /// Anthropic Claude models
    Claude,
}

impl ProviderId {
    /// Static failover priority across all known providers.
    pub fn priority_order() -> &'static [ProviderId] {
        &[
            ProviderId::DeepSeek,
            ProviderId::Gemini,
            ProviderId::OpenAi,
            ProviderId::Claude,
        ]
    }

    /// Human-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            ProviderId::DeepSeek => "DeepSeek",
            ProviderId::Gemini => "Google Gemini",
            ProviderId::OpenAi => "OpenAI",
            ProviderId::Claude => "Anthropic Claude",
        }
    }
}
