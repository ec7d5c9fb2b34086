//! Token pricing.

use serde::{Deserialize, Serialize};

/// USD price per million tokens for one model.
///
/// # Examples
///
/// ```
/// use sitesmith_models::Pricing;
///
/// let deepseek = Pricing::new(0.14, 0.28);
/// assert_eq!(deepseek.cost(1_000_000, 500_000), 0.28);
/// assert_eq!(deepseek.cost(1234, 0), 0.000173);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    /// Price per million prompt tokens
    pub input_per_million: f64,
    /// Price per million completion tokens
    pub output_per_million: f64,
}

impl Pricing {
    /// Create pricing from per-million rates.
    pub fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Cost of a call, rounded to six decimal places.
    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        let raw = prompt_tokens as f64 / 1_000_000.0 * self.input_per_million
            + completion_tokens as f64 / 1_000_000.0 * self.output_per_million;
        (raw * 1_000_000.0).round() / 1_000_000.0
    }
}
