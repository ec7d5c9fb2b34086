//! Inbound generation requests and their outcomes.

use crate::{ImageInput, ProviderId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// One request to generate (or regenerate) a website artifact.
///
/// Either `project_id` or a non-empty `description` must be supplied.
///
/// # Examples
///
/// ```
/// use sitesmith_core::GenerationRequest;
///
/// let request = GenerationRequest::builder()
///     .caller_id("user-7")
///     .description("bakery site")
///     .mode("full_site")
///     .build()
///     .unwrap();
/// assert_eq!(request.website_type(), "business");
/// assert!(request.step().is_none());
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
pub struct GenerationRequest {
    /// Stable caller identity used for ownership and rate limiting
    caller_id: String,
    /// Existing project to regenerate
    #[builder(default, setter(into, strip_option))]
    project_id: Option<Uuid>,
    /// Natural-language description of the site
    #[builder(default)]
    description: String,
    /// Project name
    #[builder(default = "\"New project\".to_string()")]
    name: String,
    /// Website type tag
    #[builder(default = "\"business\".to_string()")]
    website_type: String,
    /// Industry tag
    #[builder(default, setter(into, strip_option))]
    industry: Option<String>,
    /// Style notes passed into prompts
    #[builder(default, setter(into, strip_option))]
    style: Option<String>,
    /// Colour scheme passed into prompts
    #[builder(default, setter(into, strip_option))]
    color_scheme: Option<String>,
    /// Generation mode wire name; unknown values fall back to full site
    #[builder(default, setter(into, strip_option))]
    mode: Option<String>,
    /// Preferred provider wire name
    #[builder(default, setter(into, strip_option))]
    provider: Option<String>,
    /// Single targeted step index
    #[builder(default, setter(into, strip_option))]
    step: Option<u8>,
    /// Artifact from an earlier call to build upon
    #[builder(default, setter(into, strip_option))]
    previous_context: Option<String>,
    /// Free-form settings persisted with the project
    #[builder(default = "JsonValue::Null")]
    settings: JsonValue,
    /// Reference images forwarded to providers
    #[builder(default)]
    images: Vec<ImageInput>,
}

impl GenerationRequest {
    /// Creates a new request builder.
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }
}

/// What one executed step produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Step index
    pub step: u8,
    /// Step name
    pub name: String,
    /// Provider that served the step
    pub provider: ProviderId,
    /// Extracted artifact
    pub code: String,
    /// Tokens consumed
    pub tokens: u64,
    /// Cost in USD
    pub cost: f64,
    /// Whether the response came from the cache
    pub cached: bool,
    /// Step duration
    pub duration_ms: u64,
}

/// Successful generation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// Project the artifact was saved to
    pub project_id: Uuid,
    /// Final combined artifact
    pub artifact: String,
    /// Tokens across all steps
    pub total_tokens: u64,
    /// Cost across all steps
    pub total_cost: f64,
    /// Build log session id
    pub log_session_id: String,
    /// Durable build log record id, `None` when that write failed
    pub log_record_id: Option<Uuid>,
    /// Per-step results in execution order
    pub steps: Vec<StepOutcome>,
}
