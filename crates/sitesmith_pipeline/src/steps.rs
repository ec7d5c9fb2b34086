//! Step and mode tables.
//!
//! A [`GenerationMode`] selects an ordered subset of [`Step`]s. Each step
//! carries its prompt builder, so an unknown step cannot be scheduled.

use crate::prompts;
use serde::{Deserialize, Serialize};
use sitesmith_core::{GenerationRequest, Project};

/// One prompt, provider call and extraction unit of the pipeline.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    /// Semantic page skeleton
    Structure = 1,
    /// Grid and responsive layout
    Layout = 2,
    /// Visual styling
    Styling = 3,
    /// Copy and media
    Content = 4,
    /// Performance, accessibility and SEO pass
    Optimization = 5,
}

/// Builds the template part of a step's prompt.
pub type PromptBuilder = fn(&PromptContext) -> String;

impl Step {
    /// Every step in execution order.
    pub fn all() -> &'static [Step] {
        &[
            Step::Structure,
            Step::Layout,
            Step::Styling,
            Step::Content,
            Step::Optimization,
        ]
    }

    /// 1-based step index.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Step for a 1-based index.
    pub fn from_index(index: u8) -> Option<Step> {
        Step::all().iter().copied().find(|s| s.index() == index)
    }

    /// Stable step name, e.g. `styling`.
    pub fn name(self) -> &'static str {
        match self {
            Step::Structure => "structure",
            Step::Layout => "layout",
            Step::Styling => "styling",
            Step::Content => "content",
            Step::Optimization => "optimization",
        }
    }

    /// Human-facing label for progress messages.
    pub fn label(self) -> &'static str {
        match self {
            Step::Structure => "Building structure",
            Step::Layout => "Creating layout",
            Step::Styling => "Applying styles",
            Step::Content => "Generating content",
            Step::Optimization => "Optimizing",
        }
    }

    /// Prompt builder for this step.
    pub fn prompt_builder(self) -> PromptBuilder {
        match self {
            Step::Structure => prompts::structure,
            Step::Layout => prompts::layout,
            Step::Styling => prompts::styling,
            Step::Content => prompts::content,
            Step::Optimization => prompts::optimization,
        }
    }
}

/// What kind of artifact a mode produces.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactKind {
    /// Complete HTML document
    FullDocument,
    /// One reusable page section
    ReusableSection,
    /// Multi-section layout
    Layout,
    /// Header or footer template
    ThemeTemplate,
    /// Page-builder JSON block format
    StructuredBlock,
}

/// Named selection of steps.
///
/// # Examples
///
/// ```
/// use sitesmith_pipeline::{GenerationMode, Step};
///
/// let (mode, fell_back) = GenerationMode::resolve(Some("section"));
/// assert_eq!(mode.steps(), &[Step::Layout, Step::Styling]);
/// assert!(!fell_back);
///
/// let (mode, fell_back) = GenerationMode::resolve(Some("spaceship"));
/// assert_eq!(mode, GenerationMode::FullSite);
/// assert!(fell_back);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenerationMode {
    /// Complete website, all five steps
    #[default]
    FullSite,
    /// Single reusable section
    Section,
    /// Page layout without optimization
    Layout,
    /// Header/footer templates
    ThemeBuilder,
    /// Page-builder section in block JSON
    #[strum(serialize = "divi5_section")]
    #[serde(rename = "divi5_section")]
    Divi5Section,
    /// Page-builder layout in block JSON
    #[strum(serialize = "divi5_layout")]
    #[serde(rename = "divi5_layout")]
    Divi5Layout,
}

impl GenerationMode {
    /// Resolve a wire name, falling back to [`GenerationMode::FullSite`].
    ///
    /// The flag is `true` when a non-empty name was given but not recognised.
    pub fn resolve(name: Option<&str>) -> (Self, bool) {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => (GenerationMode::FullSite, false),
            Some(name) => match name.parse::<GenerationMode>() {
                Ok(mode) => (mode, false),
                Err(_) => (GenerationMode::FullSite, true),
            },
        }
    }

    /// Ordered steps this mode runs.
    pub fn steps(self) -> &'static [Step] {
        match self {
            GenerationMode::FullSite => Step::all(),
            GenerationMode::Section | GenerationMode::ThemeBuilder | GenerationMode::Divi5Section => {
                &[Step::Layout, Step::Styling]
            }
            GenerationMode::Layout | GenerationMode::Divi5Layout => &[
                Step::Structure,
                Step::Layout,
                Step::Styling,
                Step::Content,
            ],
        }
    }

    /// Artifact kind used by the final structural check.
    pub fn artifact_kind(self) -> ArtifactKind {
        match self {
            GenerationMode::FullSite => ArtifactKind::FullDocument,
            GenerationMode::Section => ArtifactKind::ReusableSection,
            GenerationMode::Layout => ArtifactKind::Layout,
            GenerationMode::ThemeBuilder => ArtifactKind::ThemeTemplate,
            GenerationMode::Divi5Section | GenerationMode::Divi5Layout => {
                ArtifactKind::StructuredBlock
            }
        }
    }

    /// Output-format instruction placed ahead of each prompt.
    pub fn output_hint(self) -> Option<&'static str> {
        match self {
            GenerationMode::Divi5Section | GenerationMode::Divi5Layout => {
                Some("OUTPUT FORMAT: Divi 5 JSON Block Format ONLY.")
            }
            GenerationMode::ThemeBuilder => Some(
                "OUTPUT: WordPress Theme Builder compatible code (header/footer template).",
            ),
            GenerationMode::Section => Some("OUTPUT: Single reusable section code only."),
            GenerationMode::FullSite | GenerationMode::Layout => None,
        }
    }
}

/// Request details the prompt builders draw from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct PromptContext {
    /// Natural-language site description
    description: String,
    /// Project name
    name: String,
    /// Website type tag
    website_type: String,
    /// Industry tag, `general` when absent
    industry: String,
    /// Style notes
    style: Option<String>,
    /// Colour scheme
    color_scheme: Option<String>,
}

impl PromptContext {
    /// Capture the prompt-relevant fields of a request.
    pub fn from_request(request: &GenerationRequest) -> Self {
        Self {
            description: request.description().clone(),
            name: request.name().clone(),
            website_type: request.website_type().clone(),
            industry: request
                .industry()
                .clone()
                .unwrap_or_else(|| "general".to_string()),
            style: request.style().clone(),
            color_scheme: request.color_scheme().clone(),
        }
    }

    /// Fill fields the request left blank from a stored project.
    pub fn backfill(mut self, project: &Project) -> Self {
        if self.description.trim().is_empty() {
            self.description = project.description().clone();
        }
        if self.industry == "general" {
            if let Some(industry) = project.industry() {
                self.industry = industry.clone();
            }
        }
        self
    }
}

/// Assemble the full prompt for one step.
///
/// The template comes first, followed by the prior artifact when there is
/// one. The mode's output hint is placed ahead of everything.
pub fn build_step_prompt(
    mode: GenerationMode,
    step: Step,
    context: &PromptContext,
    prior_context: &str,
) -> String {
    let mut prompt = (step.prompt_builder())(context);
    if !prior_context.trim().is_empty() {
        prompt.push_str("\n\nPrevious code to build upon:\n");
        prompt.push_str(prior_context);
    }
    match mode.output_hint() {
        Some(hint) => format!("{}\n\n{}", hint, prompt),
        None => prompt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn context() -> PromptContext {
        let request = GenerationRequest::builder()
            .caller_id("u1")
            .description("bakery site")
            .build()
            .unwrap();
        PromptContext::from_request(&request)
    }

    #[test]
    fn test_step_indices_round_trip() {
        for step in Step::iter() {
            assert_eq!(Step::from_index(step.index()), Some(step));
            assert_eq!(step.name(), step.to_string());
        }
        assert_eq!(Step::from_index(0), None);
        assert_eq!(Step::from_index(6), None);
    }

    #[test]
    fn test_mode_wire_names() {
        assert_eq!(GenerationMode::Divi5Section.to_string(), "divi5_section");
        assert_eq!(
            "divi5_layout".parse::<GenerationMode>().unwrap(),
            GenerationMode::Divi5Layout
        );
        assert_eq!(
            "theme_builder".parse::<GenerationMode>().unwrap(),
            GenerationMode::ThemeBuilder
        );
        assert_eq!(GenerationMode::resolve(None), (GenerationMode::FullSite, false));
        assert_eq!(GenerationMode::resolve(Some("  ")), (GenerationMode::FullSite, false));
    }

    #[test]
    fn test_every_mode_runs_ascending_steps() {
        for mode in GenerationMode::iter() {
            let steps = mode.steps();
            assert!(!steps.is_empty());
            assert!(steps.windows(2).all(|w| w[0].index() < w[1].index()));
        }
        assert_eq!(GenerationMode::FullSite.steps().len(), 5);
        assert_eq!(GenerationMode::Layout.steps().len(), 4);
    }

    #[test]
    fn test_artifact_kinds() {
        assert_eq!(GenerationMode::FullSite.artifact_kind(), ArtifactKind::FullDocument);
        assert_eq!(GenerationMode::Divi5Layout.artifact_kind(), ArtifactKind::StructuredBlock);
        assert_eq!(GenerationMode::Section.artifact_kind(), ArtifactKind::ReusableSection);
    }

    #[test]
    fn test_prompt_assembly_order() {
        let prompt = build_step_prompt(
            GenerationMode::Section,
            Step::Styling,
            &context(),
            "<section>prior</section>",
        );
        assert!(prompt.starts_with("OUTPUT: Single reusable section code only."));
        let template_at = prompt.find("STYLING").unwrap();
        let prior_at = prompt.find("Previous code to build upon:\n<section>prior</section>").unwrap();
        assert!(template_at < prior_at);
    }

    #[test]
    fn test_backfill_from_project() {
        let project = Project::from_new(
            uuid::Uuid::new_v4(),
            sitesmith_core::NewProject::builder()
                .owner_id("u1")
                .description("florist shop")
                .industry("retail")
                .build()
                .unwrap(),
            chrono::Utc::now(),
        );
        let request = GenerationRequest::builder().caller_id("u1").build().unwrap();
        let context = PromptContext::from_request(&request).backfill(&project);
        assert_eq!(context.description(), "florist shop");
        assert_eq!(context.industry(), "retail");

        let context = self::context().backfill(&project);
        assert_eq!(context.description(), "bakery site");
    }

    #[test]
    fn test_prompt_without_prior_or_hint() {
        let prompt = build_step_prompt(GenerationMode::FullSite, Step::Structure, &context(), "");
        assert!(!prompt.contains("Previous code"));
        assert!(prompt.contains("bakery site"));
        assert!(prompt.contains("general"));
    }
}
