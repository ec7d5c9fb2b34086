//! Artifact extraction from provider response text.
//!
//! Providers wrap code in markdown fences, surround it with commentary, or
//! return it bare. [`ArtifactExtractor`] tries a fixed sequence of strategies
//! and falls back to the trimmed raw text.

use regex::Regex;
use sitesmith_error::{GenerationError, GenerationErrorKind, GenerationResult};

/// Strategy that produced an [`Extraction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ExtractionMethod {
    /// Backtick code fences
    CodeFence,
    /// Tilde code fences
    TildeFence,
    /// Full HTML document
    HtmlDocument,
    /// Outermost structural markup region
    MarkupSection,
    /// Stylesheet content
    Css,
    /// JSON value
    Json,
    /// Nothing recognised, raw text returned
    Raw,
}

/// Extracted artifact and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Extracted code, trimmed
    pub code: String,
    /// Strategy that matched
    pub method: ExtractionMethod,
}

impl Extraction {
    /// Whether no strategy matched and the raw text was used.
    pub fn is_fallback(&self) -> bool {
        self.method == ExtractionMethod::Raw
    }
}

/// Compiled extraction patterns.
///
/// # Examples
///
/// ```
/// use sitesmith_pipeline::{ArtifactExtractor, ExtractionMethod};
///
/// let extractor = ArtifactExtractor::new().unwrap();
/// let found = extractor.extract("Here you go:\n```html\n<p>Hi</p>\n```\nEnjoy!");
/// assert_eq!(found.code, "<p>Hi</p>");
/// assert_eq!(found.method, ExtractionMethod::CodeFence);
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactExtractor {
    backtick_fence: Regex,
    tilde_fence: Regex,
    document_marker: Regex,
    document: Regex,
    section: Regex,
    css: Regex,
}

fn compile(pattern: &str) -> GenerationResult<Regex> {
    Regex::new(pattern).map_err(|e| {
        GenerationError::new(GenerationErrorKind::InternalFault(format!(
            "invalid extraction pattern: {}",
            e
        )))
    })
}

impl ArtifactExtractor {
    /// Compile the extraction patterns.
    pub fn new() -> GenerationResult<Self> {
        Ok(Self {
            backtick_fence: compile(
                r"```(?:html|css|javascript|js|json|xml|php)?\s*([\s\S]*?)```",
            )?,
            tilde_fence: compile(r"~~~(?:html|css|javascript|js|json|xml|php)?\s*([\s\S]*?)~~~")?,
            document_marker: compile(r"(?i)<!DOCTYPE|<html")?,
            document: compile(r"(?i)(<!DOCTYPE[^>]*>[\s\S]*</html>)")?,
            section: compile(
                r"(?i)(<(?:section|div|header|footer|main|article)[^>]*>[\s\S]*</(?:section|div|header|footer|main|article)>)",
            )?,
            css: compile(r"<style[\s\S]*?</style>|[\w-]+\s*\{[^}]+\}")?,
        })
    }

    /// Extract the artifact from response text.
    pub fn extract(&self, content: &str) -> Extraction {
        if let Some(code) = Self::fenced(&self.backtick_fence, content) {
            return Extraction {
                code,
                method: ExtractionMethod::CodeFence,
            };
        }
        if let Some(code) = Self::fenced(&self.tilde_fence, content) {
            return Extraction {
                code,
                method: ExtractionMethod::TildeFence,
            };
        }

        let trimmed = content.trim();
        if self.document_marker.is_match(content) {
            let code = self
                .document
                .find(content)
                .map(|m| m.as_str().trim())
                .unwrap_or(trimmed);
            return Extraction {
                code: code.to_string(),
                method: ExtractionMethod::HtmlDocument,
            };
        }
        if let Some(m) = self.section.find(content) {
            return Extraction {
                code: m.as_str().trim().to_string(),
                method: ExtractionMethod::MarkupSection,
            };
        }
        if self.css.is_match(content) {
            return Extraction {
                code: trimmed.to_string(),
                method: ExtractionMethod::Css,
            };
        }
        if (trimmed.starts_with('{') || trimmed.starts_with('['))
            && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
        {
            return Extraction {
                code: trimmed.to_string(),
                method: ExtractionMethod::Json,
            };
        }

        Extraction {
            code: trimmed.to_string(),
            method: ExtractionMethod::Raw,
        }
    }

    fn fenced(pattern: &Regex, content: &str) -> Option<String> {
        let blocks: Vec<&str> = pattern
            .captures_iter(content)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .filter(|block| !block.is_empty())
            .collect();
        if blocks.is_empty() {
            None
        } else {
            Some(blocks.join("\n\n"))
        }
    }
}
