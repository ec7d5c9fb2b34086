//! Stateless checks on provider responses, artifacts and save inputs.

use crate::ArtifactKind;
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sitesmith_error::{GenerationError, GenerationErrorKind, GenerationResult};
use tracing::debug;
use uuid::Uuid;

/// Minimum length of an acceptable artifact, in bytes.
pub const MIN_ARTIFACT_LEN: usize = 50;

/// Outcome of one validator check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether every check passed
    pub valid: bool,
    /// Failure messages in the order they were found
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self::from_errors(vec![message.into()])
    }

    /// Headline message surfaced to callers.
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }

    /// All errors joined for logging.
    pub fn summary(&self) -> String {
        self.errors.join("; ")
    }
}

/// Build validator with precompiled patterns.
///
/// # Examples
///
/// ```
/// use sitesmith_pipeline::{ArtifactKind, BuildValidator};
///
/// let validator = BuildValidator::new().unwrap();
/// let report = validator.check_code("<p>hi</p>", ArtifactKind::FullDocument);
/// assert!(!report.valid);
/// assert_eq!(report.first_error(), Some("Generated code is too short"));
/// ```
#[derive(Debug, Clone)]
pub struct BuildValidator {
    markup: Regex,
    denylist: RegexSet,
}

const DANGEROUS_PATTERNS: &[&str] = &[
    r"(?i)eval\s*\(",
    r"(?i)exec\s*\(",
    r"(?i)system\s*\(",
    r"(?i)shell_exec\s*\(",
    r"(?i)passthru\s*\(",
    r"(?i)proc_open\s*\(",
    r"(?i)popen\s*\(",
    r#"(?i)file_get_contents\s*\(\s*["']?https?://"#,
    r"(?i)curl_exec\s*\(",
    r"(?i)base64_decode\s*\(",
];

impl BuildValidator {
    /// Compile the structural and denylist patterns.
    pub fn new() -> GenerationResult<Self> {
        let fault = |e: regex::Error| {
            GenerationError::new(GenerationErrorKind::InternalFault(format!(
                "invalid validator pattern: {}",
                e
            )))
        };
        Ok(Self {
            markup: Regex::new(
                r"(?i)<(html|body|div|section|header|footer|main|article|nav|aside|h[1-6]|p|span|a|img|ul|ol|li|table|form|input|button|script|style)",
            )
            .map_err(fault)?,
            denylist: RegexSet::new(DANGEROUS_PATTERNS).map_err(fault)?,
        })
    }

    /// Check the shape of a raw provider result record.
    pub fn check_response(&self, response: &JsonValue) -> ValidationReport {
        let Some(record) = response.as_object().filter(|r| !r.is_empty()) else {
            return ValidationReport::failed("Provider response is empty or invalid");
        };

        if let Some(error) = record.get("error").filter(|e| !e.is_null()) {
            let message = error
                .get("message")
                .and_then(JsonValue::as_str)
                .or_else(|| error.as_str())
                .unwrap_or("Provider returned an error");
            return ValidationReport::failed(message);
        }

        if !record.contains_key("content") && !record.contains_key("choices") {
            return ValidationReport::failed("Provider response has no content");
        }

        ValidationReport::from_errors(Vec::new())
    }

    /// Check an extracted artifact for the given kind.
    pub fn check_code(&self, code: &str, kind: ArtifactKind) -> ValidationReport {
        if code.trim().is_empty() {
            return ValidationReport::failed("Generated code is empty");
        }

        let mut errors = Vec::new();
        if code.len() < MIN_ARTIFACT_LEN {
            errors.push("Generated code is too short".to_string());
        }
        if !self.has_structure(code, kind) {
            errors.push(format!("Generated code lacks valid {} structure", kind));
        }
        if self.denylist.is_match(code) {
            let matched: Vec<usize> = self.denylist.matches(code).into_iter().collect();
            debug!(patterns = ?matched, "Denylisted construct in artifact");
            errors.push("Generated code contains dangerous content".to_string());
        }

        ValidationReport::from_errors(errors)
    }

    /// Check the inputs to a save read-back comparison.
    pub fn check_save(&self, project_id: Uuid, code: &str) -> ValidationReport {
        let mut errors = Vec::new();
        if project_id.is_nil() {
            errors.push("Invalid project identifier".to_string());
        }
        if code.trim().is_empty() {
            errors.push("Code is empty and cannot be saved".to_string());
        }
        ValidationReport::from_errors(errors)
    }

    fn has_structure(&self, code: &str, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::FullDocument
            | ArtifactKind::ReusableSection
            | ArtifactKind::Layout
            | ArtifactKind::ThemeTemplate => self.markup.is_match(code),
            ArtifactKind::StructuredBlock => {
                serde_json::from_str::<JsonValue>(code.trim()).is_ok() || self.markup.is_match(code)
            }
        }
    }
}
