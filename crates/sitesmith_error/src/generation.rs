//! Generation orchestration error taxonomy.

use crate::ProviderError;

/// Conditions that end a generation attempt.
///
/// Every variant carries a stable [`code`](GenerationErrorKind::code) for callers
/// and a human-readable `Display` message.
#[derive(Debug, Clone, derive_more::Display)]
pub enum GenerationErrorKind {
    /// Request lacks a description and names no existing project
    #[display("Invalid request: {}", _0)]
    InvalidRequest(String),
    /// Caller exceeded the per-period request cap
    #[display(
        "Rate limit exceeded for '{}': {} requests per {}s (retry in {}s)",
        caller,
        limit,
        period_secs,
        retry_after_secs
    )]
    RateLimited {
        /// Caller identity that was throttled
        caller: String,
        /// Configured request cap per period
        limit: u32,
        /// Period length in seconds
        period_secs: u64,
        /// Seconds until the current window resets
        retry_after_secs: u64,
    },
    /// No provider is configured at all
    #[display("No AI providers are configured")]
    NoProvidersAvailable,
    /// Every candidate provider failed; carries the last failure
    #[display("All providers failed (last: {}): {}", provider, error.kind)]
    ProviderFailure {
        /// Provider that produced the last error
        provider: String,
        /// Last observed provider error
        error: ProviderError,
    },
    /// A step's extracted artifact was empty
    #[display("Step {} ({}) produced no code", step, step_name)]
    EmptyStepOutput {
        /// Step index
        step: u8,
        /// Step name
        step_name: String,
    },
    /// Provider response did not have a usable shape
    #[display("Invalid provider response: {}", _0)]
    ResponseShapeInvalid(String),
    /// Final artifact failed structural validation
    #[display("Generated code failed validation: {}", _0)]
    ArtifactStructurallyInvalid(String),
    /// Persisted artifact could not be confirmed on read-back
    #[display("Save verification failed: {}", _0)]
    SaveVerificationFailed(String),
    /// Whole-run deadline elapsed
    #[display("Generation timed out after {}s", _0)]
    TimedOut(u64),
    /// Unexpected fault inside the engine
    #[display("Internal fault: {}", _0)]
    InternalFault(String),
}

impl GenerationErrorKind {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            GenerationErrorKind::InvalidRequest(_) => "invalid_request",
            GenerationErrorKind::RateLimited { .. } => "rate_limited",
            GenerationErrorKind::NoProvidersAvailable => "no_providers_available",
            GenerationErrorKind::ProviderFailure { .. } => "provider_failure",
            GenerationErrorKind::EmptyStepOutput { .. } => "empty_step_output",
            GenerationErrorKind::ResponseShapeInvalid(_) => "response_shape_invalid",
            GenerationErrorKind::ArtifactStructurallyInvalid(_) => "artifact_structurally_invalid",
            GenerationErrorKind::SaveVerificationFailed(_) => "save_verification_failed",
            GenerationErrorKind::TimedOut(_) => "timed_out",
            GenerationErrorKind::InternalFault(_) => "internal_fault",
        }
    }
}

/// Generation error with source location tracking.
///
/// # Examples
///
/// ```
/// use sitesmith_error::{GenerationError, GenerationErrorKind};
///
/// let err = GenerationError::new(GenerationErrorKind::NoProvidersAvailable);
/// assert_eq!(err.code(), "no_providers_available");
/// assert_eq!(err.message(), "No AI providers are configured");
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Stable code of the underlying kind.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Human-readable message without location details.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Result type for generation operations.
pub type GenerationResult<T> = Result<T, GenerationError>;
