//! Provider adapter error types and retry classification.

/// Failure conditions reported by a completion provider adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ProviderErrorKind {
    /// API key environment variable missing or empty
    #[display("API key not configured (set {})", _0)]
    MissingApiKey(String),
    /// Provider is not part of the configured registry
    #[display("Provider '{}' is not configured", _0)]
    NotConfigured(String),
    /// Connection could not be established or was dropped
    #[display("Connection failed: {}", _0)]
    Connection(String),
    /// Request exceeded the adapter's deadline
    #[display("Request timed out: {}", _0)]
    Timeout(String),
    /// Provider answered with a non-success HTTP status
    #[display("HTTP {} error: {}", status_code, message)]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message from the response body
        message: String,
    },
    /// Response body could not be decoded
    #[display("Failed to parse provider response: {}", _0)]
    Parse(String),
    /// Request could not be built from the supplied inputs
    #[display("Invalid request: {}", _0)]
    InvalidRequest(String),
    /// Provider returned a success status without any generated text
    #[display("Provider returned an empty completion")]
    EmptyCompletion,
}

impl ProviderErrorKind {
    /// Check if this error type should be retried by the adapter.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderErrorKind::Api { status_code, .. } => {
                matches!(*status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            ProviderErrorKind::Connection(_) => true,
            ProviderErrorKind::Timeout(_) => true,
            _ => false,
        }
    }

    /// Get retry strategy parameters for this error type.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    pub fn retry_strategy_params(&self) -> (u64, usize, u64) {
        match self {
            ProviderErrorKind::Api { status_code, .. } => match *status_code {
                429 => (5000, 3, 40),
                503 => (2000, 4, 30),
                500 | 502 | 504 => (1000, 3, 8),
                408 => (2000, 3, 20),
                _ => (2000, 3, 30),
            },
            ProviderErrorKind::Connection(_) => (1000, 3, 10),
            ProviderErrorKind::Timeout(_) => (2000, 2, 20),
            _ => (2000, 3, 30),
        }
    }

    /// Stable machine-readable code for this failure.
    pub fn code(&self) -> String {
        match self {
            ProviderErrorKind::MissingApiKey(_) => "missing_api_key".to_string(),
            ProviderErrorKind::NotConfigured(_) => "not_configured".to_string(),
            ProviderErrorKind::Connection(_) => "connection_failed".to_string(),
            ProviderErrorKind::Timeout(_) => "timeout".to_string(),
            ProviderErrorKind::Api { status_code, .. } => format!("http_{}", status_code),
            ProviderErrorKind::Parse(_) => "parse_error".to_string(),
            ProviderErrorKind::InvalidRequest(_) => "invalid_request".to_string(),
            ProviderErrorKind::EmptyCompletion => "empty_response".to_string(),
        }
    }
}

/// Provider error with source location tracking.
///
/// # Examples
///
/// ```
/// use sitesmith_error::{ProviderError, ProviderErrorKind, RetryableError};
///
/// let err = ProviderError::new(ProviderErrorKind::Api {
///     status_code: 401,
///     message: "invalid key".to_string(),
/// });
/// assert!(!err.is_retryable());
/// assert_eq!(err.kind.code(), "http_401");
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} at line {} in {}", kind, line, file)]
pub struct ProviderError {
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Human-readable message without location details.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Result type for provider adapter operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait for errors that support retry logic.
///
/// Adapters consult this before retrying in place. The router never retries
/// the same provider; it moves on to the next candidate regardless.
///
/// # Examples
///
/// ```
/// use sitesmith_error::{ProviderError, ProviderErrorKind, RetryableError};
///
/// let err = ProviderError::new(ProviderErrorKind::Api {
///     status_code: 503,
///     message: "Service unavailable".to_string(),
/// });
///
/// assert!(err.is_retryable());
/// let (backoff, retries, _max_delay) = err.retry_strategy_params();
/// assert_eq!(backoff, 2000);
/// assert_eq!(retries, 4);
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    ///
    /// Transient errors like 503, 429 or network timeouts return true.
    /// Permanent errors like 401 or 400 return false.
    fn is_retryable(&self) -> bool;

    /// Get retry strategy parameters for this error.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        (2000, 3, 30)
    }
}

impl RetryableError for ProviderError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        self.kind.retry_strategy_params()
    }
}
