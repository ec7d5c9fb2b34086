//! Configuration errors.

/// A configuration file, environment value or CLI setting that cannot be used.
///
/// Carries only a message; the call site is captured for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Configuration error: {} ({}:{})", message, file, line)]
pub struct ConfigError {
    /// What was wrong with the setting
    pub message: String,
    /// Line of the construction site
    pub line: u32,
    /// File of the construction site
    pub file: &'static str,
}

impl ConfigError {
    /// Wrap `message`, recording where the error was raised.
    ///
    /// # Examples
    ///
    /// ```
    /// use sitesmith_error::ConfigError;
    ///
    /// let err = ConfigError::new("Unknown provider 'mistral'");
    /// assert!(err.message.contains("mistral"));
    /// assert!(err.to_string().starts_with("Configuration error: Unknown provider"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
