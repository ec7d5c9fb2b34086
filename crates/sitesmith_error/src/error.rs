//! Top-level error wrapper types.

use crate::{ConfigError, GenerationError, ProviderError, StorageError};

/// Foundation error enum spanning every Sitesmith error family.
///
/// # Examples
///
/// ```
/// use sitesmith_error::{SitesmithError, StorageError, StorageErrorKind};
///
/// let err: SitesmithError = StorageError::new(StorageErrorKind::Unavailable("pool".into())).into();
/// assert!(format!("{}", err).contains("Storage Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum SitesmithErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Provider adapter error
    #[from(ProviderError)]
    Provider(ProviderError),
    /// Durable or ephemeral storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Generation orchestration error
    #[from(GenerationError)]
    Generation(GenerationError),
    /// Filesystem error
    #[from(std::io::Error)]
    Io(std::io::Error),
    /// JSON serialization error
    #[from(serde_json::Error)]
    Json(serde_json::Error),
}

/// Sitesmith error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Sitesmith Error: {}", _0)]
pub struct SitesmithError(Box<SitesmithErrorKind>);

impl SitesmithError {
    /// Create a new error from a kind.
    pub fn new(kind: SitesmithErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &SitesmithErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to SitesmithErrorKind
impl<T> From<T> for SitesmithError
where
    T: Into<SitesmithErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Sitesmith operations.
pub type SitesmithResult<T> = std::result::Result<T, SitesmithError>;
