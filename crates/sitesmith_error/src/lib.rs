//! Error types for the Sitesmith workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use sitesmith_error::{ConfigError, SitesmithResult};
//!
//! fn load() -> SitesmithResult<String> {
//!     Err(ConfigError::new("missing [generation] section"))?
//! }
//!
//! assert!(load().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod generation;
mod provider;
mod storage;

pub use config::ConfigError;
pub use error::{SitesmithError, SitesmithErrorKind, SitesmithResult};
pub use generation::{GenerationError, GenerationErrorKind, GenerationResult};
pub use provider::{ProviderError, ProviderErrorKind, ProviderResult, RetryableError};
pub use storage::{StorageError, StorageErrorKind, StorageResult};
