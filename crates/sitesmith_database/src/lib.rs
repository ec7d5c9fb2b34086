//! SQLite persistence for Sitesmith.
//!
//! This crate provides the Diesel schema, embedded migrations and the
//! [`SqliteProjectStore`] implementation of
//! [`ProjectStore`](sitesmith_interface::ProjectStore) for projects, per-step
//! generation records, the usage ledger and finalized build logs.
//!
//! # Example
//!
//! ```no_run
//! use sitesmith_core::NewProject;
//! use sitesmith_database::SqliteProjectStore;
//! use sitesmith_interface::ProjectStore;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteProjectStore::connect("sitesmith.db")?;
//! let new = NewProject::builder()
//!     .owner_id("user-1")
//!     .description("A bakery website")
//!     .build()?;
//! let id = store.create_project(new).await?;
//! assert!(store.get_project(id).await?.is_some());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod models;
mod store;

/// Diesel table definitions.
#[allow(missing_docs)]
pub mod schema;

pub use connection::{MIGRATIONS, SqlitePool, establish_pool, is_in_memory, run_migrations};
pub use models::{BuildLogRow, GenerationRecordRow, ProjectRow, UsageRecordRow};
pub use store::SqliteProjectStore;
