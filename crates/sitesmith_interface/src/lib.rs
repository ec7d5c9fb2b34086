//! Trait definitions for the Sitesmith engine's external collaborators.
//!
//! The orchestrator depends only on these seams: completion providers, the
//! durable project store, the short-lived keyed store, and a monotonic clock.

mod clock;
mod store;
mod traits;

pub use clock::{Clock, SystemClock};
pub use store::{EphemeralStore, ProjectStore};
pub use traits::CompletionProvider;
