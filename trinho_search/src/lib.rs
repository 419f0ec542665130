#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! On-demand web augmentation.
//!
//! [`SearchTrigger`] decides whether a message needs live facts and
//! [`WebSearcher`] fetches a short digest for it. Fetch failures never reach
//! the caller; they come back as `None`.

mod digest;
mod trigger;

use async_trait::async_trait;

pub use digest::{Digest, NOT_FOUND_TEXT, SearchConfig, WebSearcher};
pub use trigger::{SearchTrigger, TriggerCategory, TriggerConfig, default_categories};

/// Anything that can turn a query into an optional digest.
#[async_trait]
pub trait DigestSource: Send + Sync {
    /// `None` means the lookup failed; nothing should be injected.
    async fn fetch_digest(&self, query: &str) -> Option<Digest>;
}
