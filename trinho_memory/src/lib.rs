#![warn(
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

//! Session state and long-term user memory.
//!
//! - [`kv`]: the two key-value backends (remote REST service, in-process map)
//! - [`store`]: history, profile, summary and extraction-tracker records
//! - [`extractor`]: model-driven extraction of durable user facts

mod extractor;
pub mod kv;
mod store;

pub use extractor::{
    ExtractionResult, ExtractorConfig, MemoryExtractor, build_extraction_prompt, parse_extraction,
};
pub use kv::{InMemoryStore, RestKvStore, decode_record};
pub use store::{
    ClearReport, ExtractionTracker, HistoryEntry, HistoryView, MAX_HISTORY_TURNS, ProfileView,
    SessionStore, StoreConfig, truncate_history,
};
