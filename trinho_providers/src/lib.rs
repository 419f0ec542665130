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

//! Completion API access: credential pool, rate-limit failover and the
//! OpenAI-compatible HTTP transport.

mod gateway;
mod openai;
mod pool;

pub use gateway::{CompletionGateway, CompletionTransport};
pub use openai::OpenAiTransport;
pub use pool::{Credential, CredentialPool, SelectionStrategy};
