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

//! Conversation orchestration.
//!
//! [`ConversationManager`] ties together the completion gateway, web
//! augmentation, the session store and the memory extractor. Memory commands
//! ("bạn nhớ gì về tôi", "/forget-all", ...) are answered without a model
//! call.

mod command;
mod error;
mod history;
mod manager;
mod prompt;
mod session;

pub use command::{Command, CommandConfig};
pub use error::{ConversationError, ErrorResponse, OVERLOADED_MESSAGE};
pub use history::HistoryWindow;
pub use manager::{
    ConversationConfig, ConversationManager, ModelConfig, TurnRequest, TurnResponse, WEB_FOOTER,
};
pub use prompt::{PersonaConfig, PromptComposer};
pub use session::TurnSession;
