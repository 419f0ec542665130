//! Completion request/response contract shared by the gateway, the memory
//! extractor and the conversation manager.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::ChatMessage;

static RATE_LIMIT_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)(rate[ _-]?limit|too many requests|quota)").ok());

/// Returns true when an error message reads like a rate-limit rejection.
#[must_use]
pub fn looks_rate_limited(message: &str) -> bool {
    RATE_LIMIT_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(message))
}

/// Generation parameters plus the ordered message list.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub stream: bool,
}

impl CompletionRequest {
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 0.7,
            max_tokens: 1024,
            top_p: 1.0,
            stream: false,
        }
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub const fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("completion API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("all {attempts} credentials exhausted, last error: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<CompletionError>,
    },
}

impl CompletionError {
    /// Classify an HTTP failure: 429 or a rate-limit phrase in the body.
    #[must_use]
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 429 || looks_rate_limited(&body) {
            Self::RateLimited(format!("{status}: {body}"))
        } else {
            Self::Api { status, body }
        }
    }

    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Api { status, body } => *status == 429 || looks_rate_limited(body),
            Self::Transport(msg) => looks_rate_limited(msg),
            Self::InvalidResponse(_) | Self::Exhausted { .. } => false,
        }
    }

    /// True when the whole credential pool was exhausted by rate limiting.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Run one completion and return the assistant text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}
