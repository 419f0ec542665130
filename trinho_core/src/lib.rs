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

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod completion;
pub mod error;
pub mod fact_map;
pub mod session_key;
pub mod util;

pub use completion::{ChatCompletion, CompletionError, CompletionRequest};
pub use error::{ConfigError, ValidationError};
pub use fact_map::FactMap;
pub use session_key::{DEFAULT_CONVERSATION_ID, DEFAULT_USER_ID, SessionKey};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// One message in a completion request or a stored conversation turn.
///
/// Stored history only ever holds `User` and `Assistant` turns; `System`
/// appears in outbound requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Which storage service actually served a read or write.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Remote,
    Memory,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Minimal key-value contract the session store is built on.
///
/// Values are JSON text. Implementations give best-effort semantics only; no
/// transactions or compare-and-set are offered.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> anyhow::Result<()>;

    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    fn backend(&self) -> StoreBackend;
}
