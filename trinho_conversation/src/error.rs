use serde::Serialize;
use thiserror::Error;
use trinho_core::{CompletionError, ValidationError};

/// Shown to the user when every credential was rate limited.
pub const OVERLOADED_MESSAGE: &str =
    "Hệ thống đang quá tải, vui lòng thử lại sau ít phút.";

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{}", OVERLOADED_MESSAGE)]
    Overloaded(#[source] CompletionError),

    #[error("completion failed: {0}")]
    Completion(#[source] CompletionError),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl ConversationError {
    /// Pool exhaustion becomes [`Self::Overloaded`]; everything else stays
    /// a plain completion failure.
    #[must_use]
    pub fn from_completion(error: CompletionError) -> Self {
        if error.is_exhausted() || error.is_rate_limit() {
            Self::Overloaded(error)
        } else {
            Self::Completion(error)
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Overloaded(_) => "overloaded",
            Self::Completion(_) => "completion",
            Self::Storage(_) => "storage",
        }
    }

    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            success: false,
            error: self.to_string(),
            kind: self.kind().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub kind: String,
}
