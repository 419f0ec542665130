use thiserror::Error;

/// Rejections raised before any processing of a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message must not be empty")]
    EmptyMessage,

    #[error("invalid userId '{0}': expected format user_<id>")]
    InvalidUserId(String),

    #[error("invalid conversationId '{0}'")]
    InvalidConversationId(String),
}

/// Fatal problems found while wiring the process together.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API credentials configured")]
    NoCredentials,

    #[error("invalid pattern for '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("{0}")]
    Other(String),
}
