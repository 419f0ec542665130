//! Composite identity of one stored conversation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ValidationError;

/// Used when a request carries no conversation id.
pub const DEFAULT_CONVERSATION_ID: &str = "default";

/// Used when a chat request carries no user id.
pub const DEFAULT_USER_ID: &str = "user_anonymous";

static USER_ID_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^user_[A-Za-z0-9_-]{1,64}$").ok());

static CONVERSATION_ID_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").ok());

fn matches(pattern: &Lazy<Option<Regex>>, value: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(value))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKey {
    user_id: String,
    conversation_id: String,
}

impl SessionKey {
    /// Validate and build a key. A missing or blank conversation id falls back
    /// to [`DEFAULT_CONVERSATION_ID`].
    pub fn new(user_id: &str, conversation_id: Option<&str>) -> Result<Self, ValidationError> {
        let user_id = user_id.trim();
        if !matches(&USER_ID_PATTERN, user_id) {
            return Err(ValidationError::InvalidUserId(user_id.to_string()));
        }

        let conversation_id = conversation_id
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CONVERSATION_ID);
        if !matches(&CONVERSATION_ID_PATTERN, conversation_id) {
            return Err(ValidationError::InvalidConversationId(
                conversation_id.to_string(),
            ));
        }

        Ok(Self {
            user_id: user_id.to_string(),
            conversation_id: conversation_id.to_string(),
        })
    }

    /// Like [`Self::new`], but a missing or blank user id falls back to
    /// [`DEFAULT_USER_ID`].
    pub fn resolve(
        user_id: Option<&str>,
        conversation_id: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let user_id = user_id
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_USER_ID);
        Self::new(user_id, conversation_id)
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    #[must_use]
    pub fn history_key(&self) -> String {
        format!("chat:{}:{}:history", self.user_id, self.conversation_id)
    }

    #[must_use]
    pub fn summary_key(&self) -> String {
        format!("chat:{}:{}:summary", self.user_id, self.conversation_id)
    }

    #[must_use]
    pub fn tracker_key(&self) -> String {
        format!("chat:{}:{}:extraction", self.user_id, self.conversation_id)
    }

    /// Profiles belong to the user, not the conversation.
    #[must_use]
    pub fn profile_key(&self) -> String {
        format!("profile:{}", self.user_id)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.conversation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_conversation_id() {
        let key = SessionKey::new("user_42", None).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(key.conversation_id(), DEFAULT_CONVERSATION_ID);

        let blank = SessionKey::new("user_42", Some("  ")).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(blank, key);
    }

    #[test]
    fn resolve_defaults_blank_user() {
        for user in [None, Some(""), Some("   ")] {
            let key = SessionKey::resolve(user, Some(" ")).unwrap_or_else(|e| panic!("{e}"));
            assert_eq!(key.user_id(), DEFAULT_USER_ID);
            assert_eq!(key.conversation_id(), DEFAULT_CONVERSATION_ID);
        }
        assert!(SessionKey::resolve(Some("admin"), None).is_err());
    }

    #[test]
    fn rejects_bad_user_ids() {
        for bad in ["", "42", "admin", "user_", "user_a b", "USER_1"] {
            assert_eq!(
                SessionKey::new(bad, None),
                Err(ValidationError::InvalidUserId(bad.trim().to_string())),
                "{bad:?} should be rejected"
            );
        }
        assert!(SessionKey::new(DEFAULT_USER_ID, None).is_ok());
    }

    #[test]
    fn rejects_bad_conversation_ids() {
        assert!(matches!(
            SessionKey::new("user_1", Some("a:b")),
            Err(ValidationError::InvalidConversationId(_))
        ));
    }

    #[test]
    fn keys_are_deterministic() {
        let a = SessionKey::new("user_1", Some("trip")).unwrap_or_else(|e| panic!("{e}"));
        let b = SessionKey::new("user_1", Some("trip")).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(a.history_key(), b.history_key());
        assert_eq!(a.history_key(), "chat:user_1:trip:history");
        assert_eq!(a.summary_key(), "chat:user_1:trip:summary");
        assert_eq!(a.tracker_key(), "chat:user_1:trip:extraction");

        let other = SessionKey::new("user_1", Some("work")).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(a.profile_key(), other.profile_key());
    }
}
