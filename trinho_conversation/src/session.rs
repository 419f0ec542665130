//! Per-request conversation state.
//!
//! A [`TurnSession`] is loaded at the start of a turn, mutated in memory and
//! written back at the end. Nothing here is locked: two turns for the same
//! session each work on their own copy and the later write wins.

use tracing::{error, warn};
use trinho_core::{ChatMessage, FactMap, SessionKey};
use trinho_memory::{ExtractionResult, SessionStore, truncate_history};

#[derive(Debug, Clone)]
pub struct TurnSession {
    pub key: SessionKey,
    pub history: Vec<ChatMessage>,
    pub profile: FactMap,
    max_history: usize,
}

impl TurnSession {
    /// Read history and profile. A failed read leaves that part empty.
    pub async fn load(store: &SessionStore, key: SessionKey) -> Self {
        let history = store.load_history(&key).await.unwrap_or_else(|e| {
            warn!("Failed to load history for {key}: {e:#}");
            Vec::new()
        });
        let profile = Self::load_profile(store, &key).await;

        Self {
            key,
            history,
            profile,
            max_history: store.config().max_history,
        }
    }

    pub async fn load_profile(store: &SessionStore, key: &SessionKey) -> FactMap {
        store.load_profile(key).await.unwrap_or_else(|e| {
            warn!("Failed to load profile for {}: {e:#}", key.user_id());
            FactMap::new()
        })
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.history.len()
    }

    /// Append a turn and drop the oldest beyond the window.
    pub fn add_message(&mut self, message: ChatMessage) {
        self.history.push(message);
        truncate_history(&mut self.history, self.max_history);
    }

    /// Merge extracted facts. Returns how many entries changed.
    pub fn apply_extraction(&mut self, extraction: &ExtractionResult) -> usize {
        if extraction.has_new_info {
            self.profile.merge(&extraction.updates)
        } else {
            0
        }
    }

    /// Best-effort write of profile, summary and tracker after an extraction.
    pub async fn persist_memory(
        &self,
        store: &SessionStore,
        extraction: &ExtractionResult,
        changed: usize,
    ) {
        if let Err(e) = store.save_profile(&self.key, &self.profile).await {
            error!("Failed to save profile for {}: {e:#}", self.key.user_id());
        }
        let summary = extraction.summary.as_str();
        let saved = if summary.is_empty() {
            Ok(())
        } else {
            store.save_summary(&self.key, summary).await
        };
        if let Err(e) = saved {
            error!("Failed to save summary for {}: {e:#}", self.key);
        }
        if let Err(e) = store.record_extraction(&self.key, changed).await {
            error!("Failed to update extraction tracker for {}: {e:#}", self.key);
        }
    }

    /// Best-effort history write. Returns the resulting length.
    pub async fn persist_history(&self, store: &SessionStore) -> usize {
        match store.save_history(&self.key, &self.history).await {
            Ok(len) => len,
            Err(e) => {
                error!("Failed to save history for {}: {e:#}", self.key);
                self.history.len()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trinho_memory::{InMemoryStore, MAX_HISTORY_TURNS, StoreConfig};

    #[tokio::test]
    async fn add_message_caps_window() {
        let store = SessionStore::new(Arc::new(InMemoryStore::new()), StoreConfig::default());
        let key = SessionKey::new("user_a", None).unwrap_or_else(|e| panic!("{e}"));
        let mut session = TurnSession::load(&store, key).await;

        for i in 0..(MAX_HISTORY_TURNS + 7) {
            session.add_message(ChatMessage::user(format!("{i}")));
        }

        assert_eq!(session.message_count(), MAX_HISTORY_TURNS);
        assert_eq!(session.history[0].content, "7");
    }

    #[test]
    fn extraction_without_new_info_changes_nothing() {
        let key = SessionKey::new("user_a", None).unwrap_or_else(|e| panic!("{e}"));
        let mut session = TurnSession {
            key,
            history: Vec::new(),
            profile: FactMap::new(),
            max_history: MAX_HISTORY_TURNS,
        };
        assert_eq!(session.apply_extraction(&ExtractionResult::none()), 0);
        assert!(session.profile.is_empty());
    }
}
