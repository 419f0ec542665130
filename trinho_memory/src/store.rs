use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use trinho_core::{ChatMessage, FactMap, KvStore, Role, SessionKey, StoreBackend};

use crate::kv::decode_record;

/// Upper bound on stored turns per conversation.
pub const MAX_HISTORY_TURNS: usize = 50;

/// Drop the oldest turns until at most `max` remain.
pub fn truncate_history<T>(turns: &mut Vec<T>, max: usize) {
    let excess = turns.len().saturating_sub(max);
    if excess > 0 {
        turns.drain(..excess);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "StoreConfig::default_max_history")]
    pub max_history: usize,

    /// Expiry applied to history, summary and tracker records.
    #[serde(default = "StoreConfig::default_history_ttl_secs")]
    pub history_ttl_secs: u64,
}

impl StoreConfig {
    const fn default_max_history() -> usize {
        MAX_HISTORY_TURNS
    }

    const fn default_history_ttl_secs() -> u64 {
        30 * 24 * 60 * 60
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_history: Self::default_max_history(),
            history_ttl_secs: Self::default_history_ttl_secs(),
        }
    }
}

/// Bookkeeping for extraction runs within one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionTracker {
    #[serde(default)]
    pub extractions: u32,
    #[serde(default)]
    pub facts_written: u32,
    #[serde(default)]
    pub last_extracted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub is_user: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryView {
    pub history: Vec<HistoryEntry>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub profile: FactMap,
    pub summary: Option<String>,
    pub profile_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearReport {
    pub user_id: String,
    pub conversation_id: String,
    pub cleared: Vec<String>,
    pub backend: StoreBackend,
}

/// Typed access to the records of one deployment.
///
/// Every method is a plain read or a plain write. Callers doing
/// read-modify-write (append a turn, merge facts) race with concurrent callers
/// on the same key and the last write wins.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
    config: StoreConfig,
}

impl SessionStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>, config: StoreConfig) -> Self {
        Self { kv, config }
    }

    #[must_use]
    pub fn backend(&self) -> StoreBackend {
        self.kv.backend()
    }

    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    async fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.kv.get(key).await? {
            Some(raw) if !raw.trim().is_empty() => decode_record(&raw).map(Some),
            _ => Ok(None),
        }
    }

    pub async fn load_history(&self, key: &SessionKey) -> Result<Vec<ChatMessage>> {
        let mut turns: Vec<ChatMessage> = self
            .read(&key.history_key())
            .await?
            .unwrap_or_default();
        turns.retain(|t| matches!(t.role, Role::User | Role::Assistant));
        Ok(turns)
    }

    /// Truncate to the configured window and write with the history expiry.
    /// Returns the number of stored turns.
    pub async fn save_history(&self, key: &SessionKey, turns: &[ChatMessage]) -> Result<usize> {
        let mut turns = turns.to_vec();
        truncate_history(&mut turns, self.config.max_history);
        let json = serde_json::to_string(&turns)?;
        self.kv
            .set_ex(&key.history_key(), &json, self.config.history_ttl_secs)
            .await?;
        debug!("Saved {} turns for {key}", turns.len());
        Ok(turns.len())
    }

    pub async fn load_profile(&self, key: &SessionKey) -> Result<FactMap> {
        Ok(self.read(&key.profile_key()).await?.unwrap_or_default())
    }

    /// Profiles never expire.
    pub async fn save_profile(&self, key: &SessionKey, facts: &FactMap) -> Result<()> {
        let json = serde_json::to_string(facts)?;
        self.kv.set(&key.profile_key(), &json).await?;
        debug!("Saved {} facts for {}", facts.len(), key.user_id());
        Ok(())
    }

    pub async fn delete_profile(&self, key: &SessionKey) -> Result<()> {
        self.kv.delete(&key.profile_key()).await?;
        info!("Deleted profile for {}", key.user_id());
        Ok(())
    }

    pub async fn load_summary(&self, key: &SessionKey) -> Result<Option<String>> {
        self.read(&key.summary_key()).await
    }

    pub async fn save_summary(&self, key: &SessionKey, summary: &str) -> Result<()> {
        let json = serde_json::to_string(summary)?;
        self.kv
            .set_ex(&key.summary_key(), &json, self.config.history_ttl_secs)
            .await
    }

    pub async fn load_tracker(&self, key: &SessionKey) -> Result<ExtractionTracker> {
        Ok(self.read(&key.tracker_key()).await?.unwrap_or_default())
    }

    /// Count one extraction that wrote `facts_written` facts.
    pub async fn record_extraction(
        &self,
        key: &SessionKey,
        facts_written: usize,
    ) -> Result<ExtractionTracker> {
        let mut tracker = self.load_tracker(key).await?;
        tracker.extractions = tracker.extractions.saturating_add(1);
        tracker.facts_written = tracker
            .facts_written
            .saturating_add(u32::try_from(facts_written).unwrap_or(u32::MAX));
        tracker.last_extracted_at = Some(Utc::now());

        let json = serde_json::to_string(&tracker)?;
        self.kv
            .set_ex(&key.tracker_key(), &json, self.config.history_ttl_secs)
            .await?;
        Ok(tracker)
    }

    pub async fn history_view(&self, key: &SessionKey) -> Result<HistoryView> {
        let turns = self.load_history(key).await?;
        let history: Vec<HistoryEntry> = turns
            .into_iter()
            .enumerate()
            .map(|(i, turn)| HistoryEntry {
                id: format!("msg_{i}"),
                is_user: turn.role == Role::User,
                role: turn.role,
                content: turn.content,
            })
            .collect();
        Ok(HistoryView {
            total: history.len(),
            history,
        })
    }

    pub async fn profile_view(&self, key: &SessionKey) -> Result<ProfileView> {
        let profile = self.load_profile(key).await?;
        let summary = self.load_summary(key).await?;
        Ok(ProfileView {
            profile_count: profile.len(),
            profile,
            summary,
        })
    }

    /// Delete history, summary and tracker. The per-user profile is kept.
    pub async fn clear_session(&self, key: &SessionKey) -> Result<ClearReport> {
        let cleared = vec![key.history_key(), key.summary_key(), key.tracker_key()];
        for record in &cleared {
            self.kv.delete(record).await?;
        }
        info!("Cleared session {key} on {} store", self.backend());
        Ok(ClearReport {
            user_id: key.user_id().to_string(),
            conversation_id: key.conversation_id().to_string(),
            cleared,
            backend: self.backend(),
        })
    }
}
