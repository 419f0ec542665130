//! Key-value backends.
//!
//! [`RestKvStore`] talks to an Upstash-compatible REST endpoint. When no remote
//! store is configured the process falls back to [`InMemoryStore`], which lives
//! only as long as the process does.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;
use trinho_core::{KvStore, StoreBackend};

/// Decode a stored record.
///
/// Records are written as JSON text, but some writers double-encode them as a
/// JSON string that itself contains JSON. Both forms are accepted.
pub fn decode_record<T: DeserializeOwned>(raw: &str) -> Result<T> {
    match serde_json::from_str::<T>(raw) {
        Ok(value) => Ok(value),
        Err(direct) => match serde_json::from_str::<String>(raw) {
            Ok(inner) => serde_json::from_str::<T>(&inner).context("invalid nested record"),
            Err(_) => Err(direct).context("invalid record"),
        },
    }
}

#[derive(Debug, Deserialize)]
struct RestResponse {
    #[serde(default)]
    result: Option<Box<RawValue>>,
    #[serde(default)]
    error: Option<String>,
}

/// Turn a REST `result` into stored text: strings are unwrapped, already
/// parsed objects are kept as their JSON text.
fn result_text(raw: &RawValue) -> Result<String> {
    let text = raw.get().trim();
    if text.starts_with('"') {
        serde_json::from_str::<String>(text).context("invalid string result")
    } else {
        Ok(text.to_string())
    }
}

/// Upstash-style REST client: every command is a JSON array POSTed to the base URL.
pub struct RestKvStore {
    client: Client,
    url: String,
    token: String,
}

impl RestKvStore {
    #[must_use]
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn command(&self, args: Value) -> Result<Option<Box<RawValue>>> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await
            .context("key-value request failed")?;

        let status = response.status();
        let body: RestResponse = response
            .json()
            .await
            .with_context(|| format!("invalid key-value response (status {status})"))?;

        if let Some(error) = body.error {
            bail!("key-value store error: {error}");
        }
        if !status.is_success() {
            bail!("key-value store returned {status}");
        }
        Ok(body.result)
    }
}

#[async_trait]
impl KvStore for RestKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        debug!("KV GET {key}");
        match self.command(json!(["GET", key])).await? {
            Some(raw) => result_text(&raw).map(Some),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        debug!("KV SET {key}");
        self.command(json!(["SET", key, value])).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        debug!("KV SET {key} EX {ttl_secs}");
        self.command(json!(["SET", key, value, "EX", ttl_secs]))
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        debug!("KV DEL {key}");
        self.command(json!(["DEL", key])).await?;
        Ok(())
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Remote
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Process-local fallback store with lazy expiry.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KvStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Memory
    }
}
