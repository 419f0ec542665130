//! Digest fetch from an instant-answer source with an encyclopedia fallback.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use trinho_core::util::preview;
use url::Url;

use crate::DigestSource;

/// Injected into the prompt when both sources came back empty.
pub const NOT_FOUND_TEXT: &str = "Không tìm thấy thông tin cụ thể trên web cho câu hỏi này.";

/// Result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Digest {
    Found(String),
    NotFound,
}

impl Digest {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Found(text) => text,
            Self::NotFound => NOT_FOUND_TEXT,
        }
    }

    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "SearchConfig::default_enabled")]
    pub enabled: bool,

    /// Instant-answer JSON endpoint (DuckDuckGo API shape).
    #[serde(default = "SearchConfig::default_instant_answer_url")]
    pub instant_answer_url: String,

    /// Encyclopedia REST base; `{lang}` is replaced by `language`.
    #[serde(default = "SearchConfig::default_encyclopedia_url")]
    pub encyclopedia_url: String,

    #[serde(default = "SearchConfig::default_language")]
    pub language: String,

    #[serde(default = "SearchConfig::default_max_related")]
    pub max_related: usize,

    #[serde(default = "SearchConfig::default_user_agent")]
    pub user_agent: String,
}

impl SearchConfig {
    const fn default_enabled() -> bool {
        true
    }

    fn default_instant_answer_url() -> String {
        "https://api.duckduckgo.com/".to_string()
    }

    fn default_encyclopedia_url() -> String {
        "https://{lang}.wikipedia.org/api/rest_v1".to_string()
    }

    fn default_language() -> String {
        "vi".to_string()
    }

    const fn default_max_related() -> usize {
        3
    }

    fn default_user_agent() -> String {
        "Mozilla/5.0 (compatible; trinho/0.1)".to_string()
    }

    fn encyclopedia_base(&self) -> String {
        self.encyclopedia_url
            .replace("{lang}", &self.language)
            .trim_end_matches('/')
            .to_string()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            instant_answer_url: Self::default_instant_answer_url(),
            encyclopedia_url: Self::default_encyclopedia_url(),
            language: Self::default_language(),
            max_related: Self::default_max_related(),
            user_agent: Self::default_user_agent(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    abstract_text: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

/// Either a plain topic with `Text` or a named group with nested `Topics`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedTopic {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    topics: Vec<RelatedTopic>,
}

impl RelatedTopic {
    fn collect_texts<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            out.push(text);
        }
        for topic in &self.topics {
            topic.collect_texts(out);
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct EncyclopediaSummary {
    #[serde(default)]
    extract: String,
}

fn build_primary_digest(answer: &InstantAnswer, max_related: usize) -> Option<String> {
    let abstract_text = answer.abstract_text.trim();

    let mut related = Vec::new();
    for topic in &answer.related_topics {
        topic.collect_texts(&mut related);
    }
    related.truncate(max_related);

    if abstract_text.is_empty() && related.is_empty() {
        return None;
    }

    let mut sections = Vec::new();
    if !abstract_text.is_empty() {
        sections.push(abstract_text.to_string());
    }
    if !related.is_empty() {
        let numbered = related
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{}. {text}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("Thông tin liên quan:\n{numbered}"));
    }
    Some(sections.join("\n\n"))
}

/// HTTP digest fetcher.
pub struct WebSearcher {
    client: Client,
    config: SearchConfig,
}

impl WebSearcher {
    #[must_use]
    pub fn new(config: SearchConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    async fn instant_answer(&self, query: &str) -> Result<Option<String>> {
        let url = Url::parse_with_params(
            &self.config.instant_answer_url,
            &[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ],
        )
        .context("invalid instant answer URL")?;

        let answer = self
            .client
            .get(url)
            .header("User-Agent", &self.config.user_agent)
            .send()
            .await?
            .error_for_status()?
            .json::<InstantAnswer>()
            .await
            .context("failed to parse instant answer")?;

        Ok(build_primary_digest(&answer, self.config.max_related))
    }

    async fn encyclopedia(&self, query: &str) -> Result<Option<String>> {
        let mut url = Url::parse(&self.config.encyclopedia_base())
            .context("invalid encyclopedia URL")?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("encyclopedia URL cannot be a base"))?
            .pop_if_empty()
            .extend(["page", "summary", query]);

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.config.user_agent)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let summary = response
            .error_for_status()?
            .json::<EncyclopediaSummary>()
            .await
            .context("failed to parse encyclopedia summary")?;

        let extract = summary.extract.trim();
        Ok((!extract.is_empty()).then(|| format!("Theo Wikipedia: {extract}")))
    }

    async fn try_fetch(&self, query: &str) -> Result<Digest> {
        if let Some(text) = self.instant_answer(query).await? {
            return Ok(Digest::Found(text));
        }
        debug!("Instant answer empty, falling back to encyclopedia");

        if let Some(text) = self.encyclopedia(query).await? {
            return Ok(Digest::Found(text));
        }

        Ok(Digest::NotFound)
    }
}

#[async_trait]
impl DigestSource for WebSearcher {
    async fn fetch_digest(&self, query: &str) -> Option<Digest> {
        if !self.config.enabled {
            return None;
        }

        match self.try_fetch(query).await {
            Ok(digest) => {
                info!(
                    "Web digest for {:?}: {}",
                    preview(query, 60),
                    if digest.is_found() { "found" } else { "not found" }
                );
                Some(digest)
            }
            Err(e) => {
                warn!("Web search failed for {:?}: {e:#}", preview(query, 60));
                None
            }
        }
    }
}
