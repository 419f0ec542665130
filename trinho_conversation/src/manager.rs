//! Conversation manager: one call per incoming message.
//!
//! A turn runs validate → command check → load state → optional web search →
//! compose prompt → complete → extract memory → persist → respond. State is
//! read at the start and written at the end with no lock in between.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};
use trinho_core::util::preview;
use trinho_core::{
    ChatCompletion, ChatMessage, CompletionError, CompletionRequest, ConfigError,
    FactMap, SessionKey, ValidationError,
};
use trinho_memory::{
    ClearReport, ExtractorConfig, HistoryView, MemoryExtractor, ProfileView, SessionStore,
};
use trinho_search::{Digest, DigestSource, SearchTrigger, TriggerConfig};

use crate::command::{Command, CommandConfig};
use crate::error::ConversationError;
use crate::history::HistoryWindow;
use crate::prompt::{PersonaConfig, PromptComposer};
use crate::session::TurnSession;

/// Appended to replies that used a found web digest.
pub const WEB_FOOTER: &str = "\n\n🌐 _Thông tin được cập nhật từ web_";

fn memory_footer(summary: &str) -> String {
    format!("\n\n💾 _Đã ghi nhớ: {summary}_")
}

/// Generation parameters for the main chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "ModelConfig::default_model")]
    pub model: String,

    #[serde(default = "ModelConfig::default_temperature")]
    pub temperature: f32,

    #[serde(default = "ModelConfig::default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "ModelConfig::default_top_p")]
    pub top_p: f32,
}

impl ModelConfig {
    fn default_model() -> String {
        "llama-3.3-70b-versatile".to_string()
    }

    const fn default_temperature() -> f32 {
        0.7
    }

    const fn default_max_tokens() -> u32 {
        1024
    }

    const fn default_top_p() -> f32 {
        1.0
    }

    fn request(&self, messages: Vec<ChatMessage>) -> CompletionRequest {
        CompletionRequest::new(&self.model, messages)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_top_p(self.top_p)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            temperature: Self::default_temperature(),
            max_tokens: Self::default_max_tokens(),
            top_p: Self::default_top_p(),
        }
    }
}

/// Everything the manager needs besides its collaborators.
#[derive(Debug, Clone, Default)]
pub struct ConversationConfig {
    pub model: ModelConfig,
    /// Extraction settings; the model defaults to the chat model when unset.
    pub extraction: Option<ExtractorConfig>,
    pub persona: PersonaConfig,
    pub trigger: TriggerConfig,
    pub commands: CommandConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl TurnRequest {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            user_id: None,
            conversation_id: None,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    #[must_use]
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Validated key, with defaults filled in for missing identifiers.
    pub fn session_key(&self) -> Result<SessionKey, ValidationError> {
        SessionKey::resolve(self.user_id.as_deref(), self.conversation_id.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub success: bool,
    pub message: String,
    pub user_id: String,
    pub conversation_id: String,
    pub history_length: usize,
    pub memory_updated: bool,
    pub profile_count: usize,
    pub web_search_used: bool,
}

/// Orchestrates a conversation turn over injected collaborators.
pub struct ConversationManager {
    completion: Arc<dyn ChatCompletion>,
    search: Arc<dyn DigestSource>,
    store: SessionStore,
    trigger: SearchTrigger,
    extractor: MemoryExtractor,
    composer: PromptComposer,
    commands: CommandConfig,
    window: HistoryWindow,
    model: ModelConfig,
}

impl ConversationManager {
    /// Fails only when a trigger pattern does not compile.
    pub fn new(
        completion: Arc<dyn ChatCompletion>,
        search: Arc<dyn DigestSource>,
        store: SessionStore,
        config: ConversationConfig,
    ) -> Result<Self, ConfigError> {
        let trigger = SearchTrigger::new(&config.trigger)?;
        let extraction = config
            .extraction
            .unwrap_or_else(|| ExtractorConfig::new(&config.model.model));
        let window = HistoryWindow::new(store.config().max_history);

        info!(
            "Conversation manager ready: model={}, store={}, triggers={}",
            config.model.model,
            store.backend(),
            trigger.category_names().len()
        );

        Ok(Self {
            extractor: MemoryExtractor::new(completion.clone(), extraction),
            completion,
            search,
            store,
            trigger,
            composer: PromptComposer::new(config.persona),
            commands: config.commands,
            window,
            model: config.model,
        })
    }

    #[must_use]
    pub const fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Process one incoming message.
    pub async fn handle_message(
        &self,
        request: TurnRequest,
    ) -> Result<TurnResponse, ConversationError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        let key = request.session_key()?;

        info!("Turn for {key}: {:?}", preview(message, 80));

        if let Some(command) = self.commands.parse(message) {
            return self.run_command(command, key).await;
        }

        let mut session = TurnSession::load(&self.store, key).await;
        session.add_message(ChatMessage::user(message));

        let digest = self.web_digest(message).await;
        let system_prompt = self
            .composer
            .build_system_prompt(&session.profile, digest.as_ref().map(Digest::text));

        let messages = self
            .window
            .build_llm_messages(&system_prompt, &session.history);
        let reply = self
            .completion
            .complete(&self.model.request(messages))
            .await
            .and_then(|reply| {
                let reply = reply.trim().to_string();
                if reply.is_empty() {
                    Err(CompletionError::InvalidResponse("empty reply".to_string()))
                } else {
                    Ok(reply)
                }
            })
            .map_err(|e| {
                error!(
                    "Completion failed for {}: {e} (message: {:?})",
                    session.key,
                    preview(message, 80)
                );
                ConversationError::from_completion(e)
            })?;

        let mut decorated = reply;
        if digest.as_ref().is_some_and(Digest::is_found) {
            decorated.push_str(WEB_FOOTER);
        }

        let extraction = self.extractor.extract(message, &session.profile).await;
        let changed = session.apply_extraction(&extraction);
        if changed > 0 {
            info!("Learned {changed} fact(s) about {}", session.key.user_id());
            session
                .persist_memory(&self.store, &extraction, changed)
                .await;
            if !extraction.summary.is_empty() {
                decorated.push_str(&memory_footer(&extraction.summary));
            }
        }

        session.add_message(ChatMessage::assistant(decorated.clone()));
        let history_length = session.persist_history(&self.store).await;

        Ok(TurnResponse {
            success: true,
            message: decorated,
            user_id: session.key.user_id().to_string(),
            conversation_id: session.key.conversation_id().to_string(),
            history_length,
            memory_updated: changed > 0,
            profile_count: session.profile.len(),
            web_search_used: digest.is_some(),
        })
    }

    async fn web_digest(&self, message: &str) -> Option<Digest> {
        let category = self.trigger.matched_category(message)?;
        debug!("Web search triggered by category {category}");
        self.search.fetch_digest(message).await
    }

    /// Memory commands never reach the model and are not added to history.
    /// A failed profile write is reported, never confirmed.
    async fn run_command(
        &self,
        command: Command,
        key: SessionKey,
    ) -> Result<TurnResponse, ConversationError> {
        info!("Memory command {command:?} for {}", key.user_id());

        let mut profile = TurnSession::load_profile(&self.store, &key).await;
        let mut memory_updated = false;

        let message = match command {
            Command::ShowMemory => Command::memory_listing(&profile),
            Command::ForgetAll => {
                self.store.delete_profile(&key).await.inspect_err(|e| {
                    error!("Failed to delete profile for {}: {e:#}", key.user_id());
                })?;
                memory_updated = !profile.is_empty();
                profile = FactMap::new();
                Command::forget_all_reply()
            }
            Command::ForgetKey(label) => {
                let removed = profile.remove(&label).is_some();
                if removed {
                    self.store.save_profile(&key, &profile).await.inspect_err(|e| {
                        error!("Failed to save profile for {}: {e:#}", key.user_id());
                    })?;
                    memory_updated = true;
                }
                Command::forget_key_reply(&label, removed)
            }
        };

        let history_length = self.store.load_history(&key).await.map_or(0, |h| h.len());

        Ok(TurnResponse {
            success: true,
            message,
            user_id: key.user_id().to_string(),
            conversation_id: key.conversation_id().to_string(),
            history_length,
            memory_updated,
            profile_count: profile.len(),
            web_search_used: false,
        })
    }

    pub async fn history(&self, key: &SessionKey) -> Result<HistoryView, ConversationError> {
        Ok(self.store.history_view(key).await?)
    }

    pub async fn profile(&self, key: &SessionKey) -> Result<ProfileView, ConversationError> {
        Ok(self.store.profile_view(key).await?)
    }

    pub async fn clear_session(&self, key: &SessionKey) -> Result<ClearReport, ConversationError> {
        Ok(self.store.clear_session(key).await?)
    }
}
