//! Static strategy pattern for CLI commands.
//!
//! Each subcommand is its own strategy type with its own input type. The
//! shared wiring in [`init_runtime`] builds the conversation manager once per
//! invocation.

use std::sync::Arc;
use tracing::{info, warn};
use trinho_config::Config;
use trinho_conversation::ConversationManager;
use trinho_core::{ChatCompletion, KvStore, SessionKey};
use trinho_memory::{InMemoryStore, RestKvStore, SessionStore};
use trinho_providers::{CompletionGateway, CredentialPool, OpenAiTransport};
use trinho_search::{DigestSource, WebSearcher};

mod chat;
mod clear;
mod history;
mod info;
mod init;
mod profile;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use clear::ClearStrategy;
pub use history::HistoryStrategy;
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use profile::ProfileStrategy;
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Identity arguments shared by the session commands.
#[derive(Debug, Clone)]
pub struct SessionInput {
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
}

impl SessionInput {
    pub fn key(&self) -> anyhow::Result<SessionKey> {
        Ok(SessionKey::resolve(
            self.user_id.as_deref(),
            self.conversation_id.as_deref(),
        )?)
    }
}

/// Remote store when configured, process memory otherwise.
fn select_store(config: &Config) -> Arc<dyn KvStore> {
    if let Some((url, token)) = config.storage.remote() {
        info!("Using remote key-value store at {url}");
        Arc::new(RestKvStore::new(url, token))
    } else {
        warn!("No remote key-value store configured; sessions are kept in memory only");
        Arc::new(InMemoryStore::new())
    }
}

fn session_store(config: &Config) -> SessionStore {
    SessionStore::new(select_store(config), config.storage.store_config())
}

/// Load config and wire the manager. An empty credential pool is fatal.
pub fn init_runtime() -> anyhow::Result<(Config, ConversationManager)> {
    let config = Config::load()?;

    let pool = CredentialPool::new(
        &config.providers.api_keys,
        config.providers.selection_strategy()?,
    )?;
    info!(
        "Credential pool: {} key(s), {:?} selection",
        pool.len(),
        pool.strategy()
    );

    let transport = OpenAiTransport::new(&config.providers.base_url);
    let completion: Arc<dyn ChatCompletion> =
        Arc::new(CompletionGateway::new(Arc::new(pool), transport));
    let search: Arc<dyn DigestSource> = Arc::new(WebSearcher::new(config.search.clone()));

    let manager = ConversationManager::new(
        completion,
        search,
        session_store(&config),
        config.conversation_config(),
    )?;

    Ok((config, manager))
}

/// Config and store only, for commands that never call the model.
pub fn init_store() -> anyhow::Result<SessionStore> {
    let config = Config::load()?;
    Ok(session_store(&config))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
