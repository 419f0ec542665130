use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use trinho_conversation::{CommandConfig, ConversationConfig, ModelConfig, PersonaConfig};
use trinho_core::ConfigError;
use trinho_memory::{ExtractorConfig, StoreConfig};
use trinho_providers::SelectionStrategy;
use trinho_search::{SearchConfig, TriggerConfig};

/// Comma-separated completion API keys; replaces `providers.api_keys`.
pub const ENV_API_KEYS: &str = "TRINHO_API_KEYS";
/// REST key-value endpoint; replaces `storage.kv_url`.
pub const ENV_KV_URL: &str = "TRINHO_KV_URL";
/// REST key-value token; replaces `storage.kv_token`.
pub const ENV_KV_TOKEN: &str = "TRINHO_KV_TOKEN";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractorConfig>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub commands: CommandConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    /// OpenAI-compatible API base, without the `/chat/completions` suffix.
    #[serde(default = "ProvidersConfig::default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_keys: Vec<String>,
    /// `random` or `round_robin`.
    #[serde(default = "ProvidersConfig::default_strategy")]
    pub strategy: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            api_keys: Vec::new(),
            strategy: Self::default_strategy(),
        }
    }
}

impl ProvidersConfig {
    fn default_base_url() -> String {
        "https://api.groq.com/openai/v1".to_string()
    }

    fn default_strategy() -> String {
        "random".to_string()
    }

    pub fn selection_strategy(&self) -> Result<SelectionStrategy, ConfigError> {
        self.strategy.parse()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Remote store; the in-process store is used when either part is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kv_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kv_token: Option<String>,
    #[serde(default = "StorageConfig::default_max_history")]
    pub max_history: usize,
    #[serde(default = "StorageConfig::default_history_ttl_secs")]
    pub history_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let store = StoreConfig::default();
        Self {
            kv_url: None,
            kv_token: None,
            max_history: store.max_history,
            history_ttl_secs: store.history_ttl_secs,
        }
    }
}

impl StorageConfig {
    fn default_max_history() -> usize {
        StoreConfig::default().max_history
    }

    fn default_history_ttl_secs() -> u64 {
        StoreConfig::default().history_ttl_secs
    }

    /// URL and token when both are present and non-blank.
    #[must_use]
    pub fn remote(&self) -> Option<(&str, &str)> {
        let url = self.kv_url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        let token = self
            .kv_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())?;
        Some((url, token))
    }

    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        StoreConfig {
            max_history: self.max_history,
            history_ttl_secs: self.history_ttl_secs,
        }
    }
}

const CONFIG_TEMPLATE: &str = r#"{
  "model": {
    "model": "llama-3.3-70b-versatile",
    "temperature": 0.7,
    "max_tokens": 1024,
    "top_p": 1.0
  },
  "providers": {
    "base_url": "https://api.groq.com/openai/v1",
    "api_keys": ["your-api-key-1", "your-api-key-2"],
    "strategy": "random"
  },
  "storage": {
    "kv_url": "https://your-database.upstash.io",
    "kv_token": "your-rest-token",
    "max_history": 50,
    "history_ttl_secs": 2592000
  },
  "persona": {
    "name": "Trí Nhớ",
    "role": "trợ lý AI thân thiện",
    "creator": "nhóm phát triển Trinho",
    "language_directive": "Luôn trả lời bằng tiếng Việt."
  },
  "search": {
    "enabled": true,
    "language": "vi",
    "max_related": 3
  }
}"#;

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("trinho"))
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read `~/trinho/config.json` and apply environment overrides.
    ///
    /// A missing file is fine when the API keys come from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path()?;
        let env = |name: &str| std::env::var(name).ok();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            info!("Loaded config from {}", config_path.display());
            Self::from_json(&content)?
        } else if env(ENV_API_KEYS).is_some() {
            info!("No config file, using defaults with environment overrides");
            Self::default()
        } else {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'trinho init' to create config.",
                config_path.display()
            );
        };

        config.apply_overrides(env);
        Ok(config)
    }

    /// Replace file values with whatever `lookup` returns for the known
    /// environment variables.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(keys) = lookup(ENV_API_KEYS) {
            self.providers.api_keys = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Some(url) = lookup(ENV_KV_URL) {
            self.storage.kv_url = Some(url);
        }
        if let Some(token) = lookup(ENV_KV_TOKEN) {
            self.storage.kv_token = Some(token);
        }
    }

    #[must_use]
    pub fn conversation_config(&self) -> ConversationConfig {
        ConversationConfig {
            model: self.model.clone(),
            extraction: self.extraction.clone(),
            persona: self.persona.clone(),
            trigger: self.trigger.clone(),
            commands: self.commands.clone(),
        }
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, CONFIG_TEMPLATE)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Add one or more API keys under providers.api_keys");
        println!("   2. Set storage.kv_url and storage.kv_token, or remove them to keep sessions in memory");
        println!("   3. Run 'trinho chat' to start a conversation");
        println!();
        println!("🔧 Environment overrides:");
        println!("   - {ENV_API_KEYS}: comma-separated API keys");
        println!("   - {ENV_KV_URL} / {ENV_KV_TOKEN}: remote key-value store");
        println!();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn template_parses() {
        let config = Config::from_json(CONFIG_TEMPLATE).expect("template should parse");
        assert_eq!(config.providers.api_keys.len(), 2);
        assert_eq!(config.storage.max_history, 50);
        assert_eq!(config.storage.history_ttl_secs, 2_592_000);
        assert_eq!(config.search.max_related, 3);
        assert!(config.storage.remote().is_some());
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn empty_object_gets_defaults() {
        let config = Config::from_json("{}").expect("empty config should parse");
        assert!(config.providers.api_keys.is_empty());
        assert_eq!(
            config.providers.selection_strategy().ok(),
            Some(SelectionStrategy::Random)
        );
        assert!(config.storage.remote().is_none());
        assert_eq!(config.commands.show_memory.len(), 4);
        assert_eq!(config.trigger.categories.len(), 8);
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut config = Config::default();
        config.providers.api_keys = vec!["from-file".to_string()];

        config.apply_overrides(|name| match name {
            ENV_API_KEYS => Some(" key-a, ,key-b ".to_string()),
            ENV_KV_URL => Some("https://kv.example".to_string()),
            ENV_KV_TOKEN => Some("tok".to_string()),
            _ => None,
        });

        assert_eq!(config.providers.api_keys, vec!["key-a", "key-b"]);
        assert_eq!(config.storage.remote(), Some(("https://kv.example", "tok")));
    }

    #[test]
    fn blank_remote_settings_mean_in_memory() {
        let storage = StorageConfig {
            kv_url: Some("https://kv.example".to_string()),
            kv_token: Some("  ".to_string()),
            ..StorageConfig::default()
        };
        assert!(storage.remote().is_none());
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let providers = ProvidersConfig {
            strategy: "weighted".to_string(),
            ..ProvidersConfig::default()
        };
        assert!(providers.selection_strategy().is_err());
    }
}
