use trinho_config::Config;
use trinho_core::util::preview;
use trinho_providers::Credential;

/// Strategy for displaying configuration information.
///
/// API keys and the key-value token are masked.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== trinho Configuration ===\n");

        println!("Providers:");
        println!("  Base URL: {}", config.providers.base_url);
        println!("  Strategy: {}", config.providers.strategy);
        if config.providers.api_keys.is_empty() {
            println!("  API Keys: (none)");
        } else {
            for key in &config.providers.api_keys {
                println!("  API Key: {}", Credential::new(key.as_str()).masked());
            }
        }
        println!();

        println!("Model:");
        println!("  Model: {}", config.model.model);
        println!("  Max Tokens: {}", config.model.max_tokens);
        println!("  Temperature: {}", config.model.temperature);
        println!("  Top P: {}", config.model.top_p);
        println!();

        println!("Storage:");
        match config.storage.remote() {
            Some((url, token)) => {
                println!("  Backend: remote");
                println!("  URL: {url}");
                println!("  Token: {}", Credential::new(token).masked());
            }
            None => println!("  Backend: memory (not persisted)"),
        }
        println!("  Max History: {}", config.storage.max_history);
        println!("  History TTL: {}s", config.storage.history_ttl_secs);
        println!();

        println!("Persona:");
        println!("  {}", preview(&config.persona.sentence(), 80));
        println!();

        println!("Web Search:");
        println!("  Enabled: {}", config.search.enabled && config.trigger.enabled);
        println!("  Language: {}", config.search.language);
        let names: Vec<&str> = config
            .trigger
            .categories
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        println!("  Triggers: {}", names.join(", "));

        Ok(())
    }
}
