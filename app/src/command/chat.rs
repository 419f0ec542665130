//! Conversation turns from the command line.
//!
//! With `--message` a single turn is sent; otherwise lines are read from stdin
//! until `exit`.

use std::io::Write;
use tracing::debug;
use trinho_conversation::{ConversationManager, TurnRequest};

use super::{SessionInput, init_runtime, print_json};

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    pub session: SessionInput,
    /// Single message to send (non-interactive mode)
    pub message: Option<String>,
    /// Print the full turn response as JSON
    pub json: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl ChatStrategy {
    fn request(session: &SessionInput, message: &str) -> TurnRequest {
        TurnRequest {
            message: message.to_string(),
            user_id: session.user_id.clone(),
            conversation_id: session.conversation_id.clone(),
        }
    }

    async fn single_turn(
        manager: &ConversationManager,
        session: &SessionInput,
        message: &str,
        json: bool,
    ) -> anyhow::Result<()> {
        match manager.handle_message(Self::request(session, message)).await {
            Ok(response) if json => print_json(&response),
            Ok(response) => {
                println!("{}", response.message);
                Ok(())
            }
            Err(e) if json => print_json(&e.to_response()),
            Err(e) => Err(e.into()),
        }
    }

    async fn run_interactive(
        manager: &ConversationManager,
        session: &SessionInput,
    ) -> anyhow::Result<()> {
        println!("=== trinho ===");
        println!("Type 'exit', 'quit', or Ctrl+C to end the session.\n");

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let mut input = String::new();
            if std::io::stdin().read_line(&mut input)? == 0 {
                break;
            }
            let input = input.trim();

            if matches!(input, "exit" | "quit" | "q") {
                break;
            }
            if input.is_empty() {
                continue;
            }

            match manager.handle_message(Self::request(session, input)).await {
                Ok(response) => {
                    println!("\n{}\n", response.message);
                    debug!(
                        "history={}, facts={}, web={}",
                        response.history_length, response.profile_count, response.web_search_used
                    );
                }
                Err(e) => eprintln!("Error: {}", e.to_response().error),
            }
        }

        Ok(())
    }
}

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let (_config, manager) = init_runtime()?;

        if let Some(message) = input.message {
            Self::single_turn(&manager, &input.session, &message, input.json).await
        } else {
            Self::run_interactive(&manager, &input.session).await
        }
    }
}
