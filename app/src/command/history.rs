use super::{SessionInput, init_store, print_json};

/// Prints the stored turns of one conversation as JSON.
#[derive(Debug, Clone, Copy)]
pub struct HistoryStrategy;

impl super::CommandStrategy for HistoryStrategy {
    type Input = SessionInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let key = input.key()?;
        let view = init_store()?.history_view(&key).await?;
        print_json(&view)
    }
}
