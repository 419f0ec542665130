use tracing::info;

use super::{SessionInput, init_store, print_json};

/// Deletes one conversation's history, summary and extraction tracker.
/// The user's profile is left alone.
#[derive(Debug, Clone, Copy)]
pub struct ClearStrategy;

impl super::CommandStrategy for ClearStrategy {
    type Input = SessionInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let key = input.key()?;
        let report = init_store()?.clear_session(&key).await?;
        info!("Cleared {} record(s) for {key}", report.cleared.len());
        print_json(&report)
    }
}
