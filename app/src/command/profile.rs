use super::{SessionInput, init_store, print_json};

/// Prints the remembered facts and the latest extraction summary as JSON.
#[derive(Debug, Clone, Copy)]
pub struct ProfileStrategy;

impl super::CommandStrategy for ProfileStrategy {
    type Input = SessionInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let key = input.key()?;
        let view = init_store()?.profile_view(&key).await?;
        print_json(&view)
    }
}
