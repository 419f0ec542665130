#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod command;

use command::{
    ChatInput, ChatStrategy, ClearStrategy, CommandStrategy, HistoryStrategy, InfoStrategy,
    InitStrategy, ProfileStrategy, SessionInput, VersionStrategy,
};

#[derive(Parser)]
#[command(name = "trinho")]
#[command(about = "trinho conversational assistant with long-term memory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct SessionArgs {
    /// User id (user_<id>); defaults to user_anonymous
    #[arg(short = 'u', long)]
    user: Option<String>,

    /// Conversation id; defaults to "default"
    #[arg(short = 'c', long)]
    conversation: Option<String>,
}

impl From<SessionArgs> for SessionInput {
    fn from(args: SessionArgs) -> Self {
        Self {
            user_id: args.user,
            conversation_id: args.conversation,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively, or send one message with --message
    Chat {
        #[command(flatten)]
        session: SessionArgs,

        /// Single message to send
        #[arg(short = 'm', long)]
        message: Option<String>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the stored history of a conversation
    History {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Show what is remembered about a user
    Profile {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Delete a conversation's history (the profile is kept)
    Clear {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Show configuration with secrets masked
    Info,
    /// Initialize configuration
    Init,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            session,
            message,
            json,
        } => {
            ChatStrategy
                .execute(ChatInput {
                    session: session.into(),
                    message,
                    json,
                })
                .await
        }
        Commands::History { session } => HistoryStrategy.execute(session.into()).await,
        Commands::Profile { session } => ProfileStrategy.execute(session.into()).await,
        Commands::Clear { session } => ClearStrategy.execute(session.into()).await,
        Commands::Info => InfoStrategy.execute(()).await,
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
