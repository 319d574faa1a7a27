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

mod command;

use clap::{Parser, Subcommand};
use command::{
    ChatInput, ChatStrategy, CommandStrategy, InfoStrategy, InitStrategy, ParseInput,
    ParseStrategy, VersionStrategy,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cora")]
#[command(about = "Cora multi-agent shopping assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the routed shopping agents
    Chat {
        /// Session to use
        #[arg(short, long)]
        session: Option<String>,

        /// Single message to send
        #[arg(short = 'm', long)]
        message: Option<String>,

        /// Model to use for agent replies
        #[arg(short = 'M', long)]
        model: Option<String>,

        /// Agent to start with (cora, interior_designer, inventory_agent, customer_loyalty, cart_manager)
        #[arg(short, long)]
        domain: Option<String>,
    },
    /// Normalize a raw agent reply into the response JSON
    Parse {
        /// Reply text; read from stdin when omitted
        text: Option<String>,
    },
    /// Show configuration
    Info,
    /// Initialize configuration
    Init,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            session,
            message,
            model,
            domain,
        } => {
            ChatStrategy
                .execute(ChatInput {
                    session_id: session,
                    message,
                    model,
                    domain,
                })
                .await
        }
        Commands::Parse { text } => ParseStrategy.execute(ParseInput { text }).await,
        Commands::Info => InfoStrategy.execute(()).await,
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
