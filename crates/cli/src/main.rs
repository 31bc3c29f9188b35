//! ArchMentor CLI — the main entry point.
//!
//! Commands:
//! - `chat`     — Interactive tutoring session or single-message mode
//! - `serve`    — Start the HTTP gateway
//! - `explain`  — Show how a message would be classified and routed
//! - `config`   — Show, validate or locate the configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "archmentor",
    about = "ArchMentor — a Socratic design tutor for architecture students",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Load configuration from this file instead of ~/.archmentor/config.toml
    #[arg(short, long, global = true, env = "ARCHMENTOR_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the tutor
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Session id to use
        #[arg(short, long, default_value = "cli")]
        session: String,

        /// Reference to a sketch or drawing for the message
        #[arg(short, long)]
        image: Option<String>,

        /// Print the response metadata block after each reply
        #[arg(long)]
        metadata: bool,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Classify and route a message without answering it
    Explain {
        /// The message to explain
        text: String,

        /// Earlier messages to run through the session first
        #[arg(short, long)]
        after: Vec<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Print the configuration file path
    Path,
    /// Print a commented default configuration
    Default,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Chat {
            message,
            session,
            image,
            metadata,
        } => {
            let options = commands::chat::ChatOptions {
                session,
                image,
                metadata,
            };
            commands::chat::run(config_path, message, options).await?
        }
        Commands::Serve { port, host } => commands::serve::run(config_path, port, host).await?,
        Commands::Explain { text, after } => commands::explain::run(config_path, text, after).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path)?,
            ConfigAction::Path => commands::config_cmd::path(config_path),
            ConfigAction::Default => commands::config_cmd::default(),
        },
    }

    Ok(())
}
