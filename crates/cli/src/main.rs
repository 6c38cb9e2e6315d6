//! QuranLens CLI, the main entry point.
//!
//! Commands:
//! - `serve`    Start the HTTP/SSE gateway
//! - `ask`      Run the research agent once and stream the answer
//! - `tools`    Print the tool catalog
//! - `migrate`  Apply the bundled database schema
//! - `config`   Print the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "quranlens",
    about = "QuranLens: a tool-calling research agent over the Quran and its tafsir",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to ~/.quranlens/config.toml)
    #[arg(short, long, global = true, env = "QURANLENS_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask the agent a single question
    Ask {
        /// The question
        prompt: String,

        /// Model to use instead of the configured default
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List the tools offered to the model
    Tools {
        /// Print the full JSON definitions
        #[arg(long)]
        json: bool,
    },

    /// Apply the database schema
    Migrate,

    /// Show the effective configuration with secrets redacted
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Ask { prompt, model } => commands::ask::run(config, prompt, model).await?,
        Commands::Tools { json } => commands::tools::run(json)?,
        Commands::Migrate => commands::migrate::run(config).await?,
        Commands::Config => commands::config_cmd::run(config)?,
    }

    Ok(())
}
