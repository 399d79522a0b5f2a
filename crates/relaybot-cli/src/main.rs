//! Relaybot CLI — entry point.
//!
//! # Commands
//!
//! - `relaybot chat [-u USER]` — interactive chat (the demo transport)
//! - `relaybot status` — show configuration and provider status

mod repl;
mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use relaybot_core::config::load_config;
use relaybot_relay::Relay;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Relaybot — a conversational relay between chat and LLM backends
#[derive(Parser)]
#[command(name = "relaybot", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a config file (default: ~/.relaybot/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively with the relay
    Chat {
        /// User identity for the conversation history
        #[arg(short, long, default_value = "cli:local")]
        user: String,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and provider status
    Status,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Chat { user, logs } => {
            init_logging(logs);
            let config = load_config(config_path);
            // Configuration errors are fatal before any turn is served.
            let relay = Relay::new(&config).context("incomplete configuration")?;
            repl::run(relay, &user).await
        }
        Commands::Status => {
            init_logging(false);
            status::run(load_config(config_path))
        }
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` wins when set.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
