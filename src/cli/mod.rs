//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `run` (default) -- run the bot on the console gateway
//! - `config show|get|path|schema` -- inspect configuration
//! - `version` -- print build/version info

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Channel poll bot.
#[derive(Parser, Debug)]
#[command(
    name = "pollbot",
    version = env!("CARGO_PKG_VERSION"),
    about = "pollbot: run quick polls in chat channels"
)]
pub struct Cli {
    /// Path to the config file (default: $POLLBOT_CONFIG or the user config dir).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the bot, reading JSON-line events from stdin (default when no subcommand is given).
    Run,

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration as JSON.
    Show,

    /// Print a specific configuration value by dot-notation path.
    Get {
        /// Dot-notation key (e.g. "logging.level", "maxVotesPerParticipant").
        key: String,
    },

    /// Print the resolved configuration file path.
    Path,

    /// Print the JSON schema of the configuration file.
    Schema,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

use crate::bot::PollBot;
use crate::config::{self, PollBotConfig};
use crate::gateway::{console, ConsoleGateway, DynGateway};
use crate::polls::create_engine;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Capacity of the inbound event queue
const EVENT_QUEUE_CAPACITY: usize = 256;

/// Run the bot on stdin/stdout until EOF or Ctrl-C.
pub async fn handle_run(config: PollBotConfig) -> Result<(), Box<dyn std::error::Error>> {
    let engine = create_engine(config.poll_settings());
    let gateway: DynGateway = Arc::new(ConsoleGateway::stdout());
    let bot = PollBot::new(engine, gateway);

    let sweeper = bot.spawn_sweeper(config.sweep_interval());

    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let reader = tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        match console::read_events(stdin, event_tx).await {
            Ok(count) => info!(count, "stdin closed"),
            Err(e) => warn!(error = %e, "failed to read stdin"),
        }
    });

    // The sender outlives the signal task, which may exit early on error.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl-C, shutting down");
                let _ = signal_tx.send(true);
            }
            Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
        }
    });

    info!(
        max_votes = config.max_votes_per_participant,
        sweep_interval_secs = config.sweep_interval_seconds,
        vote_scope = ?config.vote_scope,
        "pollbot running on console gateway"
    );
    bot.run(event_rx, shutdown_rx).await;

    reader.abort();
    sweeper.shutdown().await;
    drop(shutdown_tx);
    Ok(())
}

/// Run the `config show` subcommand.
pub fn handle_config_show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config(config_path)?;
    println!("{}", serde_json::to_string_pretty(&cfg)?);
    Ok(())
}

/// Run the `config get <key>` subcommand.
pub fn handle_config_get(
    config_path: Option<&Path>,
    key: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = serde_json::to_value(config::load_config(config_path)?)?;
    match get_value_at_path(&cfg, key) {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        None => {
            eprintln!("Key not found: {}", key);
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path(config_path: Option<&Path>) {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path);
    println!("{}", path.display());
}

/// Run the `config schema` subcommand.
pub fn handle_config_schema() -> Result<(), Box<dyn std::error::Error>> {
    let schema = config::schema::generate_config_schema();
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("pollbot {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("POLLBOT_BUILD_DATE"));
    println!("  Git commit: {}", env!("POLLBOT_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Navigate a JSON value by dot-notation path and return the leaf value.
fn get_value_at_path(root: &Value, path: &str) -> Option<Value> {
    let mut current = root;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current.clone())
}
