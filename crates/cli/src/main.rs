//! Snoid CLI — the main entry point.
//!
//! Commands:
//! - `run`     — Connect to Discord and critique the channel
//! - `chat`    — Talk to the bot locally on stdin/stdout
//! - `price`   — Show the rate and estimated cost for a model
//! - `doctor`  — Diagnose configuration and connectivity

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use snoid_config::BotConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "snoid",
    about = "Snoid — a terse fact-checking chat bot",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.snoid/config.toml)
    #[arg(short, long, global = true, env = "SNOID_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and start handling messages
    Run {
        /// Only listen in these channel IDs (repeatable)
        #[arg(long = "channel")]
        channels: Vec<String>,
    },

    /// Chat with the bot in the terminal
    Chat {
        /// Display name used for your messages
        #[arg(short, long, default_value = "you")]
        user: String,
    },

    /// Show pricing for a model
    Price {
        /// Model identifier, e.g. gpt-4o
        model: String,

        /// Input tokens to estimate for
        #[arg(long, default_value_t = 1000)]
        input_tokens: u32,

        /// Output tokens to estimate for
        #[arg(long, default_value_t = 1000)]
        output_tokens: u32,
    },

    /// Diagnose configuration and connectivity
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| BotConfig::config_dir().join("config.toml"));

    // Doctor reports a broken config instead of refusing to start.
    let loaded = BotConfig::load_with_env(&config_path);

    // Initialize tracing
    let fallback = match (&loaded, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.log_level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new(&fallback)
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(&fallback))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Commands::Doctor = cli.command {
        return commands::doctor::run(&config_path, loaded).await;
    }

    let config = loaded.map_err(|e| format!("Failed to load config: {e}"))?;
    match cli.command {
        Commands::Run { channels } => commands::run::run(config, channels).await?,
        Commands::Chat { user } => commands::chat::run(config, user).await?,
        Commands::Price {
            model,
            input_tokens,
            output_tokens,
        } => commands::price::run(&config, &model, input_tokens, output_tokens)?,
        Commands::Doctor => {}
    }

    Ok(())
}
