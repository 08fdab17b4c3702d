//! Hermes CLI - terminal consumer for the Hermes download service's
//! real-time event streams

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hermes_client::HermesClient;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "hermes")]
#[command(author, version, about = "Hermes download service event-stream CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Server URL
    #[arg(
        short,
        long,
        env = "HERMES_SERVER",
        default_value = "http://localhost:8000"
    )]
    server: String,

    /// Bearer token for authenticated endpoints
    #[arg(short, long, env = "HERMES_TOKEN")]
    token: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "HERMES_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow one download's progress
    Watch {
        /// Download ID
        download: String,
    },

    /// Follow queue membership changes
    Queue,

    /// Follow aggregate statistics updates
    Stats,

    /// Mint a stream token for a channel scope
    Token {
        /// Channel scope: "download:<id>", "queue", or "stats"
        scope: String,

        /// Token lifetime in seconds (clamped to the server's window)
        #[arg(long, default_value = "600")]
        ttl: u64,
    },

    /// Show event-stream service health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(Some(&cli.server), cli.token.as_deref(), cli.no_color);

    // Create output context
    let ctx = OutputContext::new(cli.output, merged.no_color, cli.quiet);

    let client = create_client(&merged.server, merged.token.as_deref())?;

    match &cli.command {
        Commands::Watch { download } => {
            commands::watch(&client, download, &ctx).await?;
        }

        Commands::Queue => {
            commands::queue(&client, &ctx).await?;
        }

        Commands::Stats => {
            commands::stats(&client, &ctx).await?;
        }

        Commands::Token { scope, ttl } => {
            commands::token(&client, scope, *ttl, &ctx).await?;
        }

        Commands::Health => {
            commands::health(&client, &ctx).await?;
        }
    }

    Ok(())
}

/// Create a Hermes client for the given server URL
fn create_client(server: &str, token: Option<&str>) -> Result<HermesClient> {
    match token {
        Some(token) => HermesClient::with_bearer_token(server, token),
        None => HermesClient::new(server),
    }
    .context("Failed to create Hermes client")
}
