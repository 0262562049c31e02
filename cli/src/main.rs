//! CLI for Thermowatch
//!
//! Commands:
//! - monitor: Watch a temperature feed and alert on threshold violations
//! - thresholds: Show or change the stored alert range
//! - fetch: Take a single reading from the configured feed
//! - history: List recent readings kept by a remote sensor

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thermowatch_engine::config::MonitorConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "thermowatch")]
#[command(about = "Thermowatch - temperature monitoring and alerting", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); THERMOWATCH_* environment variables override it
    #[arg(short, long, global = true, env = "THERMOWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor the configured feed until interrupted
    Monitor(commands::monitor::MonitorArgs),

    /// Show or change the alert thresholds
    #[command(subcommand)]
    Thresholds(commands::thresholds::ThresholdsCommand),

    /// Fetch a single reading
    Fetch(commands::fetch::FetchArgs),

    /// List the remote reading history (http feed only)
    History(commands::fetch::HistoryArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config =
        MonitorConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Monitor(args) => commands::monitor::run(args, config).await,
        Commands::Thresholds(cmd) => commands::thresholds::run(cmd, config).await,
        Commands::Fetch(args) => commands::fetch::run(args, config).await,
        Commands::History(args) => commands::fetch::run_history(args, config).await,
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}
