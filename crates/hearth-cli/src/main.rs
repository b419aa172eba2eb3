//! Hearth - gateway client runner.
//!
//! Loads layered configuration, sets up logging, registers the logging
//! listeners and keeps a gateway session alive until Ctrl-C.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hearth_gateway::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod config_bridge;
mod listeners;

/// Hearth - keep a gateway session and guild cache alive
#[derive(Parser)]
#[command(name = "hearth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a configuration file, layered over the user config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[arg(short, long)]
    verbose: bool,

    /// Request the full member list of every guild that becomes available
    #[arg(long)]
    request_members: bool,

    /// Print the resolved configuration (without the token) and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = hearth_config::Config::load(cli.config.as_deref())
        .context("failed to load configuration")?;
    let config = resolved.config;

    if cli.print_config {
        print!("{}", config.to_toml().context("failed to render configuration")?);
        return Ok(());
    }

    let mut log_config = config_bridge::to_log_config(&config);
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = hearth_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    for path in &resolved.loaded_files {
        info!(path = %path.display(), "Using config file");
    }

    let gateway_config = config_bridge::to_gateway_config(&config)?;
    let mut client = Client::new(gateway_config);
    listeners::register(&mut client, cli.request_members);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        info!("Interrupt received, shutting down");
        signal.cancel();
    });

    client.run(shutdown).await.map_err(|e| {
        error!(error = %e, "Gateway client stopped");
        anyhow::Error::new(e)
    })?;

    info!("Disconnected");
    Ok(())
}
