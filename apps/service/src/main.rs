#![warn(clippy::all)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use nodewatch::{Config, DEFAULT_SHUTDOWN_GRACE, NodeMonitor, Snapshot};
use std::sync::Arc;
use tracing::info;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_tracing();
    let cli = Cli::parse();

    let config = Config::load(cli.config).context("Failed to load configuration")?;

    match cli.command {
        Command::Run => run(&config).await,
        Command::Once => {
            let snapshot = run_once(&config).await?;
            println!("{}", serde_json::to_string_pretty(&*snapshot)?);
            Ok(())
        }
        Command::Config => {
            println!("{config}");
            Ok(())
        }
    }
}

/// Poll until ctrl-c, then stop the poller within the grace period
async fn run(config: &Config) -> Result<()> {
    let monitor = NodeMonitor::from_config(config)?;
    let poller = monitor.start();

    info!(nodes = monitor.registry().len(), "Polling started, press ctrl-c to stop");
    tokio::signal::ctrl_c().await.context("Failed to listen for ctrl-c")?;

    info!("Shutdown requested");
    poller.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    Ok(())
}

/// One polling cycle over every configured node
async fn run_once(config: &Config) -> Result<Arc<Snapshot>> {
    let monitor = NodeMonitor::from_config(config)?;
    Ok(monitor.poller().run_cycle().await)
}
