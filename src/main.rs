//! Letter Rush - unified CLI

#![warn(missing_docs)]

mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use letter_rush::{DatasetLoader, GameServer, ServerConfig};
use tracing::{info, instrument};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    initialize_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            host,
            port,
            config,
            data_dir,
        } => run_server(config, host, port, data_dir).await,
        Command::Datasets { data_dir, config } => print_datasets(config, data_dir),
    }
}

/// Run the HTTP/WebSocket game server
#[instrument(skip_all)]
async fn run_server(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    let config = resolve_config(config_path, host, port, data_dir)?;
    info!(
        host = %config.host(),
        port = config.port(),
        data_dir = %config.data_dir().display(),
        "Starting Letter Rush server"
    );

    GameServer::new(config)?.serve().await
}

/// Print per-topic dataset sizes
#[instrument(skip_all)]
fn print_datasets(config_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(config_path, None, None, data_dir)?;
    let sets = DatasetLoader::new(config.data_dir().clone()).load_all()?;
    for (topic, count) in sets.sizes() {
        println!("{topic}: {count}");
    }
    Ok(())
}

/// Config file and environment first, then command-line flags.
fn resolve_config(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> Result<ServerConfig> {
    let mut config = ServerConfig::load(config_path.as_deref())?;
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if let Some(data_dir) = data_dir {
        config = config.with_data_dir(data_dir);
    }
    Ok(config)
}

fn initialize_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,letter_rush=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
