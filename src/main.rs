//! sniffd
//!
//! Single-port protocol-demultiplexing proxy: accepts a connection, reads
//! just enough of it to decide which configured protocol it speaks, and
//! hands it off to that protocol's backend.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use plfm_sniffer::config::Configuration;
use plfm_sniffer::net::{Listener, DEFAULT_MAX_CONNECTIONS};

#[derive(Debug, Parser)]
#[command(name = "sniffd", about = "Protocol-demultiplexing TCP proxy")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "SNIFFD_CONFIG")]
    config: std::path::PathBuf,

    /// Override the bind address from the configuration file.
    #[arg(short, long, env = "SNIFFD_LISTEN")]
    listen: Option<SocketAddr>,

    /// Maximum concurrent connections.
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Configuration::load_file(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    let default_filter = match config.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let bind_addr = cli
        .listen
        .context("no --listen address given and the configuration format has no bind address field")?;

    info!(entries = config.entries.len(), bind_addr = %bind_addr, "starting sniffd");

    let config = Arc::new(config);
    let listener = Listener::bind(bind_addr, config, cli.max_connections)
        .await
        .context("binding listener")?;

    Arc::new(listener).run().await.context("listener loop")
}
