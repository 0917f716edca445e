//! relayd - Line-oriented TCP chat relay
//!
//! Accepts chat clients on a TCP port, relays their lines to each other
//! and answers `\`-prefixed commands.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default 0.0.0.0:5000
//! relayd
//!
//! # Custom port and capacity
//! relayd --listen 127.0.0.1:7000 --max-clients 20
//!
//! # Load settings from a file; flags still win
//! relayd --config /etc/relayd.toml --id-base 1
//!
//! # Enable debug logging
//! RUST_LOG=relayd=debug relayd
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: stop accepting and exit

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use relayd::config::RelayConfig;
use relayd::registry::spawn_registry;
use relayd::server::ChatServer;

/// relayd - line-oriented TCP chat relay
#[derive(Parser, Debug)]
#[command(name = "relayd", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on [default: 0.0.0.0:5000]
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Maximum number of simultaneously connected clients [default: 100]
    #[arg(long)]
    max_clients: Option<usize>,

    /// First client id handed out [default: 10]
    #[arg(long)]
    id_base: Option<u32>,

    /// Log directive added to RUST_LOG (e.g. "debug" or "relayd=trace")
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    /// Resolves the effective configuration: defaults, then file, then flags.
    fn resolve_config(&self) -> Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::load_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => RelayConfig::default(),
        };

        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(max_clients) = self.max_clients {
            config.max_clients = max_clients;
        }
        if let Some(id_base) = self.id_base {
            config.id_base = id_base;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.resolve_config()?;
    run_relay(config, args.log_level.as_deref())
}

/// Runs the relay (async entry point).
#[tokio::main]
async fn run_relay(config: RelayConfig, log_level: Option<&str>) -> Result<()> {
    // Initialize logging
    let mut filter = EnvFilter::from_default_env()
        .add_directive("relayd=info".parse()?)
        .add_directive("relay_core=info".parse()?)
        .add_directive("relay_protocol=info".parse()?);
    if let Some(level) = log_level {
        filter = filter.add_directive(
            level
                .parse()
                .with_context(|| format!("Invalid log directive: {level}"))?,
        );
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        max_clients = config.max_clients,
        "relayd starting"
    );

    // Create cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Setup signal handlers
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let registry = spawn_registry(config.registry_config());
    info!("Client registry started");

    let server = ChatServer::bind(&config, registry, cancel_token)
        .await
        .with_context(|| format!("Failed to start server on {}", config.listen))?;

    server.run().await;

    info!("relayd stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
