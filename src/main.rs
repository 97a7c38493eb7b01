//! httpbuf: a transparent request-buffering relay.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                       HTTPBUF                        │
//!                     │                                                      │
//!   Client request    │  ┌───────────┐   ┌────────────┐   ┌───────────────┐  │
//!   ──────────────────┼─▶│  http     │──▶│  ingest    │──▶│ RequestBuffer │  │
//!   ◀── 204 ──────────┼──│  capture  │   │  gateway   │   │ (bounded FIFO)│  │
//!                     │  └───────────┘   └────────────┘   └───────┬───────┘  │
//!                     │                                           │          │
//!                     │  ┌───────────────┐   gates   ┌────────────▼───────┐  │
//!                     │  │ HealthMonitor │──────────▶│ ReplayDispatcher   │──┼──▶ Backend
//!                     │  │ (probe loop)  │HealthState│ (burst, requeue)   │  │
//!                     │  └───────────────┘           └────────────────────┘  │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use httpbuf::config::{load_config, RelayConfig};
use httpbuf::observability::{logging, metrics};
use httpbuf::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "httpbuf", version, about = "Buffer requests while the backend is down, replay them when it recovers")]
struct Args {
    /// Path to a TOML configuration file. Built-in defaults are used if omitted.
    #[arg(short, long, env = "HTTPBUF_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    if args.check {
        println!("configuration OK");
        return Ok(());
    }

    logging::init(&config.observability)?;

    tracing::info!("httpbuf v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        capacity = config.buffer.capacity,
        health_check = %config.health_check.url,
        health_interval_ms = config.health_check.interval_ms,
        flush_interval_ms = config.replay.flush_interval_ms,
        burst = config.replay.burst,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { shutdown.trigger_on_signal().await });
    }

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
