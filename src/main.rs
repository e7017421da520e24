//! Completion capture gateway.
//!
//! Sits in front of an LLM completion API, forwards every call unchanged
//! (apart from injected credentials) and records each round trip.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │               CAPTURE GATEWAY                │
//!     Client Request     │  ┌────────┐     ┌───────────┐                │
//!     ───────────────────┼─▶│  http  │────▶│  forward  │────────────────┼──▶ Backend
//!                        │  │ server │     │  engine   │◀───────────────┼─── (one attempt)
//!                        │  └───┬────┘     └─────┬─────┘                │
//!     Client Response    │      │                │ capture (advisory)   │
//!     ◀──────────────────┼──────┘          ┌─────▼─────┐  ┌─────────┐   │
//!     (raw backend bytes)│                 │   codec   │─▶│ storage │   │
//!                        │  /_list ───────▶│  display  │◀─│ sqlite  │   │
//!                        │  /_show/{id}    └───────────┘  └─────────┘   │
//!                        └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use tokio::net::TcpListener;

use capture_gateway::capture::credentials::{Credentials, API_KEY_ENV};
use capture_gateway::config::Cli;
use capture_gateway::observability::{logging, metrics};
use capture_gateway::{CallStore, GatewayServer, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.resolve()?;

    logging::init(&config.observability)?;
    tracing::info!("capture-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.base_url,
        db_path = %config.storage.db_path,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = CallStore::open(&config.storage.db_path)?;

    let env_key = std::env::var(API_KEY_ENV).ok();
    let credentials = Credentials::from_config(&config.auth, env_key.as_deref())?;
    if !credentials.has_api_key() {
        tracing::warn!("No API key configured; caller Authorization headers pass through");
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = GatewayServer::new(config, store, credentials)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
