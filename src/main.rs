//! signon-gate - The trust-and-access layer for a sign-on campaign service
//!
//! This is the main entry point for the signon-gate application.

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use signon_gate::config::Config;
use signon_gate::database::SqliteDatabase;
use signon_gate::ratelimit::RateLimiterRegistry;
use signon_gate::server::{AppState, Server};

/// signon-gate - API key, CORS, and rate-limit gate for a sign-on service
#[derive(Parser, Debug)]
#[command(name = "signon-gate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "SIGNON_GATE_CONFIG")]
    config: Option<String>,

    /// Bootstrap API key in {id}.{secret} form, seeded when the store is empty
    #[arg(long, env = "SIGNON_GATE_BOOTSTRAP_KEY", hide_env_values = true)]
    bootstrap_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let config = load_config(&args)?;

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting signon-gate");

    // Initialize database
    let database = SqliteDatabase::new(&config.database.path).await?;
    let database = Arc::new(database);
    info!(path = %config.database.path, "Database initialized");

    // Initialize rate limiter
    let limiter = Arc::new(RateLimiterRegistry::new((&config.rate_limit).into()));

    // Create application state
    let state = AppState::new(Arc::clone(&database), limiter);

    // Seed the origin whitelist when the store is empty
    state.cors.seed(&config.cors.allowed_origins).await?;

    // Seed the bootstrap key when the store is empty. A bad key is logged
    // and skipped so a restart with stale credentials does not crash.
    let bootstrap = args
        .bootstrap_key
        .clone()
        .or_else(|| config.bootstrap_token());
    if let Some(token) = bootstrap {
        if let Err(e) = state.keys.bootstrap(&token).await {
            warn!(error = %e, "Failed to seed bootstrap key");
        }
    }

    // Create and start the HTTP server
    let server = Server::new(config.server.clone(), state);
    let shutdown_signal = shutdown_signal();

    info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting HTTP server"
    );

    // Run the server
    let result = server.run(shutdown_signal).await;

    info!("signon-gate shutdown complete");

    result.map_err(Into::into)
}

/// Load configuration from file or environment
fn load_config(args: &Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path);
            Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
        None => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from environment variables");
            Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
    }
}

/// Create a future that resolves when a shutdown signal is received
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
