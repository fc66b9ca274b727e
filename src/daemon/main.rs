//! liteclient daemon
//!
//! Serves the admin RPC surface over HTTP in front of a LiteLLM proxy.

use liteclient::config::Config;
use liteclient::dashboard::{FileTimestampStore, MemoryTimestampStore, TimestampStore};
use liteclient::rpc::{self, AppState, SessionManager};
use liteclient::telemetry::{init_logging, UpstreamMetrics};
use liteclient::{BudgetService, Result};

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// liteclient daemon
#[derive(Parser, Debug)]
#[command(name = "liteclient")]
#[command(about = "Admin service for LiteLLM proxy customers and budgets")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// HTTP bind host
    #[arg(long)]
    host: Option<String>,

    /// HTTP server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level or filter directive
    #[arg(long)]
    log_level: Option<String>,

    /// Enable JSON log format
    #[arg(long)]
    json_logs: bool,

    /// File holding customer first-seen timestamps
    #[arg(long)]
    timestamp_store: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;

    // Apply command line overrides
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = args.log_level {
        config.telemetry.log_level = level;
    }
    if args.json_logs {
        config.telemetry.json_logs = true;
    }
    if let Some(path) = args.timestamp_store {
        config.dashboard.timestamp_store_path = Some(path);
    }

    init_logging(&config.telemetry)?;
    config.validate()?;

    info!(
        service = %config.telemetry.service_name,
        version = liteclient::VERSION,
        proxy = %config.proxy.base_url,
        "starting"
    );

    let metrics = Arc::new(UpstreamMetrics::new());
    let service = Arc::new(BudgetService::new(&config.proxy, metrics)?);
    let timestamps = open_timestamp_store(&config)?;
    let sessions = SessionManager::new(&config.admin)?;

    let state = AppState::new(service, timestamps, sessions);
    let app = rpc::router(state, &config.server);

    let bind_addr = config.server.bind_addr();
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down");
    Ok(())
}

fn open_timestamp_store(config: &Config) -> Result<Arc<dyn TimestampStore>> {
    let store: Arc<dyn TimestampStore> = match &config.dashboard.timestamp_store_path {
        Some(path) => {
            info!(path = %path.display(), "using file timestamp store");
            Arc::new(FileTimestampStore::open(path)?)
        }
        None => {
            info!("using in-memory timestamp store");
            Arc::new(MemoryTimestampStore::new())
        }
    };
    Ok(store)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
