//! Multi-tenant live bingo session server.
//!
//! Serves the session engine over HTTP and WebSocket, backed by
//! PostgreSQL, with Prometheus metrics on an optional separate listener.

mod api;
mod config;
mod logging;
mod metrics;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;

use live_bingo::engine::SessionService;
use live_bingo::jackpot::JackpotManager;
use live_bingo::realtime::RealtimeDispatcher;
use live_bingo::store::{Database, PgStore};

use config::ServerConfig;

const HELP: &str = "\
Run a multi-tenant live bingo session server

USAGE:
  lb_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:7171]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  METRICS_BIND             Prometheus exporter bind address (optional)
  DATABASE_URL             PostgreSQL connection string (required)
  HOUSE_FEE_PERCENTAGE     Default house fee percentage       [default: 15]
  AUTO_CALL_INTERVAL_SECS  Default auto-call delay in seconds [default: 5]
  AUDIT_RETENTION_DAYS     Call audit retention window        [default: 90]
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let db_url_override: Option<String> = pargs.opt_value_from_str("--db-url")?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = ServerConfig::from_env(bind_override, db_url_override)?;
    config.validate()?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(Error::msg)?;
        info!("Prometheus metrics available at http://{metrics_bind}/metrics");
    }

    info!("Connecting to database");
    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))?;
    db.health_check()
        .await
        .map_err(|e| anyhow::anyhow!("Database health check failed: {e}"))?;
    info!("Database connected successfully");

    let store = Arc::new(PgStore::new(Arc::new(db.pool().clone())));
    let service = SessionService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        JackpotManager::new(store),
        RealtimeDispatcher::new(),
    );

    let api_state = api::AppState {
        service,
        db,
        defaults: config.session_defaults.clone(),
    };
    let app = api::create_router(api_state);

    info!("Starting HTTP/WebSocket server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {e}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
