//! Betting ledger HTTP server.
//!
//! Serves the wallet, game settlement and deposit review API over either the
//! PostgreSQL store or the in-memory store.

use std::net::SocketAddr;

use anyhow::{Context, Error};
use neon_ledger::db::Database;
use neon_ledger::{Ledger, LedgerStore, MemoryStore};
use nl_server::api::{self, AppState};
use nl_server::config::{Backend, CliOverrides, ServerConfig};
use nl_server::{logging, metrics};
use pico_args::Arguments;
use tracing::info;

const HELP: &str = "\
Run the NeonPlay ledger server

USAGE:
  nl_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --backend    NAME        Store backend: postgres | memory  [default: env LEDGER_BACKEND or postgres]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  LEDGER_BACKEND           postgres | memory
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               HS256 token secret, at least 32 characters (required)
  METRICS_BIND             Prometheus exporter address (optional)
  LEDGER_CURRENCY          Currency of new wallets [default: INR]
  LEDGER_MAX_ATTEMPTS      Attempts per atomic unit on conflict [default: 5]
  LEDGER_UNIT_TIMEOUT_MS   Deadline per attempt [default: 5000]
  LEDGER_RETRY_BACKOFF_MS  Base retry backoff [default: 10]
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
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

    let overrides = CliOverrides {
        bind: pargs.opt_value_from_str::<_, SocketAddr>("--bind")?,
        backend: pargs.opt_value_from_str::<_, Backend>("--backend")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };

    let config = ServerConfig::from_env(overrides)?;

    logging::init();
    info!("Starting ledger server at {} ({:?} backend)", config.bind, config.backend);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Prometheus metrics exported on http://{addr}/metrics");
    }

    match config.backend {
        Backend::Memory => {
            tracing::warn!("In-memory backend: balances are lost on shutdown");
            let ledger = Ledger::new(MemoryStore::new(), config.ledger.clone());
            serve(ledger, &config).await
        }
        Backend::Postgres => {
            let db_config = config
                .database
                .as_ref()
                .context("postgres backend requires a database configuration")?;
            let db = Database::connect(db_config)
                .await
                .context("Failed to connect to database")?;
            let store = db.open_store().await.context("Failed to apply schema")?;
            info!("Database ready: {:?}", db.pool_status());

            let ledger = Ledger::new(store, config.ledger.clone());
            let result = serve(ledger, &config).await;
            db.close().await;
            result
        }
    }
}

async fn serve<S: LedgerStore>(ledger: Ledger<S>, config: &ServerConfig) -> Result<(), Error> {
    let seeded = ledger
        .settings
        .initialize_defaults()
        .await
        .context("Failed to seed game settings")?;
    if seeded > 0 {
        info!("Seeded default settings for {seeded} game(s)");
    }

    let app = api::create_router(AppState::new(ledger, &config.jwt_secret));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {err}");
        std::future::pending::<()>().await;
    }
}
