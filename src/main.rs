//! Storefront backend server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────▶ SetRequestId ─▶ Trace ─▶ RequestPipeline ─▶ CatchPanic ─▶ handler
//!                                      │  classify route                   │
//!                                      │  rate limit (/api/)               ▼
//!                                      │  admin session (/admin)     ConnectionPool ─▶ MySQL
//!                                      │  timeout                          │
//!     Client Response                  ▼                                   │
//!     ◀────── envelope + security headers ◀────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;

use storefront::config::loader::load_from_env;
use storefront::db::ConnectionPool;
use storefront::lifecycle::signals::shutdown_signal;
use storefront::lifecycle::startup::wait_for_database;
use storefront::lifecycle::Shutdown;
use storefront::observability::{logging, metrics};
use storefront::store::schema::create_tables;
use storefront::HttpServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; the process environment may carry everything.
    let _ = dotenvy::dotenv();

    let config_path = std::env::var_os("STORE_CONFIG").map(PathBuf::from);
    let config = load_from_env(config_path.as_deref())?;

    logging::init_logging(&config.observability, config.environment);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = config.environment.as_str(),
        "storefront starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.database.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let pool = Arc::new(ConnectionPool::new(config.database.clone()));
    wait_for_database(&pool, &config.database).await?;
    if config.database.auto_migrate {
        create_tables(&pool).await?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, pool.clone());
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    shutdown_signal().await;
    shutdown.trigger();

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
    }

    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
