//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request id, tracing, pipeline, panic capture, body limit)
//! - Bind server to listener
//! - Run background tasks (rate-limit sweeper) until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::admin::session::{HmacSessionAuthenticator, SessionAuthenticator};
use crate::config::StoreConfig;
use crate::db::ConnectionPool;
use crate::http::pipeline::{not_found, panic_response, request_pipeline};
use crate::observability::PerformanceMonitor;
use crate::security::RateLimiter;
use crate::{admin, api};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<StoreConfig>,
    pub pool: Arc<ConnectionPool>,
    pub limiter: Arc<RateLimiter>,
    pub sessions: Arc<dyn SessionAuthenticator>,
    pub performance: Arc<PerformanceMonitor>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: StoreConfig, pool: Arc<ConnectionPool>) -> Self {
        let sessions = Arc::new(HmacSessionAuthenticator::new(config.session.secret.as_bytes()));
        Self::with_sessions(config, pool, sessions)
    }

    /// State with a caller-supplied session authenticator.
    pub fn with_sessions(
        config: StoreConfig,
        pool: Arc<ConnectionPool>,
        sessions: Arc<dyn SessionAuthenticator>,
    ) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            config: Arc::new(config),
            pool,
            sessions,
            performance: Arc::new(PerformanceMonitor::new()),
            started_at: Instant::now(),
        }
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    let max_body_size = state.config.security.max_body_size;

    Router::new()
        .merge(api::router())
        .merge(admin::router())
        .fallback(not_found)
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(state, request_pipeline))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// HTTP server for the storefront.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: StoreConfig, pool: Arc<ConnectionPool>) -> Self {
        Self::from_state(AppState::new(config, pool))
    }

    pub fn from_state(state: AppState) -> Self {
        let router = build_router(state.clone());
        Self { router, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = self.state.config.environment.as_str(),
            "HTTP server starting"
        );

        if self.state.config.rate_limit.enabled {
            let interval = Duration::from_secs(self.state.config.rate_limit.sweep_interval_secs.max(1));
            let limiter = self.state.limiter.clone();
            tokio::spawn(limiter.run_sweeper(interval, shutdown.resubscribe()));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
