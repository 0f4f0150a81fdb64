//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

use storefront::config::{DatabaseConfig, Environment, StoreConfig};
use storefront::db::ConnectionPool;
use storefront::http::{build_router, AppState, HttpServer};
use storefront::lifecycle::Shutdown;
use storefront::store::schema::create_tables;
use storefront::store::{products, Product, ProductInput};

pub const SECRET: &str = "integration-test-secret";
pub const ADMIN_EMAIL: &str = "admin@shop.test";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// A SQLite database in a temp directory. Keep the `TempDir` alive for the test.
pub fn sqlite_config(max_connections: u32) -> (TempDir, DatabaseConfig) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = DatabaseConfig {
        max_connections,
        acquire_timeout_ms: 5_000,
        ..DatabaseConfig::sqlite(&dir.path().join("store.db"))
    };
    (dir, config)
}

/// Initialized pool with the schema in place.
pub async fn temp_pool(max_connections: u32) -> (TempDir, Arc<ConnectionPool>) {
    let (dir, config) = sqlite_config(max_connections);
    let pool = ConnectionPool::connect(config).await.expect("connect sqlite");
    create_tables(&pool).await.expect("create tables");
    (dir, Arc::new(pool))
}

pub fn test_config(environment: Environment) -> StoreConfig {
    let mut config = StoreConfig::default();
    config.environment = environment;
    config.session.secret = SECRET.to_string();
    config.admin.email = ADMIN_EMAIL.to_string();
    config.admin.password = ADMIN_PASSWORD.to_string();
    config
}

pub fn app(config: StoreConfig, pool: Arc<ConnectionPool>) -> (AppState, Router) {
    let state = AppState::new(config, pool);
    let router = build_router(state.clone());
    (state, router)
}

pub async fn seed_product(pool: &ConnectionPool, name: &str, price: i64, stock: i64) -> Product {
    products::create(
        pool,
        &ProductInput {
            name: name.to_string(),
            description: None,
            category: Some("apparel".into()),
            image_url: None,
            price,
            stock,
        },
    )
    .await
    .expect("seed product")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// Serve `state` on an ephemeral port until the returned `Shutdown` fires.
pub async fn spawn_server(state: AppState) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::from_state(state);
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}
