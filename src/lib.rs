//! Storefront backend library: catalog, orders, manual payment confirmation and the
//! admin session layer, served through a single request pipeline.

pub mod admin;
pub mod api;
pub mod config;
pub mod db;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod store;

pub use config::schema::StoreConfig;
pub use db::ConnectionPool;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
