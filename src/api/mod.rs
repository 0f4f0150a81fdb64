//! Public storefront API under `/api/`.

pub mod auth;
pub mod orders;
pub mod products;

use axum::routing::{get, post};
use axum::Router;

use crate::health;
use crate::http::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/products", get(products::list_products))
        .route("/api/products/{id}", get(products::get_product))
        .route("/api/orders", post(orders::place_order))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
}
