//! Admin area: session tokens, the session gate and back-office handlers.
//!
//! Every route here is gated by the request pipeline; handlers can rely on an
//! `AdminSession` being present except on `/admin/login`.

pub mod auth;
pub mod handlers;
pub mod session;

use axum::routing::{get, patch, post, put};
use axum::Router;

use crate::http::server::AppState;
use self::handlers::*;

pub use session::{AuthError, HmacSessionAuthenticator, SessionAuthenticator, SessionClaims};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/login", get(login_page))
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/orders", get(list_orders))
        .route("/admin/orders/{id}", get(order_details))
        .route("/admin/orders/{id}/status", patch(update_order_status))
        .route("/admin/orders/{id}/confirm-payment", post(confirm_payment))
        .route("/admin/products", post(create_product))
        .route("/admin/products/{id}", put(update_product).delete(delete_product))
}
