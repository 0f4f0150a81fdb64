use axum::body::Bytes;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use crate::admin::auth::AdminSession;
use crate::http::server::AppState;
use crate::http::{ApiError, ApiResponse, IdPath, JsonBody, RequestId};
use crate::store::{orders, payments, products, Order, OrderDetails, OrderStatus, Product, ProductInput};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPage {
    pub login_endpoint: &'static str,
    pub fields: [&'static str; 2],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub admin: String,
    pub products: i64,
    pub orders_by_status: Vec<StatusCount>,
    pub pending_payments: i64,
    pub confirmed_revenue: i64,
}

#[derive(Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: OrderStatus,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentConfirmation {
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn login_page(request_id: RequestId) -> ApiResponse<LoginPage> {
    ApiResponse::ok(
        request_id.0,
        LoginPage {
            login_endpoint: "/api/auth/login",
            fields: ["email", "password"],
        },
    )
}

pub async fn dashboard(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    request_id: RequestId,
) -> Result<ApiResponse<DashboardSummary>, ApiError> {
    let product_count = products::count(&state.pool).await?;
    let by_status = orders::count_by_status(&state.pool).await?;
    let revenue = orders::confirmed_revenue(&state.pool).await?;

    let pending_payments = by_status
        .iter()
        .find(|(status, _)| *status == OrderStatus::PendingPayment)
        .map(|(_, count)| *count)
        .unwrap_or(0);

    Ok(ApiResponse::ok(
        request_id.0,
        DashboardSummary {
            admin: session.sub,
            products: product_count,
            orders_by_status: by_status
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
            pending_payments,
            confirmed_revenue: revenue,
        },
    ))
}

pub async fn list_orders(
    State(state): State<AppState>,
    _session: AdminSession,
    request_id: RequestId,
    filter: Result<Query<OrderFilter>, axum::extract::rejection::QueryRejection>,
) -> Result<ApiResponse<Vec<Order>>, ApiError> {
    let Query(filter) = filter.map_err(|e| ApiError::validation(e.body_text()))?;
    let orders = orders::list(&state.pool, filter.status).await?;
    Ok(ApiResponse::ok(request_id.0, orders))
}

/// `GET /admin/orders/{id}`
pub async fn order_details(
    State(state): State<AppState>,
    _session: AdminSession,
    request_id: RequestId,
    IdPath(id): IdPath,
) -> Result<ApiResponse<OrderDetails>, ApiError> {
    let details = orders::get_details(&state.pool, id).await?;
    Ok(ApiResponse::ok(request_id.0, details))
}

/// `PATCH /admin/orders/{id}/status`
pub async fn update_order_status(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    request_id: RequestId,
    IdPath(id): IdPath,
    JsonBody(update): JsonBody<StatusUpdate>,
) -> Result<ApiResponse<Order>, ApiError> {
    let order = orders::update_status(&state.pool, id, update.status, update.admin_notes).await?;
    tracing::info!(request_id = %request_id, admin = %session.sub, order_id = id, "Order status changed by admin");
    Ok(ApiResponse::ok(request_id.0, order).with_message("Order status updated"))
}

/// `POST /admin/orders/{id}/confirm-payment`
pub async fn confirm_payment(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    request_id: RequestId,
    IdPath(id): IdPath,
    body: Bytes,
) -> Result<ApiResponse<OrderDetails>, ApiError> {
    let confirmation: PaymentConfirmation = if body.is_empty() {
        PaymentConfirmation::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::validation(e.to_string()))?
    };
    let notes = confirmation.notes;
    let details = payments::confirm_payment(&state.pool, id, &session.sub, notes).await?;
    Ok(ApiResponse::ok(request_id.0, details).with_message("Payment confirmed"))
}

pub async fn create_product(
    State(state): State<AppState>,
    _session: AdminSession,
    request_id: RequestId,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<ApiResponse<Product>, ApiError> {
    let product = products::create(&state.pool, &input).await?;
    Ok(ApiResponse::created(request_id.0, product))
}

pub async fn update_product(
    State(state): State<AppState>,
    _session: AdminSession,
    request_id: RequestId,
    IdPath(id): IdPath,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<ApiResponse<Product>, ApiError> {
    let product = products::update(&state.pool, id, &input).await?;
    Ok(ApiResponse::ok(request_id.0, product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    _session: AdminSession,
    request_id: RequestId,
    IdPath(id): IdPath,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    products::delete(&state.pool, id).await?;
    Ok(ApiResponse::ok(request_id.0, serde_json::json!({ "id": id })).with_message("Product deleted"))
}
