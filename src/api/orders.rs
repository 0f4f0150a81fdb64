use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::Deserialize;

use crate::http::server::AppState;
use crate::http::{ApiError, ApiResponse, IdPath, JsonBody, RequestId};
use crate::store::{orders, NewOrder, OrderDetails};

/// `POST /api/orders`
pub async fn place_order(
    State(state): State<AppState>,
    request_id: RequestId,
    JsonBody(order): JsonBody<NewOrder>,
) -> Result<ApiResponse<OrderDetails>, ApiError> {
    let details = orders::place_order(&state.pool, order).await?;
    Ok(ApiResponse::created(request_id.0, details)
        .with_message("Order placed, awaiting payment confirmation"))
}

#[derive(Debug, Deserialize)]
pub struct OrderLookup {
    pub email: String,
}

/// `GET /api/orders/{id}?email=...`
///
/// Customers see their own order only. A wrong email is indistinguishable from an
/// unknown id.
pub async fn get_order(
    State(state): State<AppState>,
    request_id: RequestId,
    IdPath(id): IdPath,
    lookup: Result<Query<OrderLookup>, QueryRejection>,
) -> Result<ApiResponse<OrderDetails>, ApiError> {
    let Query(lookup) =
        lookup.map_err(|_| ApiError::validation("email query parameter is required"))?;

    let details = orders::get_details(&state.pool, id).await?;
    if !details.order.customer.email.trim().eq_ignore_ascii_case(lookup.email.trim()) {
        return Err(ApiError::not_found("Order"));
    }
    Ok(ApiResponse::ok(request_id.0, details))
}
