use axum::extract::State;

use crate::http::server::AppState;
use crate::http::{ApiError, ApiResponse, IdPath, RequestId};
use crate::store::{products, Product};

pub async fn list_products(
    State(state): State<AppState>,
    request_id: RequestId,
) -> Result<ApiResponse<Vec<Product>>, ApiError> {
    let products = products::list(&state.pool).await?;
    Ok(ApiResponse::ok(request_id.0, products))
}

pub async fn get_product(
    State(state): State<AppState>,
    request_id: RequestId,
    IdPath(id): IdPath,
) -> Result<ApiResponse<Product>, ApiError> {
    let product = products::get(&state.pool, id).await?;
    Ok(ApiResponse::ok(request_id.0, product))
}
