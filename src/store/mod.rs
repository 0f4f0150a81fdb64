//! Catalog, order and payment data access.
//!
//! # Data Flow
//! ```text
//! api/ and admin/ handlers
//!     → products.rs / orders.rs / payments.rs (parameterized statements)
//!     → db::ConnectionPool (execute, with_transaction)
//! ```
//!
//! # Design Decisions
//! - Money is stored as integer minor units (BIGINT)
//! - Timestamps are Unix seconds (BIGINT), portable across MySQL and SQLite
//! - Multi-statement writes only happen inside `with_transaction`

pub mod models;
pub mod orders;
pub mod payments;
pub mod products;
pub mod schema;

use sqlx::{AnyConnection, Row};
use thiserror::Error;

use crate::config::Dialect;
use crate::db::{fetch_on, DbError};
use crate::http::response::{ApiError, ErrorKind};

pub use models::{
    CustomerInfo, NewOrder, NewOrderItem, Order, OrderDetails, OrderItem, OrderStatus, Payment,
    PaymentMethod, PaymentStatus, Product, ProductInput,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: i64, requested: i64 },

    #[error("{0}")]
    Conflict(String),

    #[error("unexpected value in column {column}: {value}")]
    Corrupt { column: &'static str, value: String },

    #[error("insert into {0} did not report a row id")]
    MissingId(&'static str),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Db(DbError::from(err))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Db(db) => ApiError::from(db),
            StoreError::Validation(message) => ApiError::validation(message),
            StoreError::NotFound(resource) => ApiError::not_found(resource),
            err @ StoreError::InsufficientStock { .. } => ApiError::validation(err.to_string()),
            StoreError::Conflict(message) => ApiError::new(ErrorKind::DuplicateEntry, message),
            err @ (StoreError::Corrupt { .. } | StoreError::MissingId(_)) => {
                ApiError::internal(err.to_string())
            }
        }
    }
}

/// Id generated by the last insert on `conn`. Must run on the connection that inserted.
pub(crate) async fn inserted_id(
    conn: &mut AnyConnection,
    dialect: Dialect,
    table: &'static str,
) -> Result<i64, StoreError> {
    let query = match dialect {
        Dialect::MySql => "SELECT CAST(LAST_INSERT_ID() AS SIGNED) AS id",
        Dialect::Sqlite => "SELECT last_insert_rowid() AS id",
    };
    let rows = fetch_on(conn, query, &[]).await?;
    let id: i64 = rows.first().ok_or(StoreError::MissingId(table))?.try_get("id")?;
    if id <= 0 {
        return Err(StoreError::MissingId(table));
    }
    Ok(id)
}

pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_id_is_a_server_fault() {
        let err = ApiError::from(StoreError::MissingId("products"));
        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[test]
    fn conflicts_and_stock_shortfalls_are_client_errors() {
        assert_eq!(
            ApiError::from(StoreError::Conflict("taken".into())).kind,
            ErrorKind::DuplicateEntry
        );
        let shortfall = StoreError::InsufficientStock { product_id: 3, requested: 9 };
        assert_eq!(ApiError::from(shortfall).kind, ErrorKind::Validation);
    }
}
