//! Manual payment confirmation.

use futures_util::FutureExt;
use sqlx::AnyConnection;
use sqlx::Row;

use crate::db::{fetch_on, run_on, ConnectionPool, SqlParam};

use super::models::{OrderDetails, OrderStatus, PaymentStatus};
use super::{orders, unix_now, StoreError};

/// Mark the pending payment of `order_id` as confirmed by `admin` and advance the order
/// from `pending-payment` to `payment-confirmed`.
///
/// Both rows change in one transaction. Orders in any other status are a conflict.
pub async fn confirm_payment(
    pool: &ConnectionPool,
    order_id: i64,
    admin: &str,
    notes: Option<String>,
) -> Result<OrderDetails, StoreError> {
    let admin = admin.to_string();
    pool.with_transaction(move |conn| {
        async move { confirm_on(conn, order_id, &admin, notes).await }.boxed()
    })
    .await?;

    tracing::info!(order_id, "Payment confirmed");
    orders::get_details(pool, order_id).await
}

async fn confirm_on(
    conn: &mut AnyConnection,
    order_id: i64,
    admin: &str,
    notes: Option<String>,
) -> Result<(), StoreError> {
    let now = unix_now();

    // Advance only from pending-payment.
    let advanced = run_on(
        conn,
        "UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        &[
            OrderStatus::PaymentConfirmed.as_str().into(),
            now.into(),
            order_id.into(),
            OrderStatus::PendingPayment.as_str().into(),
        ],
    )
    .await?;

    if advanced.rows_affected() == 0 {
        let rows = fetch_on(
            conn,
            "SELECT status FROM orders WHERE id = ?",
            &[SqlParam::Int(order_id)],
        )
        .await?;
        let status: String = rows
            .first()
            .ok_or(StoreError::NotFound("Order"))?
            .try_get("status")?;
        return Err(StoreError::Conflict(format!(
            "Order {order_id} is {}, not awaiting payment",
            OrderStatus::parse(&status)?.as_str()
        )));
    }

    let confirmed = run_on(
        conn,
        "UPDATE payments SET status = ?, confirmed_by = ?, confirmed_at = ?, notes = ?, updated_at = ?
         WHERE order_id = ? AND status = ?",
        &[
            PaymentStatus::Confirmed.as_str().into(),
            admin.into(),
            now.into(),
            notes.into(),
            now.into(),
            order_id.into(),
            PaymentStatus::Pending.as_str().into(),
        ],
    )
    .await?;

    if confirmed.rows_affected() == 0 {
        let existing = fetch_on(
            conn,
            "SELECT status FROM payments WHERE order_id = ?",
            &[SqlParam::Int(order_id)],
        )
        .await?;
        return Err(match existing.first() {
            None => StoreError::NotFound("Payment"),
            Some(_) => StoreError::Conflict(format!("Order {order_id} has no pending payment")),
        });
    }

    Ok(())
}
