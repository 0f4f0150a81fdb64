//! Order placement and lookup.

use futures_util::FutureExt;
use sqlx::AnyConnection;
use sqlx::Row;

use crate::config::Dialect;
use crate::db::{fetch_on, run_on, ConnectionPool, SqlParam};

use super::models::{NewOrder, Order, OrderDetails, OrderItem, OrderStatus, Payment, PaymentStatus};
use super::{inserted_id, unix_now, StoreError};

const ORDER_COLUMNS: &str = "id, user_id, total_amount, status, payment_method, shipping_address, \
     shipping_method, customer_info, admin_notes, created_at, updated_at";

const PAYMENT_COLUMNS: &str =
    "id, order_id, amount, payment_method, status, confirmed_by, confirmed_at, notes, created_at";

/// Place an order atomically.
///
/// Inside one transaction: price every line from the catalog, insert the order and its
/// items, decrement stock (failing if any line would go negative) and open a pending
/// payment. Any failure leaves the database untouched.
pub async fn place_order(pool: &ConnectionPool, order: NewOrder) -> Result<OrderDetails, StoreError> {
    order.validate()?;
    let customer_info = serde_json::to_string(&order.customer)
        .map_err(|e| StoreError::Validation(e.to_string()))?;

    let dialect = pool.dialect();
    let order_id = pool
        .with_transaction(move |conn| {
            async move { insert_order(conn, dialect, &order, customer_info).await }.boxed()
        })
        .await?;

    tracing::info!(order_id, "Order placed");
    get_details(pool, order_id).await
}

async fn insert_order(
    conn: &mut AnyConnection,
    dialect: Dialect,
    order: &NewOrder,
    customer_info: String,
) -> Result<i64, StoreError> {
    let now = unix_now();

    let mut priced = Vec::with_capacity(order.items.len());
    let mut total: i64 = 0;
    for item in &order.items {
        let rows = fetch_on(
            conn,
            "SELECT price FROM products WHERE id = ?",
            &[SqlParam::Int(item.product_id)],
        )
        .await?;
        let price: i64 = rows
            .first()
            .ok_or(StoreError::NotFound("Product"))?
            .try_get("price")?;
        total = total.saturating_add(price.saturating_mul(item.quantity));
        priced.push((item, price));
    }

    run_on(
        conn,
        "INSERT INTO orders (user_id, total_amount, status, payment_method, shipping_address, shipping_method, customer_info, admin_notes, created_at, updated_at)
         VALUES (NULL, ?, ?, ?, ?, ?, ?, NULL, ?, ?)",
        &[
            total.into(),
            OrderStatus::PendingPayment.as_str().into(),
            order.payment_method.as_str().into(),
            order.shipping_address.trim().into(),
            order.shipping_method.clone().into(),
            customer_info.into(),
            now.into(),
            now.into(),
        ],
    )
    .await?;
    let order_id = inserted_id(conn, dialect, "orders").await?;

    for (item, price) in priced {
        run_on(
            conn,
            "INSERT INTO order_items (order_id, product_id, quantity, price, created_at) VALUES (?, ?, ?, ?, ?)",
            &[
                order_id.into(),
                item.product_id.into(),
                item.quantity.into(),
                price.into(),
                now.into(),
            ],
        )
        .await?;

        let updated = run_on(
            conn,
            "UPDATE products SET stock = stock - ?, sold = sold + ?, updated_at = ? WHERE id = ? AND stock >= ?",
            &[
                item.quantity.into(),
                item.quantity.into(),
                now.into(),
                item.product_id.into(),
                item.quantity.into(),
            ],
        )
        .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::InsufficientStock {
                product_id: item.product_id,
                requested: item.quantity,
            });
        }
    }

    run_on(
        conn,
        "INSERT INTO payments (order_id, amount, payment_method, status, confirmed_by, confirmed_at, notes, created_at, updated_at)
         VALUES (?, ?, ?, ?, NULL, NULL, NULL, ?, ?)",
        &[
            order_id.into(),
            total.into(),
            order.payment_method.as_str().into(),
            PaymentStatus::Pending.as_str().into(),
            now.into(),
            now.into(),
        ],
    )
    .await?;

    Ok(order_id)
}

pub async fn find(pool: &ConnectionPool, id: i64) -> Result<Option<Order>, StoreError> {
    let rows = pool
        .execute(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"),
            &[SqlParam::Int(id)],
        )
        .await?;
    rows.first().map(Order::from_row).transpose()
}

pub async fn get_details(pool: &ConnectionPool, id: i64) -> Result<OrderDetails, StoreError> {
    let order = find(pool, id).await?.ok_or(StoreError::NotFound("Order"))?;

    let items = pool
        .execute(
            "SELECT id, order_id, product_id, quantity, price FROM order_items WHERE order_id = ? ORDER BY id",
            &[SqlParam::Int(id)],
        )
        .await?
        .iter()
        .map(OrderItem::from_row)
        .collect::<Result<Vec<_>, _>>()?;

    let payment = pool
        .execute(
            &format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ? ORDER BY id DESC LIMIT 1"),
            &[SqlParam::Int(id)],
        )
        .await?
        .first()
        .map(Payment::from_row)
        .transpose()?;

    Ok(OrderDetails {
        order,
        items,
        payment,
    })
}

pub async fn list(pool: &ConnectionPool, status: Option<OrderStatus>) -> Result<Vec<Order>, StoreError> {
    let rows = match status {
        Some(status) => {
            pool.execute(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE status = ? ORDER BY id DESC"),
                &[status.as_str().into()],
            )
            .await?
        }
        None => {
            pool.execute(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id DESC"), &[])
                .await?
        }
    };
    rows.iter().map(Order::from_row).collect()
}

/// Move an order to `status`. Terminal orders cannot change.
///
/// The terminal check is part of the `UPDATE` itself, so a status written concurrently
/// between read and write is never overwritten.
pub async fn update_status(
    pool: &ConnectionPool,
    id: i64,
    status: OrderStatus,
    admin_notes: Option<String>,
) -> Result<Order, StoreError> {
    let [delivered, cancelled] = OrderStatus::TERMINAL;
    let result = pool
        .run(
            "UPDATE orders SET status = ?, admin_notes = ?, updated_at = ?
             WHERE id = ? AND (status NOT IN (?, ?) OR status = ?)",
            &[
                status.as_str().into(),
                admin_notes.into(),
                unix_now().into(),
                id.into(),
                delivered.as_str().into(),
                cancelled.as_str().into(),
                status.as_str().into(),
            ],
        )
        .await?;

    let order = find(pool, id).await?.ok_or(StoreError::NotFound("Order"))?;
    // MySQL reports zero affected rows for an unchanged row.
    if result.rows_affected() == 0 && order.status != status {
        return Err(StoreError::Conflict(format!(
            "Order {id} is already {}",
            order.status.as_str()
        )));
    }

    tracing::info!(order_id = id, status = status.as_str(), "Order status updated");
    Ok(order)
}

/// Order count per status.
pub async fn count_by_status(pool: &ConnectionPool) -> Result<Vec<(OrderStatus, i64)>, StoreError> {
    let rows = pool
        .execute(
            "SELECT status, COUNT(*) AS total FROM orders GROUP BY status ORDER BY status",
            &[],
        )
        .await?;
    rows.iter()
        .map(|row| -> Result<(OrderStatus, i64), StoreError> {
            let status: String = row.try_get("status")?;
            Ok((OrderStatus::parse(&status)?, row.try_get("total")?))
        })
        .collect()
}

/// Sum of confirmed payments.
pub async fn confirmed_revenue(pool: &ConnectionPool) -> Result<i64, StoreError> {
    let integer = match pool.dialect() {
        Dialect::MySql => "SIGNED",
        Dialect::Sqlite => "INTEGER",
    };
    let rows = pool
        .execute(
            &format!("SELECT CAST(COALESCE(SUM(amount), 0) AS {integer}) AS revenue FROM payments WHERE status = ?"),
            &[PaymentStatus::Confirmed.as_str().into()],
        )
        .await?;
    match rows.first() {
        Some(row) => Ok(row.try_get("revenue")?),
        None => Ok(0),
    }
}
