//! Product catalog queries.

use futures_util::FutureExt;

use crate::db::{run_on, ConnectionPool, SqlParam};

use super::models::{Product, ProductInput};
use super::{inserted_id, unix_now, StoreError};

const COLUMNS: &str =
    "id, name, description, category, image_url, price, stock, sold, created_at, updated_at";

pub async fn list(pool: &ConnectionPool) -> Result<Vec<Product>, StoreError> {
    let rows = pool
        .execute(&format!("SELECT {COLUMNS} FROM products ORDER BY id DESC"), &[])
        .await?;
    rows.iter().map(Product::from_row).collect()
}

pub async fn find(pool: &ConnectionPool, id: i64) -> Result<Option<Product>, StoreError> {
    let rows = pool
        .execute(
            &format!("SELECT {COLUMNS} FROM products WHERE id = ?"),
            &[SqlParam::Int(id)],
        )
        .await?;
    rows.first().map(Product::from_row).transpose()
}

pub async fn get(pool: &ConnectionPool, id: i64) -> Result<Product, StoreError> {
    find(pool, id).await?.ok_or(StoreError::NotFound("Product"))
}

pub async fn create(pool: &ConnectionPool, input: &ProductInput) -> Result<Product, StoreError> {
    input.validate()?;
    let now = unix_now();
    let params: Vec<SqlParam> = vec![
        input.name.trim().into(),
        input.description.clone().into(),
        input.category.clone().into(),
        input.image_url.clone().into(),
        input.price.into(),
        input.stock.into(),
        now.into(),
        now.into(),
    ];

    let dialect = pool.dialect();
    let id = pool
        .with_transaction(move |conn| {
            async move {
                run_on(
                    conn,
                    "INSERT INTO products (name, description, category, image_url, price, stock, sold, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)",
                    &params,
                )
                .await?;
                inserted_id(conn, dialect, "products").await
            }
            .boxed()
        })
        .await?;

    get(pool, id).await
}

pub async fn update(pool: &ConnectionPool, id: i64, input: &ProductInput) -> Result<Product, StoreError> {
    input.validate()?;
    let result = pool
        .run(
            "UPDATE products
             SET name = ?, description = ?, category = ?, image_url = ?, price = ?, stock = ?, updated_at = ?
             WHERE id = ?",
            &[
                input.name.trim().into(),
                input.description.clone().into(),
                input.category.clone().into(),
                input.image_url.clone().into(),
                input.price.into(),
                input.stock.into(),
                unix_now().into(),
                id.into(),
            ],
        )
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("Product"));
    }
    get(pool, id).await
}

/// Delete a product that no order references.
pub async fn delete(pool: &ConnectionPool, id: i64) -> Result<(), StoreError> {
    let rows = pool
        .execute(
            "SELECT COUNT(*) AS refs FROM order_items WHERE product_id = ?",
            &[SqlParam::Int(id)],
        )
        .await?;
    let refs: i64 = match rows.first() {
        Some(row) => sqlx::Row::try_get(row, "refs")?,
        None => 0,
    };
    if refs > 0 {
        return Err(StoreError::Conflict(format!(
            "Product {id} is referenced by {refs} order item(s)"
        )));
    }

    let result = pool
        .run("DELETE FROM products WHERE id = ?", &[SqlParam::Int(id)])
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("Product"));
    }
    Ok(())
}

pub async fn count(pool: &ConnectionPool) -> Result<i64, StoreError> {
    let rows = pool
        .execute("SELECT COUNT(*) AS total FROM products", &[])
        .await?;
    match rows.first() {
        Some(row) => Ok(sqlx::Row::try_get(row, "total")?),
        None => Ok(0),
    }
}
