//! Schema bootstrap for a fresh database.

use crate::config::Dialect;
use crate::db::{ConnectionPool, DbError};

const TABLES: [(&str, &str); 5] = [
    (
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            id {id},
            name VARCHAR(255) NOT NULL,
            email VARCHAR(255) NOT NULL UNIQUE,
            role VARCHAR(16) NOT NULL DEFAULT 'user',
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "products",
        "CREATE TABLE IF NOT EXISTS products (
            id {id},
            name VARCHAR(255) NOT NULL,
            description TEXT,
            category VARCHAR(100),
            image_url VARCHAR(500),
            price BIGINT NOT NULL,
            stock BIGINT NOT NULL DEFAULT 0,
            sold BIGINT NOT NULL DEFAULT 0,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )",
    ),
    (
        "orders",
        "CREATE TABLE IF NOT EXISTS orders (
            id {id},
            user_id BIGINT NULL,
            total_amount BIGINT NOT NULL,
            status VARCHAR(32) NOT NULL,
            payment_method VARCHAR(32) NOT NULL,
            shipping_address TEXT NOT NULL,
            shipping_method VARCHAR(64),
            customer_info TEXT NOT NULL,
            admin_notes TEXT,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )",
    ),
    (
        "order_items",
        "CREATE TABLE IF NOT EXISTS order_items (
            id {id},
            order_id BIGINT NOT NULL,
            product_id BIGINT NOT NULL,
            quantity BIGINT NOT NULL,
            price BIGINT NOT NULL,
            created_at BIGINT NOT NULL,
            FOREIGN KEY (order_id) REFERENCES orders(id),
            FOREIGN KEY (product_id) REFERENCES products(id)
        )",
    ),
    (
        "payments",
        "CREATE TABLE IF NOT EXISTS payments (
            id {id},
            order_id BIGINT NOT NULL,
            amount BIGINT NOT NULL,
            payment_method VARCHAR(32) NOT NULL,
            status VARCHAR(16) NOT NULL,
            confirmed_by VARCHAR(255),
            confirmed_at BIGINT,
            notes TEXT,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            FOREIGN KEY (order_id) REFERENCES orders(id)
        )",
    ),
];

fn id_column(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::MySql => "BIGINT AUTO_INCREMENT PRIMARY KEY",
        Dialect::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
    }
}

/// DDL statements for `dialect`, in dependency order.
pub fn create_statements(dialect: Dialect) -> Vec<(&'static str, String)> {
    TABLES
        .iter()
        .map(|(name, ddl)| (*name, ddl.replace("{id}", id_column(dialect))))
        .collect()
}

/// Create all tables that do not exist yet.
pub async fn create_tables(pool: &ConnectionPool) -> Result<(), DbError> {
    for (table, ddl) in create_statements(pool.dialect()) {
        pool.run(&ddl, &[]).await?;
        tracing::debug!(table, "Table ready");
    }
    tracing::info!("Database schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_follow_dependency_order() {
        let names: Vec<_> = create_statements(Dialect::Sqlite).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["users", "products", "orders", "order_items", "payments"]);
    }

    #[test]
    fn id_column_matches_dialect() {
        let mysql = create_statements(Dialect::MySql);
        assert!(mysql[0].1.contains("BIGINT AUTO_INCREMENT PRIMARY KEY"));
        assert!(!mysql[0].1.contains("{id}"));

        let sqlite = create_statements(Dialect::Sqlite);
        assert!(sqlite[0].1.contains("INTEGER PRIMARY KEY AUTOINCREMENT"));
    }
}
