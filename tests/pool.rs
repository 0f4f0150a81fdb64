//! Connection pool behavior against a real SQLite database.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use sqlx::Row;

use storefront::db::{run_on, ConnectionPool, DbError, SqlParam};

mod common;

async fn count_users(pool: &ConnectionPool) -> i64 {
    let rows = pool
        .execute("SELECT COUNT(*) AS total FROM users", &[])
        .await
        .unwrap();
    rows[0].try_get("total").unwrap()
}

fn insert_user(email: &str) -> (&'static str, Vec<SqlParam>) {
    (
        "INSERT INTO users (name, email, role, created_at) VALUES (?, ?, 'user', 0)",
        vec!["Test".into(), email.into()],
    )
}

#[tokio::test]
async fn concurrent_leases_never_exceed_max() {
    let (_dir, pool) = common::temp_pool(3).await;
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..12)
        .map(|_| {
            let pool = pool.clone();
            let active = active.clone();
            let peak = peak.clone();
            tokio::spawn(async move {
                let conn = pool.acquire().await.unwrap();
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                assert!(pool.stats().leased <= 3);
                tokio::time::sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                pool.release(conn);
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    let stats = pool.stats();
    assert_eq!(stats.leased, 0);
    assert_eq!(stats.available, 3);
    assert_eq!(stats.waiting, 0);
}

#[tokio::test]
async fn exhausted_pool_times_out() {
    let (_dir, mut config) = common::sqlite_config(1);
    config.acquire_timeout_ms = 100;
    let pool = ConnectionPool::connect(config).await.unwrap();

    let held = pool.acquire().await.unwrap();
    match pool.acquire().await {
        Err(DbError::PoolExhausted { waited }) => assert!(waited >= Duration::from_millis(100)),
        other => panic!("expected PoolExhausted, got {:?}", other.map(|_| ())),
    }

    pool.release(held);
    assert!(pool.acquire().await.is_ok());
}

#[tokio::test]
async fn full_wait_queue_fails_immediately() {
    let (_dir, mut config) = common::sqlite_config(1);
    config.queue_limit = 1;
    config.acquire_timeout_ms = 2_000;
    let pool = Arc::new(ConnectionPool::connect(config).await.unwrap());

    let held = pool.acquire().await.unwrap();
    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire().await.map(|_| ()) })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pool.stats().waiting, 1);

    let started = std::time::Instant::now();
    assert!(matches!(pool.acquire().await, Err(DbError::PoolExhausted { .. })));
    assert!(started.elapsed() < Duration::from_millis(500));

    drop(held);
    assert!(waiter.await.unwrap().is_ok());
}

#[tokio::test]
async fn transaction_commits_all_writes() {
    let (_dir, pool) = common::temp_pool(2).await;

    pool.with_transaction(|conn| {
        async move {
            for email in ["a@shop.test", "b@shop.test"] {
                let (sql, params) = insert_user(email);
                run_on(conn, sql, &params).await?;
            }
            Ok::<_, DbError>(())
        }
        .boxed()
    })
    .await
    .unwrap();

    assert_eq!(count_users(&pool).await, 2);
    assert_eq!(pool.stats().leased, 0);
}

#[tokio::test]
async fn failed_transaction_rolls_back() {
    let (_dir, pool) = common::temp_pool(2).await;

    let result: Result<(), DbError> = pool
        .with_transaction(|conn| {
            async move {
                let (sql, params) = insert_user("ghost@shop.test");
                run_on(conn, sql, &params).await?;
                Err::<(), _>(DbError::NotFound("forced failure"))
            }
            .boxed()
        })
        .await;

    assert!(matches!(result, Err(DbError::NotFound("forced failure"))));
    assert_eq!(count_users(&pool).await, 0);
    assert_eq!(pool.stats().leased, 0);
}

#[tokio::test]
async fn unique_violation_is_duplicate_entry() {
    let (_dir, pool) = common::temp_pool(2).await;
    let (sql, params) = insert_user("dup@shop.test");

    pool.run(sql, &params).await.unwrap();
    let err = pool.run(sql, &params).await.unwrap_err();
    assert!(matches!(err, DbError::DuplicateEntry(_)), "got {err:?}");
    assert!(!err.is_pool_level());
}

#[tokio::test]
async fn failed_statement_still_releases() {
    let (_dir, pool) = common::temp_pool(1).await;

    let err = match pool.execute("SELECT * FROM no_such_table", &[]).await {
        Ok(_) => panic!("query against a missing table succeeded"),
        Err(err) => err,
    };
    assert!(matches!(err, DbError::Query(_)));
    assert_eq!(pool.stats().leased, 0);
    assert!(pool.test_connection().await);
}

#[tokio::test]
async fn cancelled_task_returns_its_connection() {
    let (_dir, pool) = common::temp_pool(1).await;

    let abandoned = tokio::time::timeout(Duration::from_millis(20), async {
        let _conn = pool.acquire().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    })
    .await;
    assert!(abandoned.is_err());

    assert_eq!(pool.stats().leased, 0);
    assert!(pool.acquire().await.is_ok());
}

#[tokio::test]
async fn initialize_is_idempotent_and_close_is_final() {
    let (_dir, pool) = common::temp_pool(2).await;
    pool.initialize().await.unwrap();
    assert!(pool.test_connection().await);

    pool.close().await;
    assert!(pool.is_closed());
    assert!(matches!(pool.acquire().await, Err(DbError::PoolClosed)));
    assert!(!pool.test_connection().await);
    assert!(matches!(pool.initialize().await, Err(DbError::PoolClosed)));
}
