//! Bounded connection pool with scoped transactions.
//!
//! # Responsibilities
//! - Establish the sqlx pool once (idempotent initialization)
//! - Lease connections through a counting semaphore with an acquire timeout
//! - Bound the wait queue when configured
//! - Run parameterized statements and transactions with guaranteed release
//!
//! # Design Decisions
//! - A lease is a `PooledConnection` guard; dropping it returns both the permit and
//!   the underlying connection, so a cancelled request cannot leak a connection
//! - `release` consumes the guard, so releasing twice does not type-check
//! - sqlx's `Any` driver keeps the pool backend-agnostic (MySQL in production, SQLite in tests)

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use sqlx::any::{Any, AnyPoolOptions, AnyQueryResult, AnyRow};
use sqlx::pool::PoolConnection;
use sqlx::{AnyConnection, AnyPool, Connection};
use tokio::sync::{OnceCell, OwnedSemaphorePermit, Semaphore};

use crate::config::{DatabaseConfig, Dialect};
use crate::db::error::DbError;
use crate::db::params::{bind_params, SqlParam};
use crate::observability::metrics;

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub max_connections: usize,
    pub leased: usize,
    pub available: usize,
    pub waiting: usize,
}

/// A bounded pool of database connections.
pub struct ConnectionPool {
    config: DatabaseConfig,
    pool: OnceCell<AnyPool>,
    permits: Arc<Semaphore>,
    max_connections: usize,
    waiting: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("initialized", &self.pool.initialized())
            .field("stats", &self.stats())
            .finish()
    }
}

impl ConnectionPool {
    /// Create an uninitialized pool. No connection is opened until [`initialize`].
    ///
    /// [`initialize`]: ConnectionPool::initialize
    pub fn new(config: DatabaseConfig) -> Self {
        let max_connections = config.max_connections.max(1) as usize;
        Self {
            config,
            pool: OnceCell::new(),
            permits: Arc::new(Semaphore::new(max_connections)),
            max_connections,
            waiting: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
        }
    }

    /// Create and initialize a pool in one step.
    pub async fn connect(config: DatabaseConfig) -> Result<Self, DbError> {
        let pool = Self::new(config);
        pool.initialize().await?;
        Ok(pool)
    }

    /// Establish the underlying pool. A second call on an initialized pool is a no-op.
    ///
    /// Fails with [`DbError::Connection`] if the backing store is unreachable.
    pub async fn initialize(&self) -> Result<(), DbError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::PoolClosed);
        }

        let url = self.config.connection_url()?;
        self.pool
            .get_or_try_init(|| async {
                sqlx::any::install_default_drivers();

                tracing::info!(
                    max_connections = self.max_connections,
                    queue_limit = self.config.queue_limit,
                    "Initializing database connection pool"
                );

                AnyPoolOptions::new()
                    .max_connections(self.max_connections as u32)
                    .acquire_timeout(self.acquire_timeout())
                    .idle_timeout(Some(Duration::from_millis(self.config.idle_timeout_ms)))
                    .connect(&url)
                    .await
                    .map_err(|e| match DbError::from(e) {
                        DbError::Query(e) => DbError::Connection(e),
                        other => other,
                    })
            })
            .await?;

        tracing::info!("Database connection pool initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.initialized()
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect()
    }

    fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.config.acquire_timeout_ms)
    }

    /// Lease a connection, waiting up to the configured acquire timeout.
    ///
    /// Only the calling task waits; fails with [`DbError::PoolExhausted`] on timeout
    /// or when the wait queue is full.
    pub async fn acquire(&self) -> Result<PooledConnection, DbError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::PoolClosed);
        }
        let pool = self.pool.get().ok_or(DbError::NotInitialized)?;

        let started = Instant::now();
        let permit = {
            let _slot = QueueSlot::enter(&self.waiting, self.config.queue_limit).ok_or(
                DbError::PoolExhausted {
                    waited: Duration::ZERO,
                },
            )?;

            match tokio::time::timeout(self.acquire_timeout(), self.permits.clone().acquire_owned())
                .await
            {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => return Err(DbError::PoolClosed),
                Err(_) => {
                    let waited = started.elapsed();
                    tracing::warn!(
                        waited_ms = waited.as_millis() as u64,
                        max_connections = self.max_connections,
                        "Connection pool exhausted"
                    );
                    return Err(DbError::PoolExhausted { waited });
                }
            }
        };

        let conn = pool.acquire().await.map_err(DbError::from)?;
        metrics::record_pool_acquire(started, self.max_connections - self.permits.available_permits());

        Ok(PooledConnection {
            conn,
            _permit: permit,
        })
    }

    /// Return a connection to the pool.
    ///
    /// Dropping the guard has the same effect; this exists to make release explicit
    /// at call sites.
    pub fn release(&self, conn: PooledConnection) {
        drop(conn);
    }

    /// Run a parameterized statement and return its rows.
    pub async fn execute(&self, query: &str, params: &[SqlParam]) -> Result<Vec<AnyRow>, DbError> {
        let mut conn = self.acquire().await?;
        fetch_on(&mut conn, query, params).await
    }

    /// Run a parameterized statement that returns no rows.
    pub async fn run(&self, query: &str, params: &[SqlParam]) -> Result<AnyQueryResult, DbError> {
        let mut conn = self.acquire().await?;
        run_on(&mut conn, query, params).await
    }

    /// Run `f` inside a transaction on a single leased connection.
    ///
    /// Commits when `f` returns `Ok`, rolls back and returns the error otherwise.
    /// The connection is released afterwards in every case.
    pub async fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut AnyConnection) -> BoxFuture<'c, Result<T, E>>,
        E: From<DbError>,
    {
        let mut conn = self.acquire().await?;
        let mut tx = conn.begin().await.map_err(DbError::from)?;
        tracing::debug!("Transaction started");

        match f(&mut *tx).await {
            Ok(value) => {
                tx.commit().await.map_err(DbError::from)?;
                tracing::debug!("Transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "Transaction rollback failed");
                } else {
                    tracing::debug!("Transaction rolled back");
                }
                Err(err)
            }
        }
    }

    /// Liveness probe. Never fails: transport errors become `false`.
    pub async fn test_connection(&self) -> bool {
        let mut conn = match self.acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "Database connection test failed");
                return false;
            }
        };

        match conn.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Database ping failed");
                false
            }
        }
    }

    /// Drain and terminate all connections. Later `acquire` calls fail with `PoolClosed`.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.permits.close();
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
        tracing::info!("Database connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> PoolStats {
        let available = if self.is_closed() {
            0
        } else {
            self.permits.available_permits()
        };
        PoolStats {
            max_connections: self.max_connections,
            leased: self.max_connections.saturating_sub(self.permits.available_permits()),
            available,
            waiting: self.waiting.load(Ordering::Relaxed),
        }
    }
}

/// Run a parameterized statement on a connection already held (e.g. inside a transaction).
pub async fn fetch_on(
    conn: &mut AnyConnection,
    query: &str,
    params: &[SqlParam],
) -> Result<Vec<AnyRow>, DbError> {
    let started = Instant::now();
    let result = bind_params(sqlx::query(query), params).fetch_all(&mut *conn).await;
    log_statement(query, started, result.is_ok());
    result.map_err(DbError::from)
}

pub async fn run_on(
    conn: &mut AnyConnection,
    query: &str,
    params: &[SqlParam],
) -> Result<AnyQueryResult, DbError> {
    let started = Instant::now();
    let result = bind_params(sqlx::query(query), params).execute(&mut *conn).await;
    log_statement(query, started, result.is_ok());
    result.map_err(DbError::from)
}

fn log_statement(query: &str, started: Instant, ok: bool) {
    let duration = started.elapsed();
    let preview: String = query.chars().take(100).collect();
    tracing::debug!(
        query = %preview,
        duration_ms = duration.as_millis() as u64,
        ok,
        "DB query executed"
    );
    metrics::record_db_query(duration, ok);
}

/// A leased connection.
///
/// When dropped, the connection and its slot are returned to the pool.
pub struct PooledConnection {
    conn: PoolConnection<Any>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = AnyConnection;
    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

/// Marks one task as waiting for a permit; the count drops with the guard.
struct QueueSlot {
    waiting: Arc<AtomicUsize>,
}

impl QueueSlot {
    fn enter(waiting: &Arc<AtomicUsize>, limit: usize) -> Option<Self> {
        let mut current = waiting.load(Ordering::Relaxed);
        loop {
            if limit > 0 && current >= limit {
                return None;
            }
            match waiting.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        Some(Self {
            waiting: waiting.clone(),
        })
    }
}

impl Drop for QueueSlot {
    fn drop(&mut self) {
        self.waiting.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_slot_respects_limit() {
        let waiting = Arc::new(AtomicUsize::new(0));
        let first = QueueSlot::enter(&waiting, 2).unwrap();
        let _second = QueueSlot::enter(&waiting, 2).unwrap();
        assert!(QueueSlot::enter(&waiting, 2).is_none());

        drop(first);
        assert_eq!(waiting.load(Ordering::Relaxed), 1);
        assert!(QueueSlot::enter(&waiting, 2).is_some());
    }

    #[test]
    fn zero_queue_limit_is_unbounded() {
        let waiting = Arc::new(AtomicUsize::new(0));
        let slots: Vec<_> = (0..64).map(|_| QueueSlot::enter(&waiting, 0).unwrap()).collect();
        assert_eq!(waiting.load(Ordering::Relaxed), 64);
        drop(slots);
        assert_eq!(waiting.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn uninitialized_pool_reports_not_initialized() {
        let pool = ConnectionPool::new(DatabaseConfig::default());
        assert!(matches!(pool.acquire().await, Err(DbError::NotInitialized)));
        assert!(!pool.test_connection().await);
        assert_eq!(pool.stats().available, 10);
    }

    #[tokio::test]
    async fn closed_pool_rejects_acquire() {
        let pool = ConnectionPool::new(DatabaseConfig::default());
        pool.close().await;
        assert!(matches!(pool.acquire().await, Err(DbError::PoolClosed)));
        assert!(matches!(pool.initialize().await, Err(DbError::PoolClosed)));
    }
}
