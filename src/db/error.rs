//! Database error classification.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the connection pool and statement execution.
///
/// Pool-level variants (`PoolExhausted`, `PoolClosed`, `NotInitialized`, `Connection`)
/// are kept apart from query-level ones so callers can react differently.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("no connection became available within {waited:?}")]
    PoolExhausted { waited: Duration },

    #[error("connection pool is closed")]
    PoolClosed,

    #[error("connection pool has not been initialized")]
    NotInitialized,

    #[error("connection error: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("invalid connection url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl DbError {
    /// True for failures of the pool or transport rather than of a statement.
    pub fn is_pool_level(&self) -> bool {
        matches!(
            self,
            DbError::PoolExhausted { .. }
                | DbError::PoolClosed
                | DbError::NotInitialized
                | DbError::Connection(_)
        )
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DbError::DuplicateEntry(db.message().to_string())
            }
            sqlx::Error::RowNotFound => DbError::NotFound("row"),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted {
                waited: Duration::ZERO,
            },
            sqlx::Error::PoolClosed => DbError::PoolClosed,
            err @ (sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::WorkerCrashed) => DbError::Connection(err),
            err => DbError::Query(err),
        }
    }
}
