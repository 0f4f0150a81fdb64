//! Startup gating.

use crate::config::DatabaseConfig;
use crate::db::{ConnectionPool, DbError};
use crate::resilience::backoff::calculate_backoff;

const MAX_STARTUP_DELAY_MS: u64 = 30_000;

/// Initialize `pool` and wait until the database answers a ping.
///
/// Retries up to `startup_retries` times with exponential backoff. Returns the last
/// error when the database never becomes reachable.
pub async fn wait_for_database(pool: &ConnectionPool, config: &DatabaseConfig) -> Result<(), DbError> {
    let attempts = config.startup_retries.max(1);
    let mut last_error = DbError::NotInitialized;

    for attempt in 1..=attempts {
        match pool.initialize().await {
            Ok(()) if pool.test_connection().await => {
                tracing::info!(attempt, "Database is reachable");
                return Ok(());
            }
            Ok(()) => {
                tracing::warn!(attempt, attempts, "Database ping failed");
            }
            Err(e) if !e.is_pool_level() => return Err(e),
            Err(e) => {
                tracing::warn!(attempt, attempts, error = %e, "Database not ready");
                last_error = e;
            }
        }

        if attempt < attempts {
            let delay = calculate_backoff(attempt, config.startup_retry_delay_ms, MAX_STARTUP_DELAY_MS);
            tokio::time::sleep(delay).await;
        }
    }

    tracing::error!(attempts, "Database did not become reachable");
    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sqlite_database_is_ready_on_first_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig::sqlite(&dir.path().join("startup.db"));
        let pool = ConnectionPool::new(config.clone());

        wait_for_database(&pool, &config).await.unwrap();
        assert!(pool.is_initialized());
    }

    #[tokio::test]
    async fn unreachable_database_gives_up() {
        let config = DatabaseConfig {
            url: Some("mysql://nobody@127.0.0.1:1/none".into()),
            startup_retries: 2,
            startup_retry_delay_ms: 1,
            acquire_timeout_ms: 200,
            ..DatabaseConfig::default()
        };
        let pool = ConnectionPool::new(config.clone());
        assert!(wait_for_database(&pool, &config).await.is_err());
    }
}
