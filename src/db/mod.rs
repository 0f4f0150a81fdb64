//! Database access subsystem.
//!
//! # Data Flow
//! ```text
//! handler
//!     → pool.rs (acquire: queue slot → permit → sqlx connection)
//!     → params.rs (bind positional parameters, never string concatenation)
//!     → statement round-trip
//!     → error.rs (classify: pool-level vs query-level)
//!     → PooledConnection dropped → permit and connection returned
//! ```
//!
//! # Design Decisions
//! - The pool is an explicitly constructed value shared through `AppState`, not a global
//! - Leases are RAII guards: release happens on every exit path, including cancellation
//! - Transactions roll back unless explicitly committed

pub mod error;
pub mod params;
pub mod pool;

pub use error::DbError;
pub use params::{bind_params, SqlParam};
pub use pool::{fetch_on, run_on, ConnectionPool, PoolStats, PooledConnection};
