//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (DB_*, JWT_SECRET, ADMIN_*, NODE_ENV)
//!     → validation.rs (presence checks)
//!     → StoreConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{
    AdminConfig, DatabaseConfig, Dialect, Environment, ListenerConfig, ObservabilityConfig,
    RateLimitConfig, RateLimitPolicy, SecurityConfig, SessionConfig, StoreConfig, TimeoutConfig,
};
