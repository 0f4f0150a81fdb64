//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → classify.rs (public / api / admin-login / admin-protected)
//!     → matcher.rs (prefix matching, most specific wins)
//!     → RequestPipeline decides which checks run
//! ```
//!
//! # Design Decisions
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same class
//! - Path matching is case-sensitive

pub mod classify;
pub mod matcher;

pub use classify::RouteClass;
pub use matcher::{longest_match, PathPrefixMatcher};
