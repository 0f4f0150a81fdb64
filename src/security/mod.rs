//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (fixed-window count per client and route)
//!     → admin session gate (see admin/auth.rs)
//!     → handler
//!     → headers.rs (security headers on every response)
//! ```
//!
//! # Design Decisions
//! - Deny without incrementing once the window is full
//! - Security headers are applied to error responses too
//! - No trust in client input

pub mod headers;
pub mod rate_limit;

pub use headers::apply_security_headers;
pub use rate_limit::{RateLimitDecision, RateLimiter};
