//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Startup database probe fails:
//!     → backoff.rs (exponential delay with jitter)
//!     → probe again, up to the configured attempt count
//! ```
//!
//! # Design Decisions
//! - Request-path failures are surfaced, never retried silently; callers decide
//! - Jitter keeps restarted replicas from probing in lockstep

pub mod backoff;
