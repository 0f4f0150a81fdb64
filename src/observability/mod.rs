//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → performance.rs (rolling window summarised by /api/health)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Health endpoint
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing in production
//! - Request ID flows through all log records of a request
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
pub mod performance;

pub use performance::{PerformanceMonitor, PerformanceSummary};
