//! Health reporting subsystem.
//!
//! # Data Flow
//! ```text
//! GET /api/health
//!     → probe.rs (database ping, memory snapshot)
//!     → performance summary of the last minute
//!     → envelope with status "healthy" iff every check passed
//! ```
//!
//! # Design Decisions
//! - The endpoint always answers 200 with a well-formed envelope; failures show up in `checks`
//! - Probes never propagate errors; the database ping has its own deadline below the
//!   request timeout

pub mod probe;

use std::time::{Duration, Instant};

use axum::extract::State;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::http::response::ApiResponse;
use crate::http::server::AppState;
use crate::http::RequestId;
use crate::observability::performance::SampleKind;
use crate::observability::PerformanceSummary;

use self::probe::{memory_headroom_ok, MemorySnapshot};

const PERFORMANCE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub environment: &'static str,
    /// Seconds since the server started.
    pub uptime: u64,
    pub database: DatabaseHealth,
    pub memory: MemoryUsage,
    pub performance: PerformanceSummary,
    pub checks: HealthChecks,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseHealth {
    pub status: &'static str,
    /// Milliseconds.
    pub response_time: u64,
}

/// Megabytes.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryUsage {
    pub used: u64,
    pub total: u64,
    pub external: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct HealthChecks {
    pub database: bool,
    pub memory: bool,
}

impl HealthChecks {
    pub fn all_pass(&self) -> bool {
        self.database && self.memory
    }
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>, request_id: RequestId) -> ApiResponse<HealthReport> {
    let db_started = Instant::now();
    let probe_deadline = state.config.timeouts.health_probe();
    let database_ok = match tokio::time::timeout(probe_deadline, state.pool.test_connection()).await {
        Ok(reachable) => reachable,
        Err(_) => {
            tracing::warn!(
                request_id = %request_id,
                deadline_ms = probe_deadline.as_millis() as u64,
                "Database ping timed out"
            );
            false
        }
    };
    let db_elapsed = db_started.elapsed();
    state.performance.record(SampleKind::DbConnection, db_elapsed);

    let memory = MemorySnapshot::capture();
    let checks = HealthChecks {
        database: database_ok,
        memory: memory_headroom_ok(memory.system_used, memory.system_total),
    };

    if !checks.all_pass() {
        tracing::warn!(
            request_id = %request_id,
            database = checks.database,
            memory = checks.memory,
            "Health check failing"
        );
    }

    let report = HealthReport {
        status: if checks.all_pass() { "healthy" } else { "unhealthy" },
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.as_str(),
        uptime: state.started_at.elapsed().as_secs(),
        database: DatabaseHealth {
            status: if database_ok { "connected" } else { "disconnected" },
            response_time: db_elapsed.as_millis() as u64,
        },
        memory: MemoryUsage {
            used: probe::to_megabytes(memory.process_resident),
            total: probe::to_megabytes(memory.system_total),
            external: probe::to_megabytes(memory.process_virtual),
        },
        performance: state.performance.summary(PERFORMANCE_WINDOW),
        checks,
    };

    ApiResponse::ok(request_id.0, report)
}
