//! Rolling in-memory performance samples.
//!
//! Keeps the most recent samples only; the health endpoint summarises the last minute.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

const MAX_SAMPLES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Request { failed: bool },
    DbConnection,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    kind: SampleKind,
    duration: Duration,
    at: Instant,
}

/// Summary over a time window, serialized into the health payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub total_requests: usize,
    /// Milliseconds.
    pub average_response_time: f64,
    pub error_rate: f64,
    /// Milliseconds.
    pub db_connection_time: f64,
}

#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    samples: Mutex<VecDeque<Sample>>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: SampleKind, duration: Duration) {
        self.record_at(kind, duration, Instant::now());
    }

    fn record_at(&self, kind: SampleKind, duration: Duration, at: Instant) {
        let mut samples = self.samples.lock().expect("performance monitor mutex poisoned");
        if samples.len() == MAX_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(Sample { kind, duration, at });
    }

    pub fn summary(&self, window: Duration) -> PerformanceSummary {
        let now = Instant::now();
        let samples = self.samples.lock().expect("performance monitor mutex poisoned");
        let recent = samples
            .iter()
            .filter(|s| now.saturating_duration_since(s.at) <= window);

        let mut requests = Vec::new();
        let mut failures = 0usize;
        let mut db = Vec::new();
        for sample in recent {
            match sample.kind {
                SampleKind::Request { failed } => {
                    requests.push(sample.duration);
                    if failed {
                        failures += 1;
                    }
                }
                SampleKind::DbConnection => db.push(sample.duration),
            }
        }

        PerformanceSummary {
            total_requests: requests.len(),
            average_response_time: average_ms(&requests),
            error_rate: if requests.is_empty() {
                0.0
            } else {
                failures as f64 / requests.len() as f64
            },
            db_connection_time: average_ms(&db),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.lock().expect("performance monitor mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn average_ms(durations: &[Duration]) -> f64 {
    if durations.is_empty() {
        return 0.0;
    }
    let total: f64 = durations.iter().map(|d| d.as_secs_f64() * 1000.0).sum();
    total / durations.len() as f64
}
