//! Fixed-window rate limiting keyed by client and route.
//!
//! # Responsibilities
//! - Count requests per (client, route) inside fixed windows
//! - Select the policy for a path (most specific prefix wins)
//! - Evict expired records, on a timer and on access when the map grows large
//!
//! # Design Decisions
//! - Each key is updated under its map shard lock, so concurrent requests
//!   never admit more than `max_requests` per window
//! - A burst of up to twice the limit across a window boundary is accepted

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::{RateLimitConfig, RateLimitPolicy};
use crate::routing::{longest_match, PathPrefixMatcher};

/// Counter state for one (client, route) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub reset_at_ms: u64,
}

/// Outcome of a single `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Window end, milliseconds since the Unix epoch.
    pub reset_at_ms: u64,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, at least 1.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms).div_ceil(1000).max(1)
    }

    /// Window end in Unix seconds, as sent in `x-ratelimit-reset`.
    pub fn reset_at_secs(&self) -> u64 {
        self.reset_at_ms.div_ceil(1000)
    }
}

type RecordKey = (String, String);

pub struct RateLimiter {
    records: DashMap<RecordKey, RateLimitRecord>,
    policies: Vec<(PathPrefixMatcher, RateLimitPolicy)>,
    max_tracked_keys: usize,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let policies = config
            .policies
            .iter()
            .map(|p| (PathPrefixMatcher::new(p.prefix.clone()), p.clone()))
            .collect();

        Self {
            records: DashMap::new(),
            policies,
            max_tracked_keys: config.max_tracked_keys.max(1),
        }
    }

    /// Policy governing `path`, if any prefix matches.
    pub fn policy_for(&self, path: &str) -> Option<&RateLimitPolicy> {
        longest_match(&self.policies, path).map(|(_, policy)| policy)
    }

    pub fn check(
        &self,
        client_id: &str,
        route_key: &str,
        window_ms: u64,
        max_requests: u32,
    ) -> RateLimitDecision {
        self.check_at(client_id, route_key, window_ms, max_requests, now_ms())
    }

    /// `check` against an explicit clock.
    pub fn check_at(
        &self,
        client_id: &str,
        route_key: &str,
        window_ms: u64,
        max_requests: u32,
        now_ms: u64,
    ) -> RateLimitDecision {
        if self.records.len() > self.max_tracked_keys {
            self.sweep_expired_at(now_ms);
        }

        let fresh = RateLimitRecord {
            count: 1,
            reset_at_ms: now_ms.saturating_add(window_ms),
        };

        let key = (client_id.to_string(), route_key.to_string());
        let (allowed, record) = match self.records.entry(key) {
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                (true, fresh)
            }
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                if now_ms > record.reset_at_ms {
                    *record = fresh;
                    (true, fresh)
                } else if record.count < max_requests {
                    record.count += 1;
                    (true, *record)
                } else {
                    (false, *record)
                }
            }
        };

        RateLimitDecision {
            allowed,
            limit: max_requests,
            remaining: if allowed {
                max_requests.saturating_sub(record.count)
            } else {
                0
            },
            reset_at_ms: record.reset_at_ms,
        }
    }

    /// Check `path` against its policy. `None` when no policy applies.
    pub fn check_route(&self, client_id: &str, path: &str) -> Option<RateLimitDecision> {
        let policy = self.policy_for(path)?;
        Some(self.check(client_id, path, policy.window_ms, policy.max_requests))
    }

    /// Drop every record whose window has ended. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(now_ms())
    }

    pub fn sweep_expired_at(&self, now_ms: u64) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| record.reset_at_ms >= now_ms);
        before.saturating_sub(self.records.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.records.len()
    }

    /// Periodically sweep expired records until shutdown.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.tracked_keys(), "Swept expired rate limit records");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate limit sweeper stopping");
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("tracked_keys", &self.records.len())
            .field("policies", &self.policies.len())
            .finish()
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
