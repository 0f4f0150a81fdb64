//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the storefront.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration for the storefront backend.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Deployment mode (development or production).
    pub environment: Environment,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Relational database connection and pool settings.
    pub database: DatabaseConfig,

    /// Per-route fixed-window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Admin session token settings.
    pub session: SessionConfig,

    /// Admin bootstrap credentials.
    pub admin: AdminConfig,

    /// Security hardening.
    pub security: SecurityConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Parse the conventional `NODE_ENV`/`APP_ENV` spelling.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// SQL dialect spoken by the configured backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

/// Database connection and pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection URL. Takes precedence over the individual parts below.
    pub url: Option<String>,

    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,

    /// Maximum number of leased connections.
    pub max_connections: u32,

    /// Maximum number of tasks waiting for a connection (0 = unbounded).
    pub queue_limit: usize,

    /// How long `acquire` waits for a free connection before failing.
    pub acquire_timeout_ms: u64,

    /// Idle connections are closed after this long.
    pub idle_timeout_ms: u64,

    /// Create tables on startup if they do not exist.
    pub auto_migrate: bool,

    /// Connection attempts made at startup before giving up.
    pub startup_retries: u32,

    /// Base delay between startup attempts.
    pub startup_retry_delay_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 3306,
            user: None,
            password: None,
            database: None,
            max_connections: 10,
            queue_limit: 0,
            acquire_timeout_ms: 60_000,
            idle_timeout_ms: 300_000,
            auto_migrate: false,
            startup_retries: 30,
            startup_retry_delay_ms: 2_000,
        }
    }
}

impl DatabaseConfig {
    /// Configuration for a SQLite database file, mostly useful for tests and local runs.
    pub fn sqlite(path: &std::path::Path) -> Self {
        Self {
            url: Some(format!("sqlite://{}?mode=rwc", path.display())),
            ..Self::default()
        }
    }

    /// Build the connection URL, percent-encoding credentials.
    pub fn connection_url(&self) -> Result<String, url::ParseError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let mut url = Url::parse(&format!("mysql://{}:{}", self.host, self.port))?;
        if let Some(user) = &self.user {
            url.set_username(user)
                .map_err(|_| url::ParseError::EmptyHost)?;
        }
        if let Some(password) = &self.password {
            url.set_password(Some(password))
                .map_err(|_| url::ParseError::EmptyHost)?;
        }
        if let Some(database) = &self.database {
            url.set_path(&format!("/{database}"));
        }
        Ok(url.to_string())
    }

    pub fn dialect(&self) -> Dialect {
        match &self.url {
            Some(url) if url.starts_with("sqlite:") => Dialect::Sqlite,
            _ => Dialect::MySql,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting of API routes.
    pub enabled: bool,

    /// Interval between background sweeps of expired records.
    pub sweep_interval_secs: u64,

    /// Tracked key count above which a sweep also runs on access.
    pub max_tracked_keys: usize,

    /// Policy table; the longest matching prefix wins.
    pub policies: Vec<RateLimitPolicy>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: 60,
            max_tracked_keys: 100_000,
            policies: vec![
                RateLimitPolicy::new("/api/", FIFTEEN_MINUTES_MS, 100),
                RateLimitPolicy::new("/api/auth/", FIFTEEN_MINUTES_MS, 5),
                RateLimitPolicy::new("/api/orders", FIFTEEN_MINUTES_MS, 20),
            ],
        }
    }
}

const FIFTEEN_MINUTES_MS: u64 = 15 * 60 * 1000;

/// A fixed-window limit applied to every path under `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimitPolicy {
    pub prefix: String,
    pub window_ms: u64,
    pub max_requests: u32,
}

impl RateLimitPolicy {
    pub fn new(prefix: impl Into<String>, window_ms: u64, max_requests: u32) -> Self {
        Self {
            prefix: prefix.into(),
            window_ms,
            max_requests,
        }
    }
}

/// Admin session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// HMAC signing secret.
    pub secret: String,

    /// Cookie carrying the session token.
    pub cookie_name: String,

    /// Token lifetime in seconds.
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            cookie_name: "admin_session".to_string(),
            ttl_secs: 24 * 60 * 60,
        }
    }
}

/// Admin bootstrap credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: "admin@localhost".to_string(),
            password: String::new(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Deadline for the health check's database ping, in milliseconds.
    /// Capped at half the request timeout.
    pub health_probe_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            health_probe_ms: 3_000,
        }
    }
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    /// Effective ping deadline; always leaves the health handler time to answer.
    pub fn health_probe(&self) -> Duration {
        Duration::from_millis(self.health_probe_ms).min(self.request() / 2)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
