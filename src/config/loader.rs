//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{Environment, StoreConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<StoreConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: StoreConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load configuration the way the server binary does: an optional TOML file
/// followed by environment overrides, then validation.
pub fn load_from_env(path: Option<&Path>) -> Result<StoreConfig, ConfigError> {
    let mut config = match path {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        None => StoreConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment-provided values onto `config`.
///
/// `lookup` abstracts the environment so tests never touch process state.
pub fn apply_env_overrides<F>(config: &mut StoreConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(mode) = lookup("APP_ENV").or_else(|| lookup("NODE_ENV")) {
        config.environment = Environment::parse(&mode);
    }
    if let Some(addr) = lookup("BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }

    let db = &mut config.database;
    if let Some(url) = lookup("DATABASE_URL") {
        db.url = Some(url);
    }
    if let Some(host) = lookup("DB_HOST") {
        db.host = host;
    }
    if let Some(port) = lookup("DB_PORT") {
        db.port = parse_env("DB_PORT", port)?;
    }
    if let Some(user) = lookup("DB_USER") {
        db.user = Some(user);
    }
    if let Some(password) = lookup("DB_PASSWORD") {
        db.password = Some(password);
    }
    if let Some(database) = lookup("DB_DATABASE") {
        db.database = Some(database);
    }
    if let Some(limit) = lookup("DB_CONNECTION_LIMIT") {
        db.max_connections = parse_env("DB_CONNECTION_LIMIT", limit)?;
    }

    if let Some(secret) = lookup("JWT_SECRET") {
        config.session.secret = secret;
    }
    if let Some(email) = lookup("ADMIN_EMAIL") {
        config.admin.email = email;
    }
    if let Some(password) = lookup("ADMIN_PASSWORD") {
        config.admin.password = password;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level;
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_database_and_secrets() {
        let mut config = StoreConfig::default();
        apply_env_overrides(
            &mut config,
            lookup(&[
                ("NODE_ENV", "production"),
                ("DB_HOST", "db"),
                ("DB_PORT", "3307"),
                ("DB_USER", "shop"),
                ("DB_DATABASE", "storefront"),
                ("DB_CONNECTION_LIMIT", "4"),
                ("JWT_SECRET", "secret"),
                ("ADMIN_PASSWORD", "pw"),
            ]),
        )
        .unwrap();

        assert!(config.environment.is_production());
        assert_eq!(config.database.host, "db");
        assert_eq!(config.database.port, 3307);
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.session.secret, "secret");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn app_env_takes_precedence_over_node_env() {
        let mut config = StoreConfig::default();
        apply_env_overrides(
            &mut config,
            lookup(&[("APP_ENV", "development"), ("NODE_ENV", "production")]),
        )
        .unwrap();
        assert!(!config.environment.is_production());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let mut config = StoreConfig::default();
        let err = apply_env_overrides(&mut config, lookup(&[("DB_PORT", "mysql")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "DB_PORT", .. }));
    }

    #[test]
    fn load_config_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.toml");
        fs::write(
            &path,
            r#"
environment = "production"

[database]
url = "sqlite::memory:"
max_connections = 3

[session]
secret = "abc"

[admin]
email = "owner@example.com"
password = "pw"

[[rate_limit.policies]]
prefix = "/api/"
window_ms = 1000
max_requests = 2
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.environment.is_production());
        assert_eq!(config.database.max_connections, 3);
        assert_eq!(config.rate_limit.policies.len(), 1);
        assert_eq!(config.admin.email, "owner@example.com");
    }
}
