//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check presence of externally provided secrets and credentials
//! - Validate value ranges (limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: StoreConfig → Result<(), Vec<ValidationError>>
//! - Values are opaque: presence is checked, content is not

use std::fmt;

use crate::config::schema::StoreConfig;

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl ValidationError {
    fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

pub fn validate_config(config: &StoreConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let db = &config.database;
    if db.url.is_none() {
        if is_blank(db.user.as_deref()) {
            errors.push(ValidationError::new("database.user", "must be set"));
        }
        if is_blank(db.database.as_deref()) {
            errors.push(ValidationError::new("database.database", "must be set"));
        }
    }
    if db.max_connections == 0 {
        errors.push(ValidationError::new("database.max_connections", "must be greater than zero"));
    }

    if config.session.secret.is_empty() {
        errors.push(ValidationError::new("session.secret", "must be set"));
    }
    if config.session.cookie_name.is_empty() {
        errors.push(ValidationError::new("session.cookie_name", "must be set"));
    }

    if config.admin.email.is_empty() {
        errors.push(ValidationError::new("admin.email", "must be set"));
    }
    if config.admin.password.is_empty() {
        errors.push(ValidationError::new("admin.password", "must be set"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    }

    for policy in &config.rate_limit.policies {
        if policy.max_requests == 0 || policy.window_ms == 0 {
            errors.push(ValidationError::new(
                "rate_limit.policies",
                "window and max_requests must be greater than zero",
            ));
            break;
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(str::trim).unwrap_or_default().is_empty()
}
