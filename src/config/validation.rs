//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, ports set)
//! - Detect listeners colliding on the same address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ShortenerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::{HttpTimeouts, ShortenerConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. `health.port`).
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// Validate the whole configuration, collecting every problem found.
pub fn validate_config(config: &ShortenerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.app.name.trim().is_empty() {
        errors.push(ValidationError::new("app.name", "must not be empty"));
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "logging.level",
            format!("unknown level '{}'", config.logging.level),
        ));
    }
    if !LOG_FORMATS.contains(&config.logging.format.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "logging.format",
            format!("unknown format '{}'", config.logging.format),
        ));
    }

    let health = &config.health;
    if health.port == 0 {
        errors.push(ValidationError::new("health.port", "is required"));
    }
    if health.check_interval_ms == 0 {
        errors.push(ValidationError::new("health.check_interval_ms", "must be > 0"));
    }
    if health.check_timeout_ms == 0 {
        errors.push(ValidationError::new("health.check_timeout_ms", "must be > 0"));
    }
    check_timeouts("health", &health.timeouts, &mut errors);

    let web = &config.web;
    if web.enabled {
        if web.port == 0 {
            errors.push(ValidationError::new("web.port", "is required when web is enabled"));
        } else if web.bind_address() == health.bind_address() {
            errors.push(ValidationError::new(
                "web.port",
                format!("collides with health listener on {}", health.bind_address()),
            ));
        }
        check_timeouts("web", &web.timeouts, &mut errors);
    }

    if config.shutdown.timeout_ms == 0 {
        errors.push(ValidationError::new("shutdown.timeout_ms", "must be > 0"));
    }

    let db = &config.database;
    if db.enabled {
        if db.connect_timeout_ms == 0 {
            errors.push(ValidationError::new("database.connect_timeout_ms", "must be > 0"));
        }
        if db.initial_backoff_ms == 0 {
            errors.push(ValidationError::new("database.initial_backoff_ms", "must be > 0"));
        }
        if db.max_backoff_ms < db.initial_backoff_ms {
            errors.push(ValidationError::new(
                "database.max_backoff_ms",
                "must be >= initial_backoff_ms",
            ));
        }
        if db.max_connections == 0 {
            errors.push(ValidationError::new("database.max_connections", "must be > 0"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_timeouts(section: &str, timeouts: &HttpTimeouts, errors: &mut Vec<ValidationError>) {
    for (name, value) in [
        ("read_timeout_ms", timeouts.read_timeout_ms),
        ("write_timeout_ms", timeouts.write_timeout_ms),
        ("idle_timeout_ms", timeouts.idle_timeout_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(format!("{section}.{name}"), "must be > 0"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&ShortenerConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_problem() {
        let mut config = ShortenerConfig::default();
        config.health.port = 0;
        config.health.check_interval_ms = 0;
        config.logging.format = "xml".into();
        config.shutdown.timeout_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "logging.format",
                "health.port",
                "health.check_interval_ms",
                "shutdown.timeout_ms"
            ]
        );
    }

    #[test]
    fn disabled_sections_are_not_checked() {
        let mut config = ShortenerConfig::default();
        config.web.enabled = false;
        config.web.port = 0;
        config.database.enabled = false;
        config.database.max_connections = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn listeners_must_not_collide() {
        let mut config = ShortenerConfig::default();
        config.web.port = config.health.port;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "web.port");
    }
}
