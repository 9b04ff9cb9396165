//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the daemon.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the shortener daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ShortenerConfig {
    /// Application identity.
    pub app: AppConfig,

    /// Log level and output format.
    pub logging: LoggingConfig,

    /// Prometheus recorder settings.
    pub metrics: MetricsConfig,

    /// Health endpoint and evaluator settings.
    pub health: HealthConfig,

    /// Public HTTP listener.
    pub web: WebConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Database connectivity.
    pub database: DatabaseConfig,
}

/// Application identity, attached to every log line.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
    /// Deployment environment (e.g., "local", "staging", "production").
    pub env: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "shortener".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            env: "local".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Output format: "pretty" or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and expose `/metrics`.
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Read/write/idle budgets shared by every HTTP listener.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpTimeouts {
    /// Budget for reading a request body, in milliseconds.
    pub read_timeout_ms: u64,

    /// Budget for producing a response, in milliseconds.
    pub write_timeout_ms: u64,

    /// Budget for open connections to drain once the listener stops.
    pub idle_timeout_ms: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            read_timeout_ms: 5_000,
            write_timeout_ms: 10_000,
            idle_timeout_ms: 30_000,
        }
    }
}

impl HttpTimeouts {
    pub fn read(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

/// Health subsystem configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Host the health listener binds to.
    pub host: String,

    /// Port the health listener binds to.
    pub port: u16,

    /// Interval between evaluation cycles in milliseconds.
    pub check_interval_ms: u64,

    /// Budget for a single checker within a cycle in milliseconds.
    pub check_timeout_ms: u64,

    /// Longest time the first cycle waits on startup gates, in milliseconds.
    pub startup_grace_ms: u64,

    #[serde(flatten)]
    pub timeouts: HttpTimeouts,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            check_interval_ms: 30_000,
            check_timeout_ms: 5_000,
            startup_grace_ms: 30_000,
            timeouts: HttpTimeouts::default(),
        }
    }
}

impl HealthConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }
}

/// Public HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebConfig {
    /// Build the `web` worker at all.
    pub enabled: bool,

    pub host: String,

    pub port: u16,

    #[serde(flatten)]
    pub timeouts: HttpTimeouts,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 8080,
            timeouts: HttpTimeouts::default(),
        }
    }
}

impl WebConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Longest time to wait for every worker to acknowledge stop.
    pub timeout_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { timeout_ms: 5_000 }
    }
}

impl ShutdownConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Database connectivity configuration.
///
/// The connection string itself comes from the environment, see
/// [`crate::database::dsn`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connect at boot and register the database checker.
    pub enabled: bool,

    /// Overall budget for the boot-time connect loop in milliseconds.
    pub connect_timeout_ms: u64,

    /// First backoff delay in milliseconds.
    pub initial_backoff_ms: u64,

    /// Backoff delay cap in milliseconds.
    pub max_backoff_ms: u64,

    /// Pool size.
    pub max_connections: u32,

    /// Budget for acquiring a pooled connection in milliseconds.
    pub acquire_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            connect_timeout_ms: 60_000,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
            max_connections: 5,
            acquire_timeout_ms: 3_000,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}
