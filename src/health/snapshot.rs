//! Aggregate health snapshot.
//!
//! A snapshot is immutable once built; the monitor publishes a fresh one per
//! evaluation cycle by replacement.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Overall process status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    /// No evaluation cycle has completed yet.
    Starting,
    Healthy,
    Unhealthy,
}

/// Outcome of a single checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerStatus {
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckerStatus {
    pub fn healthy() -> Self {
        Self {
            status: CheckStatus::Healthy,
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Unhealthy,
            error: Some(error.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == CheckStatus::Healthy
    }
}

/// Point-in-time aggregate health record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(rename = "status")]
    pub overall: OverallStatus,
    #[serde(rename = "details")]
    pub checks: BTreeMap<String, CheckerStatus>,
    /// Unix time in milliseconds.
    pub timestamp: u64,
}

impl StatusSnapshot {
    /// Value published before the first cycle.
    pub fn starting() -> Self {
        Self {
            overall: OverallStatus::Starting,
            checks: BTreeMap::new(),
            timestamp: now_millis(),
        }
    }

    /// Aggregate per-checker results: healthy iff every checker is healthy.
    pub fn from_checks(checks: BTreeMap<String, CheckerStatus>) -> Self {
        let overall = if checks.values().all(CheckerStatus::is_healthy) {
            OverallStatus::Healthy
        } else {
            OverallStatus::Unhealthy
        };

        Self {
            overall,
            checks,
            timestamp: now_millis(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.overall == OverallStatus::Healthy
    }

    pub fn is_starting(&self) -> bool {
        self.overall == OverallStatus::Starting
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
