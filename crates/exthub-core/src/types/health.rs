//! On-demand health reporting for extensions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    /// Everything is operating normally.
    Healthy,
    /// Operating with reduced functionality (e.g. pending migrations).
    Degraded,
    /// Not operating correctly.
    Unhealthy,
    /// Not running (disabled or failed).
    Stopped,
}

impl std::fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// A single named health check inside a probe result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Check name (e.g. `"database"`).
    pub name: String,
    /// Check result.
    pub status: HealthLevel,
    /// Optional detail message.
    #[serde(default)]
    pub message: String,
}

/// Health snapshot produced by invoking an extension's health probe.
///
/// Never cached beyond the single call that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status.
    pub status: HealthLevel,
    /// Summary message.
    #[serde(default)]
    pub message: String,
    /// Individual check results.
    #[serde(default)]
    pub checks: Vec<HealthCheck>,
    /// When the probe ran.
    pub last_checked: DateTime<Utc>,
}

impl HealthStatus {
    /// A healthy status with no individual checks.
    pub fn healthy() -> Self {
        Self {
            status: HealthLevel::Healthy,
            message: String::new(),
            checks: Vec::new(),
            last_checked: Utc::now(),
        }
    }

    /// A status with the given level and message.
    pub fn with_message(status: HealthLevel, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            checks: Vec::new(),
            last_checked: Utc::now(),
        }
    }
}
