pub mod actors;
pub mod alerts;
pub mod config;
pub mod desktop;
pub mod mail;
pub mod monitors;
pub mod util;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Health state reported by a target's actuator endpoint.
///
/// Anything the remote reports besides `UP` is treated as unhealthy. Unknown
/// values are kept verbatim so they can be shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HealthStatus {
    Up,
    Down,
    OutOfService,
    Unknown,
    Other(String),
}

impl HealthStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, HealthStatus::Up)
    }

    pub fn as_str(&self) -> &str {
        match self {
            HealthStatus::Up => "UP",
            HealthStatus::Down => "DOWN",
            HealthStatus::OutOfService => "OUT_OF_SERVICE",
            HealthStatus::Unknown => "UNKNOWN",
            HealthStatus::Other(status) => status,
        }
    }
}

impl From<String> for HealthStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "UP" => HealthStatus::Up,
            "DOWN" => HealthStatus::Down,
            "OUT_OF_SERVICE" => HealthStatus::OutOfService,
            "UNKNOWN" => HealthStatus::Unknown,
            _ => HealthStatus::Other(value),
        }
    }
}

impl From<HealthStatus> for String {
    fn from(value: HealthStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource snapshot of a single target.
///
/// `cpu_usage` is the fractional (0..1) process load as reported by the JVM,
/// memory values share one unit (GiB when produced by the actuator client).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub cpu_usage: f64,
    pub cpu_count: f64,
    pub memory_used: f64,
    pub memory_total: f64,
}

impl Metrics {
    /// Fractional CPU load scaled by the number of cores, in percent.
    pub fn effective_cpu_percent(&self) -> f64 {
        self.cpu_usage * self.cpu_count * 100.0
    }

    /// Memory usage in percent, `None` if the total is unknown (`<= 0`).
    pub fn memory_percent(&self) -> Option<f64> {
        if self.memory_total <= 0.0 {
            return None;
        }
        Some(self.memory_used / self.memory_total * 100.0)
    }
}
