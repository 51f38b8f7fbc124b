//! Spring Boot Actuator client
//!
//! Health is read from `/actuator/health`, resource usage from four metric
//! endpoints under `/actuator/metrics/`:
//!
//! ```text
//! process.cpu.usage   fractional process CPU load
//! system.cpu.count    available cores
//! jvm.memory.used     bytes
//! jvm.memory.max      bytes, may be negative if the JVM has no upper bound
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{instrument, trace};

use crate::{HealthStatus, Metrics, util::join_url};

pub const ACTUATOR_PATH: &str = "actuator";
const HEALTH_PATH: &str = "actuator/health";
const METRICS_PATH: &str = "actuator/metrics";

const CPU_USAGE: &str = "process.cpu.usage";
const CPU_COUNT: &str = "system.cpu.count";
const MEMORY_USED: &str = "jvm.memory.used";
const MEMORY_MAX: &str = "jvm.memory.max";

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HealthError {
    /// The target does not expose the actuator health endpoint
    #[error("actuator endpoint not available")]
    NoActuatorSupport,

    /// Deadline exceeded before the target answered
    #[error("no response")]
    NotResponding,

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to fetch {metric}: {reason}")]
    Fetch { metric: String, reason: String },

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Source of health and resource information for a target.
///
/// Implementations must be safe to share between concurrently running
/// evaluations.
#[async_trait]
pub trait ActuatorSource: Send + Sync {
    async fn health(&self, target: &str) -> Result<HealthStatus, HealthError>;

    async fn metrics(&self, target: &str) -> Result<Metrics, MetricsError>;
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    status: HealthStatus,
}

#[derive(Debug, Deserialize)]
struct MetricBody {
    #[serde(default)]
    measurements: Vec<Measurement>,
}

#[derive(Debug, Deserialize)]
struct Measurement {
    #[serde(default)]
    statistic: String,
    value: f64,
}

impl MetricBody {
    fn value(&self) -> Option<f64> {
        self.measurements
            .iter()
            .find(|m| m.statistic == "VALUE")
            .or_else(|| self.measurements.first())
            .map(|m| m.value)
    }
}

/// HTTP client for actuator endpoints (reused across all targets)
#[derive(Debug, Clone)]
pub struct ActuatorClient {
    client: reqwest::Client,
}

impl ActuatorClient {
    pub fn new(request_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_metric(&self, target: &str, metric: &str) -> Result<f64, MetricsError> {
        let url = join_url(target, &format!("{METRICS_PATH}/{metric}"));
        let fetch_error = |reason: String| MetricsError::Fetch {
            metric: metric.to_string(),
            reason,
        };

        trace!("requesting {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| fetch_error(e.to_string()))?;

        let body: MetricBody = response
            .json()
            .await
            .map_err(|e| fetch_error(format!("invalid response: {e}")))?;

        body.value()
            .ok_or_else(|| fetch_error("no measurements".to_string()))
    }
}

fn classify_health_error(err: reqwest::Error) -> HealthError {
    if err.is_timeout() {
        HealthError::NotResponding
    } else {
        HealthError::Other(err.to_string())
    }
}

#[async_trait]
impl ActuatorSource for ActuatorClient {
    #[instrument(skip(self))]
    async fn health(&self, target: &str) -> Result<HealthStatus, HealthError> {
        let url = join_url(target, HEALTH_PATH);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(classify_health_error)?;

        let status_code = response.status();
        if status_code == StatusCode::NOT_FOUND {
            return Err(HealthError::NoActuatorSupport);
        }

        let body = response.text().await.map_err(classify_health_error)?;

        // DOWN is reported with 503, so the body counts even for error codes
        match serde_json::from_str::<HealthBody>(&body) {
            Ok(health) => {
                trace!("{target}: health {} ({status_code})", health.status);
                Ok(health.status)
            }
            Err(e) if status_code.is_success() => Err(HealthError::Other(format!(
                "invalid health response: {e}"
            ))),
            Err(_) => Err(HealthError::Other(format!(
                "unexpected response status: {status_code}"
            ))),
        }
    }

    #[instrument(skip(self))]
    async fn metrics(&self, target: &str) -> Result<Metrics, MetricsError> {
        let (cpu_usage, cpu_count, memory_used, memory_max) = futures::try_join!(
            self.fetch_metric(target, CPU_USAGE),
            self.fetch_metric(target, CPU_COUNT),
            self.fetch_metric(target, MEMORY_USED),
            self.fetch_metric(target, MEMORY_MAX),
        )?;

        Ok(Metrics {
            cpu_usage,
            cpu_count,
            memory_used: memory_used / BYTES_PER_GIB,
            memory_total: memory_max / BYTES_PER_GIB,
        })
    }
}
