//! Per-target evaluation pipeline
//!
//! ```text
//! health fetch ──err──▶ Critical (NoActuatorSupport | NotResponding | HealthError)
//!      │
//!   not UP ───────────▶ Critical (Unhealthy)
//!      │
//! metrics fetch ─err──▶ Informational (MetricsUnavailable)
//!      │
//! thresholds ─breach──▶ Critical (ThresholdBreach)
//!      │
//!      └──────────────▶ Informational (Routine)
//! ```
//!
//! Every evaluation yields exactly one [`AlertDecision`]. Health and metrics
//! fetch share a single deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, instrument, warn};

use crate::{
    HealthStatus, Metrics,
    config::Thresholds,
    monitors::actuator::{ACTUATOR_PATH, ActuatorSource, HealthError, MetricsError},
    util::{clock_prefix, join_url},
};

/// How a decision is routed to the notification channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Critical desktop notification with sound, plus mail
    Critical,
    /// Normal desktop notification, no mail
    Informational,
    /// Logged only
    Silent,
}

impl Severity {
    pub fn is_alert(self) -> bool {
        matches!(self, Severity::Critical)
    }

    pub fn send_mail(self) -> bool {
        matches!(self, Severity::Critical)
    }
}

/// What led to a decision
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionKind {
    NoActuatorSupport,
    NotResponding,
    HealthError,
    Unhealthy(HealthStatus),
    MetricsUnavailable,
    ThresholdBreach(Metrics),
    Routine(Metrics),
    ConnectivityLost,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertDecision {
    pub target: String,
    pub message: String,
    pub severity: Severity,
    pub kind: DecisionKind,
}

impl AlertDecision {
    fn critical(target: &str, kind: DecisionKind, message: String) -> Self {
        Self {
            target: target.to_string(),
            message,
            severity: Severity::Critical,
            kind,
        }
    }

    fn informational(target: &str, kind: DecisionKind, message: String) -> Self {
        Self {
            target: target.to_string(),
            message,
            severity: Severity::Informational,
            kind,
        }
    }

    /// Notice about the monitoring host itself being offline.
    pub fn connectivity_lost(connectivity_url: &str) -> Self {
        Self::informational(
            connectivity_url,
            DecisionKind::ConnectivityLost,
            format!("{} NO INTERNET CONNECTIVITY", clock_prefix()),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdEvaluation {
    WithinLimits,
    Breached { cpu: bool, memory: bool },
}

impl ThresholdEvaluation {
    /// Compares metrics against the configured thresholds.
    ///
    /// The memory check is skipped when the total memory is unknown.
    pub fn evaluate(metrics: &Metrics, thresholds: &Thresholds) -> ThresholdEvaluation {
        let cpu = metrics.effective_cpu_percent() > f64::from(thresholds.cpu);
        let memory = metrics
            .memory_percent()
            .is_some_and(|percent| percent > f64::from(thresholds.jvm));

        if cpu || memory {
            ThresholdEvaluation::Breached { cpu, memory }
        } else {
            ThresholdEvaluation::WithinLimits
        }
    }

    pub fn is_breached(self) -> bool {
        matches!(self, ThresholdEvaluation::Breached { .. })
    }
}

/// `CPU: 12.50%, JVM: 1.2/4.0 GB`
pub fn format_metrics(metrics: &Metrics) -> String {
    format!(
        "CPU: {:.2}%, JVM: {:.1}/{:.1} GB",
        metrics.effective_cpu_percent(),
        metrics.memory_used,
        metrics.memory_total
    )
}

/// Runs the evaluation pipeline for single targets
#[derive(Clone)]
pub struct TargetEvaluator {
    source: Arc<dyn ActuatorSource>,
    thresholds: Thresholds,
    timeout: Duration,
}

impl TargetEvaluator {
    pub fn new(source: Arc<dyn ActuatorSource>, thresholds: Thresholds, timeout: Duration) -> Self {
        Self {
            source,
            thresholds,
            timeout,
        }
    }

    #[instrument(skip(self))]
    pub async fn evaluate(&self, target: &str) -> AlertDecision {
        let deadline = Instant::now() + self.timeout;

        let health = timeout_at(deadline, self.source.health(target))
            .await
            .unwrap_or(Err(HealthError::NotResponding));

        let status = match health {
            Ok(status) => status,
            Err(e) => return self.health_failure(target, e),
        };

        if !status.is_up() {
            warn!("health status {status} for {target}");
            return AlertDecision::critical(
                target,
                DecisionKind::Unhealthy(status.clone()),
                format!("{} Health Status: {status}. Attention required!", clock_prefix()),
            );
        }

        let metrics = timeout_at(deadline, self.source.metrics(target))
            .await
            .unwrap_or(Err(MetricsError::DeadlineExceeded));

        let metrics = match metrics {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!("failed to get metrics for {target}: {e}");
                return AlertDecision::informational(
                    target,
                    DecisionKind::MetricsUnavailable,
                    format!(
                        "{} Health status: {status}. Failed to get metrics: {e}",
                        clock_prefix()
                    ),
                );
            }
        };

        match ThresholdEvaluation::evaluate(&metrics, &self.thresholds) {
            ThresholdEvaluation::Breached { cpu, memory } => {
                warn!("{target} exceeded thresholds (cpu: {cpu}, memory: {memory})");
                AlertDecision::critical(
                    target,
                    DecisionKind::ThresholdBreach(metrics),
                    format!(
                        "{} Attention required! {}",
                        clock_prefix(),
                        format_metrics(&metrics)
                    ),
                )
            }
            ThresholdEvaluation::WithinLimits => {
                info!("[{target}] {}", format_metrics(&metrics));
                AlertDecision::informational(
                    target,
                    DecisionKind::Routine(metrics),
                    format!("{} {}", clock_prefix(), format_metrics(&metrics)),
                )
            }
        }
    }

    fn health_failure(&self, target: &str, err: HealthError) -> AlertDecision {
        match err {
            HealthError::NoActuatorSupport => {
                let endpoint = join_url(target, ACTUATOR_PATH);
                warn!("no actuator support for {target}");
                AlertDecision::critical(
                    target,
                    DecisionKind::NoActuatorSupport,
                    format!("{} No actuator support for: {endpoint}", clock_prefix()),
                )
            }
            HealthError::NotResponding => {
                warn!("timeout exceeded, no response from {target}");
                AlertDecision::critical(
                    target,
                    DecisionKind::NotResponding,
                    format!(
                        "{} No response from app. Attention required!",
                        clock_prefix()
                    ),
                )
            }
            HealthError::Other(e) => {
                debug!("failed to get health status for {target}: {e}");
                AlertDecision::critical(
                    target,
                    DecisionKind::HealthError,
                    format!("{} Failed to get health status: {e}", clock_prefix()),
                )
            }
        }
    }
}
