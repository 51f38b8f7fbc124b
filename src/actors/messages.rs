//! Message types for actor communication

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::alerts::DispatchReport;
use crate::monitors::evaluation::AlertDecision;

/// Event published when the evaluation of a target has finished
///
/// Published on a broadcast channel. Having no subscribers is fine, slow
/// subscribers may lag and miss events.
#[derive(Debug, Clone)]
pub struct DecisionEvent {
    /// Base URL of the evaluated target
    pub target: String,

    pub decision: AlertDecision,

    /// What happened on the notification channels
    pub dispatch: DispatchReport,

    /// When the evaluation finished
    pub timestamp: DateTime<Utc>,
}

/// Result of a single monitoring cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Connectivity check failed, nothing was evaluated
    Offline,

    /// Too many evaluations of earlier cycles are still running
    Backlogged { in_flight: usize },

    /// One evaluation task was launched per target
    Launched { targets: usize },
}

/// Commands that can be sent to the MonitorActor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Run a cycle immediately (bypassing the interval timer)
    CycleNow {
        respond_to: oneshot::Sender<CycleOutcome>,
    },

    /// Number of evaluation tasks that have not finished yet
    InFlight { respond_to: oneshot::Sender<usize> },

    /// Stop ticking and wait for running evaluations to finish
    Shutdown { respond_to: oneshot::Sender<()> },
}
