//! MonitorActor - Drives the periodic monitoring cycles
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → Connectivity gate → spawn Evaluate+Dispatch per target → pacing delay
//!     ↑                                         │
//!     │                                         └─→ Publish DecisionEvent
//!     └─── Commands (CycleNow, InFlight, Shutdown)
//! ```
//!
//! The first cycle runs right after start. Cycles do not wait for the tasks of
//! earlier cycles; if evaluations take longer than the interval they overlap.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, instrument, trace, warn};

use crate::alerts::AlertDispatcher;
use crate::config::Config;
use crate::monitors::connectivity::ConnectivityProbe;
use crate::monitors::evaluation::{AlertDecision, TargetEvaluator};

use super::messages::{CycleOutcome, DecisionEvent, MonitorCommand};
use super::tasks::TaskGroup;

/// Delay after launching a cycle so consecutive notification bursts can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    delay: Duration,
}

impl PacingPolicy {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Only cycles with more than one target are paced.
    pub fn delay_for(&self, target_count: usize) -> Option<Duration> {
        (target_count > 1 && !self.delay.is_zero()).then_some(self.delay)
    }
}

/// Actor owning the monitoring loop
pub struct MonitorActor {
    config: Arc<Config>,

    probe: Arc<dyn ConnectivityProbe>,

    evaluator: TargetEvaluator,

    dispatcher: AlertDispatcher,

    pacing: PacingPolicy,

    /// Running evaluation tasks
    tasks: TaskGroup,

    command_rx: mpsc::Receiver<MonitorCommand>,

    /// Broadcast sender for finished evaluations
    event_tx: broadcast::Sender<DecisionEvent>,
}

impl MonitorActor {
    pub fn new(
        config: Arc<Config>,
        probe: Arc<dyn ConnectivityProbe>,
        evaluator: TargetEvaluator,
        dispatcher: AlertDispatcher,
        command_rx: mpsc::Receiver<MonitorCommand>,
        event_tx: broadcast::Sender<DecisionEvent>,
    ) -> Self {
        let pacing = PacingPolicy::new(config.pacing_delay());

        Self {
            config,
            probe,
            evaluator,
            dispatcher,
            pacing,
            tasks: TaskGroup::new(),
            command_rx,
            event_tx,
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command is received or all handles are dropped.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        info!(
            "started monitoring {} targets every {}s",
            self.config.targets.len(),
            self.config.interval
        );

        // the initial cycle runs before any command is looked at
        let outcome = self.run_cycle().await;
        trace!("initial cycle finished: {outcome:?}");

        let period = self.config.interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // commands first, a cycle outlasting the interval keeps the tick
                // permanently ready
                biased;

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(MonitorCommand::CycleNow { respond_to }) => {
                            debug!("received CycleNow command");
                            let outcome = self.run_cycle().await;
                            let _ = respond_to.send(outcome);
                        }

                        Some(MonitorCommand::InFlight { respond_to }) => {
                            let _ = respond_to.send(self.tasks.in_flight());
                        }

                        Some(MonitorCommand::Shutdown { respond_to }) => {
                            debug!("received shutdown command");
                            self.drain().await;
                            let _ = respond_to.send(());
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }

                _ = ticker.tick() => {
                    let outcome = self.run_cycle().await;
                    trace!("cycle finished: {outcome:?}");
                }
            }
        }

        debug!(
            "monitor actor stopped after launching {} evaluations",
            self.tasks.launched()
        );
    }

    /// One pass over all targets
    #[instrument(skip(self))]
    async fn run_cycle(&self) -> CycleOutcome {
        if !self.probe.has_connectivity().await {
            warn!("no internet connection available for monitoring, skipping cycle");
            if self.config.alert_on_connectivity_loss {
                let decision = AlertDecision::connectivity_lost(&self.config.connectivity_url);
                self.dispatcher.dispatch(&decision).await;
            }
            return CycleOutcome::Offline;
        }

        let in_flight = self.tasks.in_flight();
        if let Some(max_in_flight) = self.config.max_in_flight {
            if in_flight >= max_in_flight {
                warn!("{in_flight} evaluations still running, skipping cycle");
                return CycleOutcome::Backlogged { in_flight };
            }
        }

        if in_flight > 0 {
            debug!("{in_flight} evaluations of earlier cycles still running");
        }

        for target in &self.config.targets {
            let target = target.clone();
            let evaluator = self.evaluator.clone();
            let dispatcher = self.dispatcher.clone();
            let event_tx = self.event_tx.clone();

            self.tasks.spawn(async move {
                let decision = evaluator.evaluate(&target).await;
                let dispatch = dispatcher.dispatch(&decision).await;

                let event = DecisionEvent {
                    target,
                    decision,
                    dispatch,
                    timestamp: Utc::now(),
                };

                if event_tx.send(event).is_err() {
                    trace!("no receivers for decision event (this is OK)");
                }
            });
        }

        let targets = self.config.targets.len();
        if let Some(delay) = self.pacing.delay_for(targets) {
            trace!("pacing for {delay:?} before the next cycle");
            tokio::time::sleep(delay).await;
        }

        CycleOutcome::Launched { targets }
    }

    async fn drain(&self) {
        let in_flight = self.tasks.in_flight();
        if in_flight == 0 {
            return;
        }

        // evaluation deadline plus time to deliver the resulting alerts
        let limit = self.config.evaluation_timeout() + self.config.shutdown_grace();

        debug!("waiting up to {limit:?} for {in_flight} running evaluations");
        if tokio::time::timeout(limit, self.tasks.wait_idle()).await.is_err() {
            warn!(
                "{} evaluations did not finish before shutdown",
                self.tasks.in_flight()
            );
        }
    }
}

/// Handle for controlling the MonitorActor
///
/// Can be cloned and shared across tasks.
#[derive(Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,
}

impl MonitorHandle {
    /// Spawn a new monitor actor
    ///
    /// The first cycle starts right away.
    pub fn spawn(
        config: Arc<Config>,
        probe: Arc<dyn ConnectivityProbe>,
        evaluator: TargetEvaluator,
        dispatcher: AlertDispatcher,
        event_tx: broadcast::Sender<DecisionEvent>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = MonitorActor::new(config, probe, evaluator, dispatcher, cmd_rx, event_tx);

        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Run a cycle immediately
    ///
    /// Resolves once all evaluation tasks are launched (and paced), not when
    /// they are finished.
    pub async fn cycle_now(&self) -> Result<CycleOutcome> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::CycleNow { respond_to: tx })
            .await
            .context("failed to send CycleNow command")?;

        rx.await.context("failed to receive response")
    }

    pub async fn in_flight(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::InFlight { respond_to: tx })
            .await
            .context("failed to send InFlight command")?;

        rx.await.context("failed to receive response")
    }

    /// Gracefully shut down the monitor
    ///
    /// Waits until running evaluations and their dispatch finished, at most for
    /// the evaluation timeout plus the shutdown grace period.
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::Shutdown { respond_to: tx })
            .await
            .context("failed to send Shutdown command")?;

        rx.await.context("failed to receive response")
    }
}
