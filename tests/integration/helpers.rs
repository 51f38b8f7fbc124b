//! Helper functions and fake capabilities for integration tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actuator_watchdog::{
    HealthStatus, Metrics,
    actors::{messages::DecisionEvent, scheduler::MonitorHandle},
    alerts::AlertDispatcher,
    config::Config,
    desktop::{DesktopNotifier, NotifyError, Urgency},
    mail::{MailError, Mailer},
    monitors::{
        actuator::{ActuatorSource, HealthError, MetricsError},
        connectivity::ConnectivityProbe,
        evaluation::TargetEvaluator,
    },
};
use async_trait::async_trait;
use tokio::sync::broadcast;

pub const HEALTHY_METRICS: Metrics = Metrics {
    cpu_usage: 0.1,
    cpu_count: 2.0,
    memory_used: 1.0,
    memory_total: 4.0,
};

#[derive(Clone)]
struct Response {
    health: Result<HealthStatus, HealthError>,
    metrics: Result<Metrics, MetricsError>,
}

/// Actuator source answering from a per-target table and recording every call
pub struct FakeSource {
    default: Response,
    targets: HashMap<String, Response>,
    delay: Option<Duration>,
    pub health_calls: Mutex<Vec<String>>,
    pub metrics_calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new(
        health: Result<HealthStatus, HealthError>,
        metrics: Result<Metrics, MetricsError>,
    ) -> Self {
        Self {
            default: Response { health, metrics },
            targets: HashMap::new(),
            delay: None,
            health_calls: Mutex::new(Vec::new()),
            metrics_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn healthy() -> Self {
        Self::new(Ok(HealthStatus::Up), Ok(HEALTHY_METRICS))
    }

    pub fn with_target(
        mut self,
        target: &str,
        health: Result<HealthStatus, HealthError>,
        metrics: Result<Metrics, MetricsError>,
    ) -> Self {
        self.targets
            .insert(target.to_string(), Response { health, metrics });
        self
    }

    /// Every health call sleeps for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn response(&self, target: &str) -> Response {
        self.targets
            .get(target)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    pub fn metrics_calls_for(&self, target: &str) -> usize {
        self.metrics_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|t| *t == target)
            .count()
    }
}

#[async_trait]
impl ActuatorSource for FakeSource {
    async fn health(&self, target: &str) -> Result<HealthStatus, HealthError> {
        self.health_calls.lock().unwrap().push(target.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response(target).health
    }

    async fn metrics(&self, target: &str) -> Result<Metrics, MetricsError> {
        self.metrics_calls.lock().unwrap().push(target.to_string());
        self.response(target).metrics
    }
}

pub struct FakeProbe {
    online: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeProbe {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for FakeProbe {
    async fn has_connectivity(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.online.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct RecordingDesktop {
    pub notifications: Mutex<Vec<(Urgency, String)>>,
    pub sounds: AtomicUsize,
}

#[async_trait]
impl DesktopNotifier for RecordingDesktop {
    async fn notify(&self, urgency: Urgency, title: &str, _body: &str) -> Result<(), NotifyError> {
        self.notifications
            .lock()
            .unwrap()
            .push((urgency, title.to_string()));
        Ok(())
    }

    async fn play_sound(&self) -> Result<(), NotifyError> {
        self.sounds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    delay: Option<Duration>,
    pub mails: Mutex<Vec<(Vec<String>, String, String)>>,
}

impl RecordingMailer {
    /// Every send takes `delay` before the mail counts as delivered
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_mail(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.mails.lock().unwrap().push((
            recipients.to_vec(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}

/// Config with both channels enabled, no pacing and an interval long enough
/// that only the initial tick fires during a test
pub fn create_test_config(targets: &[&str]) -> Config {
    serde_json::from_value(serde_json::json!({
        "targets": targets,
        "interval": 3600,
        "connectivity_url": "http://connectivity.test",
        "pacing_delay": 0,
        "evaluation_timeout": 5,
        "thresholds": { "cpu": 80, "jvm": 75 },
        "desktop": { "enabled": true },
        "email": {
            "enabled": true,
            "recipients": ["ops@example.com"],
            "smtp": { "host": "smtp.example.com" }
        }
    }))
    .unwrap()
}

pub struct TestMonitor {
    pub handle: MonitorHandle,
    pub events: broadcast::Receiver<DecisionEvent>,
    pub source: Arc<FakeSource>,
    pub probe: Arc<FakeProbe>,
    pub desktop: Arc<RecordingDesktop>,
    pub mailer: Arc<RecordingMailer>,
}

pub fn spawn_monitor(config: Config, source: FakeSource, probe: FakeProbe) -> TestMonitor {
    spawn_monitor_with_mailer(config, source, probe, RecordingMailer::default())
}

pub fn spawn_monitor_with_mailer(
    config: Config,
    source: FakeSource,
    probe: FakeProbe,
    mailer: RecordingMailer,
) -> TestMonitor {
    let config = Arc::new(config);
    let source = Arc::new(source);
    let probe = Arc::new(probe);
    let desktop = Arc::new(RecordingDesktop::default());
    let mailer = Arc::new(mailer);

    let evaluator = TargetEvaluator::new(
        source.clone(),
        config.thresholds,
        config.evaluation_timeout(),
    );
    let dispatcher = AlertDispatcher::from_config(
        &config,
        desktop.clone(),
        Some(mailer.clone() as Arc<dyn Mailer>),
    );

    let (event_tx, events) = broadcast::channel(256);
    let handle = MonitorHandle::spawn(config, probe.clone(), evaluator, dispatcher, event_tx);

    TestMonitor {
        handle,
        events,
        source,
        probe,
        desktop,
        mailer,
    }
}

/// Receives `count` events or panics after `timeout`
pub async fn collect_events(
    events: &mut broadcast::Receiver<DecisionEvent>,
    count: usize,
    timeout: Duration,
) -> Vec<DecisionEvent> {
    let mut collected = Vec::with_capacity(count);
    while collected.len() < count {
        let event = tokio::time::timeout(timeout, events.recv())
            .await
            .expect("timed out waiting for decision event")
            .expect("event channel closed");
        collected.push(event);
    }
    collected
}

/// Asserts that no further event arrives within `wait`
pub async fn assert_no_event(events: &mut broadcast::Receiver<DecisionEvent>, wait: Duration) {
    let result = tokio::time::timeout(wait, events.recv()).await;
    assert!(result.is_err(), "unexpected event: {result:?}");
}
