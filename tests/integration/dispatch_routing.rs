//! Routing of decisions to desktop and mail channels

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use actuator_watchdog::{
    alerts::{AlertDispatcher, ChannelOutcome, DispatchReport},
    desktop::Urgency,
    mail::Mailer,
    monitors::{
        actuator::HealthError,
        evaluation::{AlertDecision, DecisionKind, Severity},
    },
};
use pretty_assertions::assert_eq;

use crate::helpers::*;

fn decision(severity: Severity, kind: DecisionKind) -> AlertDecision {
    AlertDecision {
        target: "http://orders:8080".to_string(),
        message: "[10:15] Health Status: DOWN. Attention required!".to_string(),
        severity,
        kind,
    }
}

fn dispatcher_for(
    config: &actuator_watchdog::config::Config,
) -> (AlertDispatcher, Arc<RecordingDesktop>, Arc<RecordingMailer>) {
    let desktop = Arc::new(RecordingDesktop::default());
    let mailer = Arc::new(RecordingMailer::default());
    let dispatcher = AlertDispatcher::from_config(
        config,
        desktop.clone(),
        Some(mailer.clone() as Arc<dyn Mailer>),
    );
    (dispatcher, desktop, mailer)
}

#[tokio::test]
async fn test_critical_with_desktop_disabled_only_mails() {
    let mut config = create_test_config(&["http://orders:8080"]);
    config.desktop.enabled = false;
    let (dispatcher, desktop, mailer) = dispatcher_for(&config);

    let report = dispatcher
        .dispatch(&decision(Severity::Critical, DecisionKind::HealthError))
        .await;

    assert_eq!(
        report,
        DispatchReport {
            desktop: ChannelOutcome::Skipped,
            mail: ChannelOutcome::Delivered,
        }
    );
    assert!(desktop.notifications.lock().unwrap().is_empty());
    assert_eq!(desktop.sounds.load(Ordering::SeqCst), 0);

    let mails = mailer.mails.lock().unwrap().clone();
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].0, vec!["ops@example.com".to_string()]);
    assert_eq!(mails[0].1, "Spring Boot App Monitor - http://orders:8080");
    assert_eq!(
        mails[0].2,
        "[10:15] Health Status: DOWN. Attention required!"
    );
}

#[tokio::test]
async fn test_critical_uses_every_enabled_channel() {
    let config = create_test_config(&["http://orders:8080"]);
    let (dispatcher, desktop, mailer) = dispatcher_for(&config);

    dispatcher
        .dispatch(&decision(Severity::Critical, DecisionKind::NotResponding))
        .await;

    assert_eq!(
        desktop.notifications.lock().unwrap().clone(),
        vec![(Urgency::Critical, "http://orders:8080".to_string())]
    );
    assert_eq!(desktop.sounds.load(Ordering::SeqCst), 1);
    assert_eq!(mailer.mails.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_informational_is_desktop_only() {
    let config = create_test_config(&["http://orders:8080"]);
    let (dispatcher, desktop, mailer) = dispatcher_for(&config);

    let report = dispatcher
        .dispatch(&decision(
            Severity::Informational,
            DecisionKind::MetricsUnavailable,
        ))
        .await;

    assert_eq!(report.desktop, ChannelOutcome::Delivered);
    assert_eq!(report.mail, ChannelOutcome::Skipped);
    assert_eq!(
        desktop.notifications.lock().unwrap().clone(),
        vec![(Urgency::Normal, "http://orders:8080".to_string())]
    );
    assert_eq!(desktop.sounds.load(Ordering::SeqCst), 0);
    assert!(mailer.mails.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_email_disabled_ignores_mailer() {
    let mut config = create_test_config(&["http://orders:8080"]);
    config.email.enabled = false;
    let (dispatcher, desktop, mailer) = dispatcher_for(&config);

    let report = dispatcher
        .dispatch(&decision(Severity::Critical, DecisionKind::HealthError))
        .await;

    assert_eq!(report.mail, ChannelOutcome::Skipped);
    assert!(mailer.mails.lock().unwrap().is_empty());
    assert_eq!(desktop.notifications.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_silent_reaches_no_channel() {
    let config = create_test_config(&["http://orders:8080"]);
    let (dispatcher, desktop, mailer) = dispatcher_for(&config);

    let report = dispatcher
        .dispatch(&decision(Severity::Silent, DecisionKind::HealthError))
        .await;

    assert_eq!(report.desktop, ChannelOutcome::Skipped);
    assert_eq!(report.mail, ChannelOutcome::Skipped);
    assert!(desktop.notifications.lock().unwrap().is_empty());
    assert!(mailer.mails.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_monitor_with_mail_only_configuration() {
    let mut config = create_test_config(&["http://orders:8080"]);
    config.desktop.enabled = false;
    let source = FakeSource::new(Err(HealthError::NoActuatorSupport), Ok(HEALTHY_METRICS));
    let mut monitor = spawn_monitor(config, source, FakeProbe::new(true));

    let events = collect_events(&mut monitor.events, 1, Duration::from_secs(3)).await;

    assert_eq!(events[0].decision.kind, DecisionKind::NoActuatorSupport);
    assert!(
        events[0]
            .decision
            .message
            .ends_with("No actuator support for: http://orders:8080/actuator")
    );
    assert_eq!(
        events[0].dispatch,
        DispatchReport {
            desktop: ChannelOutcome::Skipped,
            mail: ChannelOutcome::Delivered,
        }
    );
    assert!(monitor.desktop.notifications.lock().unwrap().is_empty());
    assert_eq!(monitor.mailer.mails.lock().unwrap().len(), 1);

    monitor.handle.shutdown().await.unwrap();
}
