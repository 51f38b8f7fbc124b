use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::desktop::{DesktopNotifier, Urgency};
use crate::mail::Mailer;
use crate::monitors::evaluation::{AlertDecision, Severity};

/// Result of a single channel during dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// Channel disabled or not applicable to the decision
    Skipped,
    Delivered,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub desktop: ChannelOutcome,
    pub mail: ChannelOutcome,
}

/// Routes decisions to the desktop and mail channels.
///
/// Channel failures are logged and reported, never retried.
#[derive(Clone)]
pub struct AlertDispatcher {
    app_name: String,
    desktop: Option<Arc<dyn DesktopNotifier>>,
    mailer: Option<Arc<dyn Mailer>>,
    recipients: Vec<String>,
}

impl AlertDispatcher {
    /// Channels passed as `None` are disabled.
    pub fn new(
        app_name: impl Into<String>,
        desktop: Option<Arc<dyn DesktopNotifier>>,
        mailer: Option<Arc<dyn Mailer>>,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            desktop,
            mailer,
            recipients,
        }
    }

    /// Wires the channels enabled in the config.
    pub fn from_config(
        config: &Config,
        desktop: Arc<dyn DesktopNotifier>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        Self::new(
            config.app_name.clone(),
            config.desktop.enabled.then_some(desktop),
            mailer.filter(|_| config.email.enabled),
            config.email.recipients.clone(),
        )
    }

    pub fn mail_subject(&self, target: &str) -> String {
        format!("{} - {target}", self.app_name)
    }

    #[instrument(skip(self, decision), fields(target = %decision.target))]
    pub async fn dispatch(&self, decision: &AlertDecision) -> DispatchReport {
        if decision.severity == Severity::Silent {
            debug!("silent decision: {}", decision.message);
            return DispatchReport {
                desktop: ChannelOutcome::Skipped,
                mail: ChannelOutcome::Skipped,
            };
        }

        let desktop = self.notify_desktop(decision).await;
        let mail = self.send_mail(decision).await;

        DispatchReport { desktop, mail }
    }

    async fn notify_desktop(&self, decision: &AlertDecision) -> ChannelOutcome {
        let Some(desktop) = &self.desktop else {
            return ChannelOutcome::Skipped;
        };

        let urgency = if decision.severity.is_alert() {
            Urgency::Critical
        } else {
            Urgency::Normal
        };

        if let Err(e) = desktop
            .notify(urgency, &decision.target, &decision.message)
            .await
        {
            error!("failed to send desktop notification: {e}");
            return ChannelOutcome::Failed;
        }

        if urgency == Urgency::Critical {
            if let Err(e) = desktop.play_sound().await {
                // the notification itself went out
                warn!("error playing alert sound: {e}");
            }
        }

        ChannelOutcome::Delivered
    }

    async fn send_mail(&self, decision: &AlertDecision) -> ChannelOutcome {
        let Some(mailer) = &self.mailer else {
            return ChannelOutcome::Skipped;
        };

        if !decision.severity.send_mail() {
            return ChannelOutcome::Skipped;
        }

        let subject = self.mail_subject(&decision.target);
        match mailer
            .send_mail(&self.recipients, &subject, &decision.message)
            .await
        {
            Ok(()) => {
                info!("sent alert mail for {}", decision.target);
                ChannelOutcome::Delivered
            }
            Err(e) => {
                error!("failed to send email: {e}");
                ChannelOutcome::Failed
            }
        }
    }
}
