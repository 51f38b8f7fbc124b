use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::trace;

const DEFAULT_APP_NAME: &str = "Spring Boot App Monitor";

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Name used in mail subjects
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Base URLs of the monitored applications
    pub targets: Vec<String>,

    /// Seconds between two monitoring cycles
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// URL requested before each cycle to check that we are online at all
    #[serde(default = "default_connectivity_url")]
    pub connectivity_url: String,

    #[serde(default = "default_connectivity_timeout")]
    pub connectivity_timeout: u64,

    /// Upper bound (seconds) for one target's health + metrics fetch
    #[serde(default = "default_evaluation_timeout")]
    pub evaluation_timeout: u64,

    /// Extra seconds granted on shutdown, on top of `evaluation_timeout`, for
    /// running evaluations to deliver their notifications
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: u64,

    /// Seconds to wait after launching a cycle with more than one target,
    /// so desktop notifications can be read before the next burst
    #[serde(default = "default_pacing_delay")]
    pub pacing_delay: u64,

    /// Notify on the desktop when the connectivity check fails
    #[serde(default)]
    pub alert_on_connectivity_loss: bool,

    /// Skip a cycle while this many evaluations are still running
    #[serde(default)]
    pub max_in_flight: Option<usize>,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub desktop: DesktopConfig,

    #[serde(default)]
    pub email: EmailConfig,
}

/// Warning thresholds in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_cpu_threshold")]
    pub cpu: u32,
    #[serde(default = "default_jvm_threshold")]
    pub jvm: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu: default_cpu_threshold(),
            jvm: default_jvm_threshold(),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct DesktopConfig {
    #[serde(default)]
    pub enabled: bool,
    pub icon: Option<PathBuf>,
    pub sound: Option<PathBuf>,
    #[serde(default = "default_player")]
    pub player: String,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Sender address, defaults to the SMTP user
    pub from: Option<String>,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Accept self-signed or otherwise invalid server certificates.
    ///
    /// Only meant for internal relays. Weakens transport security.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn connectivity_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity_timeout)
    }

    pub fn evaluation_timeout(&self) -> Duration {
        Duration::from_secs(self.evaluation_timeout)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_secs(self.pacing_delay)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval == 0 {
            bail!("interval must be greater than 0");
        }

        if self.evaluation_timeout == 0 {
            bail!("evaluation_timeout must be greater than 0");
        }

        for target in &self.targets {
            url::Url::parse(target).with_context(|| format!("invalid target url: {target}"))?;
        }

        url::Url::parse(&self.connectivity_url).with_context(|| {
            format!("invalid connectivity url: {}", self.connectivity_url)
        })?;

        if self.thresholds.cpu == 0 || self.thresholds.jvm == 0 {
            bail!("thresholds must be greater than 0");
        }

        if self.max_in_flight == Some(0) {
            bail!("max_in_flight must be greater than 0 if set");
        }

        if self.email.enabled {
            if self.email.recipients.is_empty() {
                bail!("email alerts are enabled but no recipients are configured");
            }
            if self.email.smtp.is_none() {
                bail!("email alerts are enabled but no smtp section is configured");
            }
        }

        Ok(())
    }
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

fn default_interval() -> u64 {
    300
}

fn default_connectivity_url() -> String {
    String::from("https://www.google.com")
}

fn default_connectivity_timeout() -> u64 {
    10
}

fn default_evaluation_timeout() -> u64 {
    60
}

fn default_pacing_delay() -> u64 {
    6
}

fn default_shutdown_grace() -> u64 {
    30
}

fn default_cpu_threshold() -> u32 {
    80
}

fn default_jvm_threshold() -> u32 {
    75
}

fn default_player() -> String {
    String::from("gst-play-1.0")
}

fn default_smtp_port() -> u16 {
    587
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let config: Config = serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided! ({e})"))?;
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}
