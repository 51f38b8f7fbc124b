//! Desktop notifications via `notify-send`, alert sounds via a command line player.

use std::ffi::OsString;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{instrument, trace};

use crate::config::DesktopConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Critical,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::Critical => "critical",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {output}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        output: String,
    },

    #[error("no alert sound configured")]
    NoSound,
}

#[async_trait]
pub trait DesktopNotifier: Send + Sync {
    async fn notify(&self, urgency: Urgency, title: &str, body: &str) -> Result<(), NotifyError>;

    async fn play_sound(&self) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub struct NotifySendNotifier {
    icon: Option<PathBuf>,
    sound: Option<PathBuf>,
    player: String,
}

impl NotifySendNotifier {
    pub fn new(config: &DesktopConfig) -> Self {
        Self {
            icon: config.icon.clone(),
            sound: config.sound.clone(),
            player: config.player.clone(),
        }
    }

    fn notify_args(&self, urgency: Urgency, title: &str, body: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-u".into(), urgency.as_str().into()];
        if let Some(icon) = &self.icon {
            args.push("-i".into());
            args.push(icon.clone().into_os_string());
        }
        args.push(title.into());
        args.push(body.into());
        args
    }
}

/// Runs a program and treats a non-zero exit status as error, including its output.
async fn run(program: &str, args: &[OsString]) -> Result<(), NotifyError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|source| NotifyError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if output.status.success() {
        return Ok(());
    }

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    Err(NotifyError::Failed {
        program: program.to_string(),
        status: output.status,
        output: combined.trim().to_string(),
    })
}

#[async_trait]
impl DesktopNotifier for NotifySendNotifier {
    #[instrument(skip(self, body))]
    async fn notify(&self, urgency: Urgency, title: &str, body: &str) -> Result<(), NotifyError> {
        trace!("sending {} desktop notification", urgency.as_str());
        run("notify-send", &self.notify_args(urgency, title, body)).await
    }

    #[instrument(skip(self))]
    async fn play_sound(&self) -> Result<(), NotifyError> {
        let Some(sound) = &self.sound else {
            return Err(NotifyError::NoSound);
        };
        run(&self.player, &[sound.clone().into_os_string()]).await
    }
}
