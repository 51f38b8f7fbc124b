use std::sync::Arc;

use actuator_watchdog::{
    actors::{messages::DecisionEvent, scheduler::MonitorHandle},
    alerts::AlertDispatcher,
    config::{Config, read_config_file},
    desktop::NotifySendNotifier,
    mail::{Mailer, SmtpMailer},
    monitors::{
        actuator::ActuatorClient, connectivity::HttpConnectivityProbe,
        evaluation::TargetEvaluator,
    },
};
use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{debug, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,

    /// Run a single monitoring cycle and exit
    #[arg(long)]
    once: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_target("actuator_watchdog", level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn build_monitor(
    config: Arc<Config>,
    event_tx: broadcast::Sender<DecisionEvent>,
) -> anyhow::Result<MonitorHandle> {
    let probe = HttpConnectivityProbe::new(
        config.connectivity_url.clone(),
        config.connectivity_timeout(),
    )
    .context("failed to build connectivity probe")?;

    let source = ActuatorClient::new(config.evaluation_timeout())
        .context("failed to build actuator client")?;
    let evaluator = TargetEvaluator::new(
        Arc::new(source),
        config.thresholds,
        config.evaluation_timeout(),
    );

    let mailer: Option<Arc<dyn Mailer>> = if config.email.enabled {
        Some(Arc::new(SmtpMailer::from_config(&config.email)?))
    } else {
        None
    };
    let dispatcher = AlertDispatcher::from_config(
        &config,
        Arc::new(NotifySendNotifier::new(&config.desktop)),
        mailer,
    );

    Ok(MonitorHandle::spawn(
        config,
        Arc::new(probe),
        evaluator,
        dispatcher,
        event_tx,
    ))
}

/// Logs the outcome of every finished evaluation.
async fn log_events(mut event_rx: broadcast::Receiver<DecisionEvent>) {
    loop {
        match event_rx.recv().await {
            Ok(event) => debug!(
                "{}: {:?} -> desktop {:?}, mail {:?}",
                event.target, event.decision.kind, event.dispatch.desktop, event.dispatch.mail
            ),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("event logger lagged, skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = Arc::new(read_config_file(&args.file)?);

    let (event_tx, event_rx) = broadcast::channel(256);
    tokio::spawn(log_events(event_rx));

    let monitor = build_monitor(config, event_tx)?;

    if args.once {
        // the initial cycle runs before any command, shutdown waits for its alerts
        monitor.shutdown().await?;
        return Ok(());
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");
    monitor.shutdown().await?;

    Ok(())
}
