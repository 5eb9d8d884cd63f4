//! Arcam AVR Console
//!
//! Opens the amplifier link described by the settings file, then reads line
//! commands from stdin until `quit` or end of input.
//!
//! Usage: `arcamctl [settings.json]`

mod console;
mod settings;
mod simulated;

use std::path::PathBuf;

use anyhow::Context;
use arcam_control::{Controller, ControllerEvent};
use tokio::io::BufReader;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use settings::{ConnectionType, Settings};
use simulated::SimulatedConnector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => Settings::load_from(&path)?,
        None => Settings::load()?,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting arcamctl");

    let config = settings.controller.clone();
    let controller = match settings.connection_type {
        ConnectionType::Serial => Controller::open(config)
            .await
            .with_context(|| format!("failed to open {}", settings.controller.port))?,
        ConnectionType::Simulated => Controller::connect(SimulatedConnector::new(), config)
            .await
            .context("failed to start simulated amplifier")?,
    };

    let monitor = tokio::spawn(log_events(controller.subscribe()));

    println!("{}", console::HELP);
    let stdin = BufReader::new(tokio::io::stdin());
    let link = controller.link_watch();
    let result = console::run(stdin, controller.client(), &link).await;

    controller.shutdown().await;
    monitor.abort();
    info!("arcamctl exiting");
    result
}

/// Log controller activity until the event stream closes
async fn log_events(mut events: broadcast::Receiver<ControllerEvent>) {
    loop {
        match events.recv().await {
            Ok(ControllerEvent::DataOut { data }) => {
                debug!("TX {:?}", String::from_utf8_lossy(&data));
            }
            Ok(ControllerEvent::DataIn { data }) => {
                debug!("RX {:?}", String::from_utf8_lossy(&data));
            }
            Ok(ControllerEvent::StatusApplied {
                zone,
                report,
                changed: true,
            }) => info!("{zone}: {report:?}"),
            Ok(ControllerEvent::LinkStateChanged { state }) => info!("Link {}", state.name()),
            Ok(ControllerEvent::Error { source, message }) => error!("{source}: {message}"),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => warn!("Event log skipped {n} events"),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
