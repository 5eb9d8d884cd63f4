//! Controller lifecycle
//!
//! A [`Controller`] owns one amplifier link. Opening it acquires the transport
//! (failing construction if that is impossible) and spawns the status poller
//! plus a link supervisor. The supervisor runs one reader and one writer task
//! per session and drives the reconnect state machine:
//!
//! ```text
//! Opening ──► Running ──fault──► Reconnecting{1..n} ──ok──► Running
//!                │                      │
//!                └──shutdown──► Closed ◄┘ (attempts exhausted)
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::client::AmpClient;
use crate::config::{ControllerConfig, ReconnectConfig};
use crate::connector::{Connector, SerialConnector};
use crate::decoder::StatusDecoder;
use crate::error::ControlError;
use crate::events::{ControllerEvent, LinkState};
use crate::link::{run_reader, run_writer};
use crate::poller::run_status_poller;
use crate::queue::{write_queue, QueueReceiver};
use crate::state::{AmpState, SharedState};

/// How long a session waits for an in-flight write before cutting it off
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Handle to a running amplifier link
///
/// Dropping the controller signals its tasks to stop; use
/// [`Controller::shutdown`] to also wait for them.
pub struct Controller {
    client: AmpClient,
    link: watch::Receiver<LinkState>,
    shutdown_tx: watch::Sender<bool>,
    supervisor: Option<JoinHandle<()>>,
    poller: Option<JoinHandle<()>>,
}

impl Controller {
    /// Open the serial port named in `config` and start the link
    pub async fn open(config: ControllerConfig) -> Result<Self, ControlError> {
        let connector = SerialConnector::new(config.port.clone(), config.baud_rate);
        Self::connect(connector, config).await
    }

    /// Start a link over any transport
    pub async fn connect<C: Connector>(
        connector: C,
        config: ControllerConfig,
    ) -> Result<Self, ControlError> {
        let (link_tx, link_rx) = watch::channel(LinkState::Opening);

        info!("Opening amplifier link on {}", connector.describe());
        let io = match connector.connect().await {
            Ok(io) => io,
            Err(e) => {
                error!("Failed to open {}: {e}", connector.describe());
                return Err(e);
            }
        };

        let state = SharedState::new();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (queue, queue_rx) = write_queue(state.clone());
        let client = AmpClient::new(queue, state.clone(), events.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let supervisor = Supervisor {
            connector,
            reconnect: config.reconnect.clone(),
            read_buffer_size: config.read_buffer_size,
            state,
            queue: Arc::new(Mutex::new(queue_rx)),
            events,
            link_tx,
            shutdown: shutdown_rx.clone(),
        };
        let supervisor = tokio::spawn(supervisor.run(io));

        let poller = tokio::spawn(run_status_poller(
            client.clone(),
            link_rx.clone(),
            config.poll_interval(),
            shutdown_rx,
        ));

        Ok(Self {
            client,
            link: link_rx,
            shutdown_tx,
            supervisor: Some(supervisor),
            poller: Some(poller),
        })
    }

    /// Command handle, cloneable into other tasks
    pub fn client(&self) -> &AmpClient {
        &self.client
    }

    /// Copy of the current amplifier state
    pub fn snapshot(&self) -> AmpState {
        self.client.snapshot()
    }

    /// Subscribe to controller events
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.client.subscribe()
    }

    /// Current link state
    pub fn link_state(&self) -> LinkState {
        *self.link.borrow()
    }

    /// Watch link state transitions
    pub fn link_watch(&self) -> watch::Receiver<LinkState> {
        self.link.clone()
    }

    /// Wait until the link has closed for good
    pub async fn closed(&self) {
        let mut link = self.link.clone();
        let _ = link.wait_for(|s| *s == LinkState::Closed).await;
    }

    /// Stop all tasks and wait for them to finish
    pub async fn shutdown(mut self) {
        info!("Controller shutting down");
        self.shutdown_tx.send_replace(true);

        if let Some(handle) = self.supervisor.take() {
            if let Err(e) = handle.await {
                warn!("Link supervisor ended abnormally: {e}");
            }
        }
        if let Some(handle) = self.poller.take() {
            if let Err(e) = handle.await {
                warn!("Status poller ended abnormally: {e}");
            }
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}

/// Owns the transport and the reconnect state machine
struct Supervisor<C: Connector> {
    connector: C,
    reconnect: ReconnectConfig,
    read_buffer_size: usize,
    state: SharedState,
    queue: Arc<Mutex<QueueReceiver>>,
    events: broadcast::Sender<ControllerEvent>,
    link_tx: watch::Sender<LinkState>,
    shutdown: watch::Receiver<bool>,
}

impl<C: Connector> Supervisor<C> {
    async fn run(mut self, mut io: C::Io) {
        loop {
            let Some(fault) = self.run_session(io).await else {
                break;
            };

            error!("Amplifier link fault: {fault}");
            self.emit(ControllerEvent::Error {
                source: "Link".to_string(),
                message: fault.to_string(),
            });

            match self.reopen().await {
                Some(next) => io = next,
                None => break,
            }
        }

        self.set_state(LinkState::Closed);
        info!("Amplifier link closed");
    }

    /// Run reader and writer until one of them faults or shutdown is requested
    ///
    /// Returns `None` on shutdown.
    async fn run_session(&mut self, io: C::Io) -> Option<ControlError> {
        let (read_half, write_half) = tokio::io::split(io);

        let mut reader = tokio::spawn(run_reader(
            read_half,
            StatusDecoder::new(self.state.clone()),
            self.read_buffer_size,
            self.events.clone(),
        ));
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut writer = tokio::spawn(run_writer(
            write_half,
            Arc::clone(&self.queue),
            self.events.clone(),
            stop_rx,
        ));
        self.set_state(LinkState::Running);

        let (fault, writer_done) = tokio::select! {
            _ = self.shutdown.wait_for(|stop| *stop) => (None, false),
            result = &mut reader => {
                (Some(result.unwrap_or_else(|e| ControlError::Io(e.into()))), false)
            }
            result = &mut writer => {
                let fault = match result {
                    Ok(Err(e)) => e,
                    Ok(Ok(())) => ControlError::LinkClosed,
                    Err(e) => ControlError::Io(e.into()),
                };
                (Some(fault), true)
            }
        };

        reader.abort();
        if !writer_done {
            // The writer stops between commands; only a stuck write is cut off
            stop_tx.send_replace(true);
            if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
                .await
                .is_err()
            {
                warn!("Amplifier writer did not stop in time");
                writer.abort();
            }
        }
        fault
    }

    /// Try to reacquire the transport with exponential backoff
    async fn reopen(&mut self) -> Option<C::Io> {
        let max_attempts = self.reconnect.max_attempts;

        for attempt in 1..=max_attempts {
            self.set_state(LinkState::Reconnecting { attempt });
            let delay = self.reconnect.backoff(attempt);
            info!(
                "Reconnecting to {} in {} ms (attempt {attempt}/{max_attempts})",
                self.connector.describe(),
                delay.as_millis()
            );

            tokio::select! {
                _ = self.shutdown.wait_for(|stop| *stop) => return None,
                _ = tokio::time::sleep(delay) => {}
            }

            match self.connector.connect().await {
                Ok(io) => {
                    info!("Amplifier link reopened");
                    return Some(io);
                }
                Err(e) => {
                    warn!("Reconnect attempt {attempt} failed: {e}");
                    self.emit(ControllerEvent::Error {
                        source: "Connector".to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if max_attempts > 0 {
            error!("Giving up on amplifier link after {max_attempts} attempts");
        }
        None
    }

    fn set_state(&self, state: LinkState) {
        let previous = self.link_tx.send_replace(state);
        if previous != state {
            info!("Link state: {} -> {}", previous.name(), state.name());
            self.emit(ControllerEvent::LinkStateChanged { state });
        }
    }

    fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }
}
