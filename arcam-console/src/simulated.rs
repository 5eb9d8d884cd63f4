//! Simulated amplifier connection
//!
//! Serves a [`VirtualAvr`] over an in-memory duplex stream so the console can
//! run without hardware.

use arcam_control::{ControlError, Connector};
use arcam_sim::{run_virtual_avr_task, VirtualAvr, VirtualAvrCommand};
use parking_lot::Mutex;
use tokio::io::DuplexStream;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

/// Connector that spawns a fresh virtual receiver per connection
#[derive(Default)]
pub struct SimulatedConnector {
    /// Keeps the current receiver's task alive
    panel: Mutex<Option<mpsc::Sender<VirtualAvrCommand>>>,
}

impl SimulatedConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Connector for SimulatedConnector {
    type Io = DuplexStream;

    async fn connect(&self) -> Result<DuplexStream, ControlError> {
        let (host, device) = tokio::io::duplex(1024);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (state_tx, mut state_rx) = broadcast::channel(16);

        tokio::spawn(async move {
            let avr = VirtualAvr::new("Simulated AVR");
            if let Err(e) = run_virtual_avr_task(device, avr, cmd_rx, state_tx).await {
                warn!("Simulated AVR stopped: {e}");
            }
        });
        tokio::spawn(async move {
            while let Ok(event) = state_rx.recv().await {
                debug!("Simulated AVR state: {:?}", event.zones);
            }
        });

        // Replacing the sender ends any previous receiver task
        *self.panel.lock() = Some(cmd_tx);
        Ok(host)
    }

    fn describe(&self) -> String {
        "simulated AVR".to_string()
    }
}
