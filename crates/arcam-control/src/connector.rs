//! Transport acquisition
//!
//! The controller never opens a port itself; it asks a [`Connector`] for a
//! fresh byte stream on startup and after every fault. The serial connector is
//! used for hardware, while tests and the console's simulated mode hand out
//! in-memory duplex streams wired to a virtual amplifier.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::debug;

use crate::error::ControlError;

/// Source of amplifier byte streams
pub trait Connector: Send + Sync + 'static {
    /// Stream type produced by this connector
    type Io: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Open a new stream to the amplifier
    fn connect(&self) -> impl Future<Output = Result<Self::Io, ControlError>> + Send;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Opens a physical serial port
#[derive(Debug, Clone)]
pub struct SerialConnector {
    port: String,
    baud_rate: u32,
}

impl SerialConnector {
    /// Connector for `port` at `baud_rate`
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
        }
    }
}

impl Connector for SerialConnector {
    type Io = SerialStream;

    async fn connect(&self) -> Result<SerialStream, ControlError> {
        debug!("Opening serial port {} @ {}", self.port, self.baud_rate);
        let stream = tokio_serial::new(&self.port, self.baud_rate)
            .timeout(Duration::from_millis(100))
            .open_native_async()?;
        Ok(stream)
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.port, self.baud_rate)
    }
}
