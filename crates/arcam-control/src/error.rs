//! Error types for the controller

use arcam_protocol::CommandError;
use thiserror::Error;

/// Errors that can occur while controlling the amplifier
#[derive(Debug, Error)]
pub enum ControlError {
    /// Caller arguments were rejected; nothing was queued
    #[error("invalid command: {0}")]
    InvalidCommand(#[from] CommandError),

    /// I/O error on the amplifier link
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port could not be opened
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// The amplifier closed the link (end of stream)
    #[error("amplifier link closed")]
    LinkClosed,

    /// The controller has shut down and no longer accepts commands
    #[error("write queue closed")]
    QueueClosed,
}

impl ControlError {
    /// Whether this error came from the caller rather than the link
    pub fn is_invalid_command(&self) -> bool {
        matches!(self, ControlError::InvalidCommand(_))
    }
}
