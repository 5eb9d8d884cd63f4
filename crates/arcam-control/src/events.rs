//! Unified event stream for the controller
//!
//! Traffic, decoded status, link transitions and errors are all emitted
//! through one broadcast channel. Observers that only need the current state
//! can ignore it and read snapshots instead.

use arcam_protocol::{CommandError, Family, ParseError, Zone, ZoneReport};
use serde::{Deserialize, Serialize};

/// Lifecycle of the amplifier link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    /// Acquiring the serial handle
    Opening,
    /// Reader, writer and poller active
    Running,
    /// Link faulted; waiting to reopen
    Reconnecting {
        /// Attempt number (1-based)
        attempt: u32,
    },
    /// Shut down or out of reconnect attempts
    Closed,
}

impl LinkState {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Opening => "Opening",
            Self::Running => "Running",
            Self::Reconnecting { .. } => "Reconnecting",
            Self::Closed => "Closed",
        }
    }
}

/// Event enum for all controller activity
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    // -------------------------------------------------------------------------
    // Traffic events
    // -------------------------------------------------------------------------
    /// Bytes written to the amplifier
    DataOut {
        /// Raw data bytes
        data: Vec<u8>,
    },

    /// Bytes read from the amplifier
    DataIn {
        /// Raw data bytes
        data: Vec<u8>,
    },

    // -------------------------------------------------------------------------
    // Status events
    // -------------------------------------------------------------------------
    /// A passed status reply was applied to the state
    StatusApplied {
        /// Zone the reply was about
        zone: Zone,
        /// Decoded value
        report: ZoneReport,
        /// Whether the state actually changed
        changed: bool,
    },

    /// The amplifier declined a request (`R` status)
    StatusRejected {
        /// Family of the declined request
        family: Family,
    },

    /// A frame failed validation and was dropped
    FrameDiscarded {
        /// Raw frame, separator stripped
        frame: Vec<u8>,
        /// Why it was dropped
        reason: ParseError,
    },

    /// A caller command failed argument validation
    CommandRejected {
        /// Name of the operation
        operation: &'static str,
        /// Validation failure
        reason: CommandError,
    },

    // -------------------------------------------------------------------------
    // Link events
    // -------------------------------------------------------------------------
    /// The link moved to a new lifecycle state
    LinkStateChanged {
        /// New state
        state: LinkState,
    },

    /// An error occurred
    Error {
        /// Source of the error (e.g., "Reader", "Writer")
        source: String,
        /// Error message
        message: String,
    },
}
