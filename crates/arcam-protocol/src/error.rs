//! Error types for Arcam protocol parsing and encoding

use thiserror::Error;

use crate::status::Family;

/// Reasons a framed status message is discarded
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer than 4 bytes, so no family prefix
    #[error("message too short: {0} bytes")]
    TooShort(usize),

    /// Prefix does not belong to any known family
    #[error("unhandled message family: {0}")]
    UnknownFamily(String),

    /// Message was checked against a family it does not belong to
    #[error("expected {expected} prefix")]
    PrefixMismatch { expected: Family },

    /// Status byte was neither `P` nor `R`
    #[error("invalid status byte: 0x{0:02X}")]
    InvalidStatus(u8),

    /// Passed message with the wrong total length
    #[error("wrong length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Zone byte other than `1` or `2`
    #[error("invalid zone byte: 0x{0:02X}")]
    InvalidZone(u8),

    /// Value byte outside the range of the family
    #[error("invalid {family} value byte: 0x{value:02X}")]
    InvalidValue { family: Family, value: u8 },

    /// Outbound command frame that does not follow the `PC_` layout
    #[error("invalid command frame: {0}")]
    InvalidCommand(String),
}

/// Caller arguments rejected before a command is encoded
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Zone must be 1 or 2
    #[error("zone must be 1 or 2, got {0}")]
    InvalidZone(i32),

    /// Mode must be 0, 1 or 9
    #[error("mode must be 0, 1 or 9, got {0}")]
    InvalidMode(i32),

    /// Volume must be between 0 and 100
    #[error("volume must be between 0 and 100, got {0}")]
    VolumeOutOfRange(i32),

    /// Source selection must be 0 thru 9
    #[error("source selection must be 0 thru 9, got {0}")]
    SourceOutOfRange(i32),
}
