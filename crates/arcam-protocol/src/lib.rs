//! Arcam AVR Protocol Library
//!
//! This crate provides framing, decoding and encoding for the RS-232 control
//! protocol spoken by Arcam AV receivers (AVR300 family):
//!
//! - **Commands** (host → amplifier): `PC_` + command code + zone + value + `\r`
//! - **Status replies** (amplifier → host): `AV_` + command code + status +
//!   zone + value + `\r`
//!
//! # Architecture
//!
//! - [`Framer`] splits a chunked byte stream into `\r`-delimited frames,
//!   carrying partial data across reads
//! - [`parse_status_message`] classifies a frame by its 4-byte family prefix
//!   and validates the status byte and length
//! - [`AmpCommand`] validates caller arguments and encodes outbound bytes
//!
//! The same command code identifies an attribute in both directions:
//! - `PC_*19\r` TO the amplifier = query zone 1 power
//! - `AV_*P11\r` FROM the amplifier = zone 1 is powered on
//!
//! # Example
//!
//! ```rust
//! use arcam_protocol::{parse_status_message, Framer, StatusMessage, ZoneReport};
//!
//! let mut framer = Framer::new();
//! framer.push_bytes(b"AV_*P1");
//! assert!(framer.next_frame().is_none());
//!
//! framer.push_bytes(b"1\r");
//! let frame = framer.next_frame().unwrap();
//!
//! match parse_status_message(&frame) {
//!     Ok(StatusMessage::Report { report, .. }) => assert_eq!(report, ZoneReport::Power(true)),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

pub mod command;
pub mod error;
pub mod framer;
pub mod status;

pub use command::{AmpCommand, AudioSource, Mode, Zone};
pub use error::{CommandError, ParseError};
pub use framer::Framer;
pub use status::{
    check_status_message, parse_status_message, Family, StatusCode, StatusMessage, ZoneReport,
};

/// Record separator used in both directions on the serial line
pub const RECORD_SEPARATOR: u8 = b'\r';

/// Default serial baud rate for Arcam AV receivers
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Trait for messages that can be encoded to bytes
pub trait EncodeCommand {
    /// Encode this message to its wire format, including the separator
    fn encode(&self) -> Vec<u8>;
}
