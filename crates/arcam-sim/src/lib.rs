//! Arcam AVR Simulation Library
//!
//! This crate provides a virtual Arcam receiver for exercising the control
//! channel without physical hardware. It includes:
//!
//! - **VirtualAvr**: Answers `PC_` commands with protocol-accurate `AV_`
//!   replies, tracking power, volume, mute and source per zone
//! - **run_virtual_avr_task**: Serves a `VirtualAvr` over any async stream,
//!   typically one end of `tokio::io::duplex`
//!
//! # Example
//!
//! ```rust
//! use arcam_protocol::Zone;
//! use arcam_sim::VirtualAvr;
//!
//! let mut avr = VirtualAvr::new("AVR300");
//!
//! // Zones start in standby and decline everything except power commands
//! assert_eq!(avr.process_command(b"PC_/19").unwrap(), b"AV_/R\r");
//!
//! avr.set_power(Zone::One, true);
//! assert_eq!(avr.process_command(b"PC_*19").unwrap(), b"AV_*P11\r");
//! ```

pub mod amplifier;
pub mod amplifier_task;

pub use amplifier::{SimZone, VirtualAvr};
pub use amplifier_task::{run_virtual_avr_task, VirtualAvrCommand, VirtualAvrStateEvent};
