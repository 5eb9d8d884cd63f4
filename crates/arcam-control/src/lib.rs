//! Arcam AVR Control Channel
//!
//! This crate keeps a live model of an Arcam AV receiver over its RS-232 link
//! and exposes a command API for both zones.
//!
//! # Architecture
//!
//! Four roles share one [`SharedState`] and one write queue:
//!
//! - **Callers** go through [`AmpClient`]: arguments are validated, encoded
//!   and queued. Calls never wait on the serial line.
//! - **Writer** is the only task that writes to the line. It drains the queue
//!   in enqueue order.
//! - **Reader** frames incoming bytes, decodes status replies and applies them
//!   to the state. It is the only task that mutates the state.
//! - **Poller** queues status queries on a fixed cadence so the state tracks
//!   changes made from the front panel or remote.
//!
//! Everything that happens on the link is also published as a
//! [`ControllerEvent`] on a broadcast channel.
//!
//! # Example
//!
//! ```rust,no_run
//! use arcam_control::{Controller, ControllerConfig};
//! use arcam_protocol::Zone;
//!
//! # async fn run() -> Result<(), arcam_control::ControlError> {
//! let config = ControllerConfig {
//!     port: "/dev/ttyUSB0".into(),
//!     ..Default::default()
//! };
//! let controller = Controller::open(config).await?;
//!
//! controller.client().power_on(1)?;
//! controller.client().volume_set(30, 1)?;
//!
//! let zone1 = *controller.snapshot().zone(Zone::One);
//! println!("zone 1: volume {} source {}", zone1.volume, zone1.source_display());
//!
//! controller.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connector;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod events;
pub mod link;
pub mod poller;
pub mod queue;
pub mod state;

pub use client::AmpClient;
pub use config::{ControllerConfig, ReconnectConfig};
pub use connector::{Connector, SerialConnector};
pub use controller::Controller;
pub use decoder::{DecodeOutcome, StatusDecoder};
pub use error::ControlError;
pub use events::{ControllerEvent, LinkState};
pub use link::{run_reader, run_writer};
pub use poller::{poll_once, run_status_poller};
pub use queue::{write_queue, QueueReceiver, WriteQueue};
pub use state::{AmpState, SharedState, ZoneState};
