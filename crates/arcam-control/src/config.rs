//! Controller configuration

use std::time::Duration;

use arcam_protocol::DEFAULT_BAUD_RATE;
use serde::{Deserialize, Serialize};

/// Link and polling settings for a controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Serial device path
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Status poll cadence in milliseconds
    pub poll_interval_ms: u64,
    /// Size of each serial read
    pub read_buffer_size: usize,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
    /// Reconnect behavior after a transport fault
    pub reconnect: ReconnectConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            poll_interval_ms: 500,
            read_buffer_size: 128,
            event_capacity: 256,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Poll cadence as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Exponential backoff between reconnect attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Attempts before the controller gives up and closes; 0 disables reconnect
    pub max_attempts: u32,
    /// Delay before the first attempt
    pub initial_backoff_ms: u64,
    /// Upper bound on the delay
    pub max_backoff_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 250,
            max_backoff_ms: 5000,
        }
    }
}

impl ReconnectConfig {
    /// Delay before the given attempt (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}
