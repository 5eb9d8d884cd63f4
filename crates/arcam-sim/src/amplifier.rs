//! Virtual Arcam receiver
//!
//! Answers `PC_` command frames the way the hardware does: power commands are
//! always answered, everything else is declined with `R` while the addressed
//! zone is in standby.

use arcam_protocol::{
    AmpCommand, AudioSource, EncodeCommand, Mode, StatusMessage, Zone, ZoneReport,
};
use tracing::{debug, warn};

/// Front-panel state of one simulated zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimZone {
    pub powered_on: bool,
    pub volume: u8,
    pub muted: bool,
    pub source: AudioSource,
}

impl Default for SimZone {
    fn default() -> Self {
        Self {
            powered_on: false,
            volume: 30,
            muted: false,
            source: AudioSource::Dvd,
        }
    }
}

/// Virtual receiver for testing
pub struct VirtualAvr {
    /// Identifier for logging
    id: String,
    zones: [SimZone; 2],
    /// Frames received (for test verification)
    received_commands: Vec<Vec<u8>>,
}

impl VirtualAvr {
    /// Create a receiver with both zones in standby
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            zones: [SimZone::default(); 2],
            received_commands: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn zone(&self, zone: Zone) -> &SimZone {
        &self.zones[zone.index()]
    }

    pub fn zones(&self) -> [SimZone; 2] {
        self.zones
    }

    /// Command frames received so far, separators stripped
    pub fn received_commands(&self) -> &[Vec<u8>] {
        &self.received_commands
    }

    /// Simulate the front-panel power button
    pub fn set_power(&mut self, zone: Zone, on: bool) {
        self.zones[zone.index()].powered_on = on;
    }

    /// Simulate turning the volume knob
    pub fn set_volume(&mut self, zone: Zone, level: u8) {
        self.zones[zone.index()].volume = level.min(100);
    }

    /// Process one command frame (separator stripped)
    ///
    /// Returns the encoded reply, or `None` when the frame is not a command
    /// the receiver understands (the hardware stays silent).
    pub fn process_command(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        self.received_commands.push(frame.to_vec());

        let command = match AmpCommand::parse(frame) {
            Ok(command) => command,
            Err(e) => {
                warn!("Virtual AVR {} ignoring frame: {}", self.id, e);
                return None;
            }
        };
        debug!("Virtual AVR {} processing {}", self.id, command);

        let reply = self.apply(command);
        Some(reply.encode())
    }

    fn apply(&mut self, command: AmpCommand) -> StatusMessage {
        let zone = command.zone();
        let family = command.family();
        let state = &mut self.zones[zone.index()];

        if let AmpCommand::Power { mode, .. } = command {
            match mode {
                Mode::Off => state.powered_on = false,
                Mode::On => state.powered_on = true,
                Mode::Status => {}
            }
            return StatusMessage::Report {
                family,
                zone,
                report: ZoneReport::Power(state.powered_on),
            };
        }

        if !state.powered_on {
            return StatusMessage::Rejected { family };
        }

        let report = match command {
            AmpCommand::Power { .. } => ZoneReport::Power(state.powered_on),
            AmpCommand::Mute { mode, .. } => {
                match mode {
                    Mode::Off => state.muted = true,
                    Mode::On => state.muted = false,
                    Mode::Status => {}
                }
                ZoneReport::Mute(state.muted)
            }
            AmpCommand::Volume { mode, .. } => {
                match mode {
                    Mode::Off => state.volume = state.volume.saturating_sub(1),
                    Mode::On => state.volume = (state.volume + 1).min(100),
                    Mode::Status => {}
                }
                ZoneReport::Volume(state.volume)
            }
            AmpCommand::VolumeSet { level, .. } => {
                state.volume = level;
                ZoneReport::Volume(state.volume)
            }
            AmpCommand::AudioSelect { selection, .. } => {
                if let Some(source) = AudioSource::from_code(selection) {
                    state.source = source;
                }
                ZoneReport::Source(state.source.code())
            }
        };

        StatusMessage::Report {
            family,
            zone,
            report,
        }
    }
}
