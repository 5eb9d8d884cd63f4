//! Outbound command encoding
//!
//! Every command is `PC_` + command code + zone digit + value byte + `\r`.
//! Volume-set is the odd one out: the level is sent as the single byte
//! `0x30 + level`, so levels above 9 leave the printable digit range.

use std::fmt;

use crate::error::{CommandError, ParseError};
use crate::status::Family;
use crate::{EncodeCommand, RECORD_SEPARATOR};

/// Command prefix sent by the host
pub const COMMAND_PREFIX: &[u8; 3] = b"PC_";

/// Encoded length of every command, separator included
pub const COMMAND_LEN: usize = 7;

/// Highest accepted volume level
pub const MAX_VOLUME: u8 = 100;

/// Selection code that queries the current source instead of selecting one
pub const SOURCE_STATUS_CODE: u8 = 9;

/// Independently controllable audio output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Zone {
    /// Main zone
    One,
    /// Second zone
    Two,
}

impl Zone {
    /// Both zones in polling order
    pub const ALL: [Zone; 2] = [Zone::One, Zone::Two];

    /// Zone number as used by callers (1 or 2)
    pub fn number(self) -> u8 {
        match self {
            Zone::One => 1,
            Zone::Two => 2,
        }
    }

    /// ASCII digit on the wire
    pub fn ascii(self) -> u8 {
        b'0' + self.number()
    }

    /// Zero-based index for per-zone tables
    pub fn index(self) -> usize {
        usize::from(self.number() - 1)
    }

    /// Parse the ASCII zone digit from a frame
    pub fn from_ascii(b: u8) -> Option<Self> {
        match b {
            b'1' => Some(Zone::One),
            b'2' => Some(Zone::Two),
            _ => None,
        }
    }
}

impl TryFrom<i32> for Zone {
    type Error = CommandError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Zone::One),
            2 => Ok(Zone::Two),
            other => Err(CommandError::InvalidZone(other)),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone {}", self.number())
    }
}

/// Mode argument for the generic power, mute and volume commands
///
/// For volume, `Off` steps down and `On` steps up. For mute, `Off` engages
/// mute and `On` releases it, matching what the amplifier reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// `0`: off / decrement / mute
    Off,
    /// `1`: on / increment / unmute
    On,
    /// `9`: report current value
    Status,
}

impl Mode {
    /// Numeric mode code
    pub fn code(self) -> u8 {
        match self {
            Mode::Off => 0,
            Mode::On => 1,
            Mode::Status => 9,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Mode::Off),
            1 => Some(Mode::On),
            9 => Some(Mode::Status),
            _ => None,
        }
    }
}

impl TryFrom<i32> for Mode {
    type Error = CommandError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Mode::from_code)
            .ok_or(CommandError::InvalidMode(value))
    }
}

/// Audio input selectable per zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AudioSource {
    Dvd,
    Sat,
    Av,
    /// Also labelled AUX on the front panel
    Pvr,
    Vcr,
    Cd,
    Fm,
    Am,
    /// DVD audio
    Dvda,
}

impl AudioSource {
    /// Alias for the PVR input
    pub const AUX: AudioSource = AudioSource::Pvr;

    /// All sources in code order
    pub const ALL: [AudioSource; 9] = [
        AudioSource::Dvd,
        AudioSource::Sat,
        AudioSource::Av,
        AudioSource::Pvr,
        AudioSource::Vcr,
        AudioSource::Cd,
        AudioSource::Fm,
        AudioSource::Am,
        AudioSource::Dvda,
    ];

    /// Numeric source code (0-8)
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up a source by numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// Returns a human-readable name for the source
    pub fn name(&self) -> &'static str {
        match self {
            AudioSource::Dvd => "DVD",
            AudioSource::Sat => "SAT",
            AudioSource::Av => "AV",
            AudioSource::Pvr => "PVR/AUX",
            AudioSource::Vcr => "VCR",
            AudioSource::Cd => "CD",
            AudioSource::Fm => "FM",
            AudioSource::Am => "AM",
            AudioSource::Dvda => "DVDA",
        }
    }
}

/// A validated command ready for the write queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AmpCommand {
    /// Power on/off/status: `PC_*{zone}{mode}`
    Power { zone: Zone, mode: Mode },
    /// Mute/unmute/status: `PC_.{zone}{mode}`
    Mute { zone: Zone, mode: Mode },
    /// Volume down/up/status: `PC_/{zone}{mode}`
    Volume { zone: Zone, mode: Mode },
    /// Absolute volume: `PC_0{zone}` + `0x30 + level`
    VolumeSet { zone: Zone, level: u8 },
    /// Source select, 9 queries: `PC_1{zone}{selection}`
    AudioSelect { zone: Zone, selection: u8 },
}

impl AmpCommand {
    /// Validate a generic power command
    pub fn power(mode: i32, zone: i32) -> Result<Self, CommandError> {
        let mode = Mode::try_from(mode)?;
        let zone = Zone::try_from(zone)?;
        Ok(AmpCommand::Power { zone, mode })
    }

    /// Validate a generic mute command
    pub fn mute(mode: i32, zone: i32) -> Result<Self, CommandError> {
        let mode = Mode::try_from(mode)?;
        let zone = Zone::try_from(zone)?;
        Ok(AmpCommand::Mute { zone, mode })
    }

    /// Validate a generic volume step/status command
    pub fn volume(mode: i32, zone: i32) -> Result<Self, CommandError> {
        let mode = Mode::try_from(mode)?;
        let zone = Zone::try_from(zone)?;
        Ok(AmpCommand::Volume { zone, mode })
    }

    /// Validate an absolute volume command
    pub fn volume_set(level: i32, zone: i32) -> Result<Self, CommandError> {
        let level = u8::try_from(level)
            .ok()
            .filter(|l| *l <= MAX_VOLUME)
            .ok_or(CommandError::VolumeOutOfRange(level))?;
        let zone = Zone::try_from(zone)?;
        Ok(AmpCommand::VolumeSet { zone, level })
    }

    /// Validate a source selection (0-8) or source query (9)
    pub fn audio_select(selection: i32, zone: i32) -> Result<Self, CommandError> {
        let selection = u8::try_from(selection)
            .ok()
            .filter(|s| *s <= SOURCE_STATUS_CODE)
            .ok_or(CommandError::SourceOutOfRange(selection))?;
        let zone = Zone::try_from(zone)?;
        Ok(AmpCommand::AudioSelect { zone, selection })
    }

    /// Select a known source
    pub fn select_source(source: AudioSource, zone: Zone) -> Self {
        AmpCommand::AudioSelect {
            zone,
            selection: source.code(),
        }
    }

    /// Zone the command addresses
    pub fn zone(&self) -> Zone {
        match *self {
            AmpCommand::Power { zone, .. }
            | AmpCommand::Mute { zone, .. }
            | AmpCommand::Volume { zone, .. }
            | AmpCommand::VolumeSet { zone, .. }
            | AmpCommand::AudioSelect { zone, .. } => zone,
        }
    }

    /// Status family the amplifier answers this command with
    pub fn family(&self) -> Family {
        match self {
            AmpCommand::Power { .. } => Family::Power,
            AmpCommand::Mute { .. } => Family::Mute,
            AmpCommand::Volume { .. } => Family::VolumeChange,
            AmpCommand::VolumeSet { .. } => Family::VolumeSet,
            AmpCommand::AudioSelect { .. } => Family::Source,
        }
    }

    /// Raw value byte on the wire
    fn value_byte(&self) -> u8 {
        match *self {
            AmpCommand::Power { mode, .. }
            | AmpCommand::Mute { mode, .. }
            | AmpCommand::Volume { mode, .. } => b'0' + mode.code(),
            AmpCommand::VolumeSet { level, .. } => b'0' + level,
            AmpCommand::AudioSelect { selection, .. } => b'0' + selection,
        }
    }

    /// Parse a command frame (without separator) as sent by a host
    ///
    /// Used by the virtual amplifier to interpret what the controller writes.
    pub fn parse(frame: &[u8]) -> Result<Self, ParseError> {
        if frame.len() != COMMAND_LEN - 1 || !frame.starts_with(COMMAND_PREFIX) {
            return Err(ParseError::InvalidCommand(
                String::from_utf8_lossy(frame).into_owned(),
            ));
        }

        let family = Family::from_command_code(frame[3]).ok_or_else(|| {
            ParseError::InvalidCommand(String::from_utf8_lossy(frame).into_owned())
        })?;
        let zone = Zone::from_ascii(frame[4]).ok_or(ParseError::InvalidZone(frame[4]))?;
        let value = frame[5];
        let invalid = || ParseError::InvalidValue { family, value };
        let code = value.checked_sub(b'0').ok_or_else(invalid)?;

        let mode = || Mode::from_code(code).ok_or_else(invalid);
        match family {
            Family::Power => Ok(AmpCommand::Power { zone, mode: mode()? }),
            Family::Mute => Ok(AmpCommand::Mute { zone, mode: mode()? }),
            Family::VolumeChange => Ok(AmpCommand::Volume { zone, mode: mode()? }),
            Family::VolumeSet if code <= MAX_VOLUME => Ok(AmpCommand::VolumeSet { zone, level: code }),
            Family::Source if code <= SOURCE_STATUS_CODE => Ok(AmpCommand::AudioSelect {
                zone,
                selection: code,
            }),
            Family::VolumeSet | Family::Source => Err(invalid()),
        }
    }
}

impl EncodeCommand for AmpCommand {
    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(COMMAND_LEN);
        bytes.extend_from_slice(COMMAND_PREFIX);
        bytes.push(self.family().command_code());
        bytes.push(self.zone().ascii());
        bytes.push(self.value_byte());
        bytes.push(RECORD_SEPARATOR);
        bytes
    }
}

impl fmt::Display for AmpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmpCommand::Power { zone, mode } => write!(f, "power {:?} ({zone})", mode),
            AmpCommand::Mute { zone, mode } => write!(f, "mute {:?} ({zone})", mode),
            AmpCommand::Volume { zone, mode } => write!(f, "volume {:?} ({zone})", mode),
            AmpCommand::VolumeSet { zone, level } => write!(f, "volume set {level} ({zone})"),
            AmpCommand::AudioSelect { zone, selection } => {
                write!(f, "source {selection} ({zone})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_power() {
        assert_eq!(AmpCommand::power(1, 1).unwrap().encode(), b"PC_*11\r");
        assert_eq!(AmpCommand::power(0, 2).unwrap().encode(), b"PC_*20\r");
        assert_eq!(AmpCommand::power(9, 1).unwrap().encode(), b"PC_*19\r");
    }

    #[test]
    fn test_encode_mute_volume_source() {
        assert_eq!(AmpCommand::mute(0, 1).unwrap().encode(), b"PC_.10\r");
        assert_eq!(AmpCommand::volume(1, 2).unwrap().encode(), b"PC_/21\r");
        assert_eq!(AmpCommand::audio_select(5, 1).unwrap().encode(), b"PC_115\r");
        assert_eq!(AmpCommand::audio_select(9, 2).unwrap().encode(), b"PC_129\r");
    }

    #[test]
    fn test_encode_volume_set_uses_offset_byte() {
        let encoded = AmpCommand::volume_set(30, 1).unwrap().encode();
        assert_eq!(encoded, vec![b'P', b'C', b'_', b'0', b'1', 0x4E, b'\r']);

        let encoded = AmpCommand::volume_set(100, 2).unwrap().encode();
        assert_eq!(encoded, vec![b'P', b'C', b'_', b'0', b'2', 0x94, b'\r']);

        let encoded = AmpCommand::volume_set(0, 1).unwrap().encode();
        assert_eq!(encoded, b"PC_010\r");
    }

    #[test]
    fn test_rejects_out_of_range_arguments() {
        assert_eq!(
            AmpCommand::volume_set(150, 1),
            Err(CommandError::VolumeOutOfRange(150))
        );
        assert_eq!(
            AmpCommand::volume_set(-1, 1),
            Err(CommandError::VolumeOutOfRange(-1))
        );
        assert_eq!(AmpCommand::power(2, 1), Err(CommandError::InvalidMode(2)));
        assert_eq!(AmpCommand::mute(-9, 1), Err(CommandError::InvalidMode(-9)));
        assert_eq!(AmpCommand::volume(1, 3), Err(CommandError::InvalidZone(3)));
        assert_eq!(AmpCommand::power(1, 0), Err(CommandError::InvalidZone(0)));
        assert_eq!(
            AmpCommand::audio_select(10, 1),
            Err(CommandError::SourceOutOfRange(10))
        );
    }

    #[test]
    fn test_mode_checked_before_zone() {
        assert_eq!(AmpCommand::power(7, 7), Err(CommandError::InvalidMode(7)));
    }

    #[test]
    fn test_commands_fit_in_eight_bytes() {
        let commands = [
            AmpCommand::power(9, 2).unwrap(),
            AmpCommand::volume_set(100, 2).unwrap(),
            AmpCommand::audio_select(9, 1).unwrap(),
        ];
        for cmd in commands {
            assert!(cmd.encode().len() <= 8);
        }
    }

    #[test]
    fn test_parse_command_frames() {
        assert_eq!(
            AmpCommand::parse(b"PC_*19").unwrap(),
            AmpCommand::Power {
                zone: Zone::One,
                mode: Mode::Status
            }
        );
        assert_eq!(
            AmpCommand::parse(&[b'P', b'C', b'_', b'0', b'2', 0x94]).unwrap(),
            AmpCommand::VolumeSet {
                zone: Zone::Two,
                level: 100
            }
        );
        assert!(AmpCommand::parse(b"PC_*39").is_err());
        assert!(AmpCommand::parse(b"PC_*15").is_err());
        assert!(AmpCommand::parse(b"XX_*19").is_err());
    }

    #[test]
    fn test_audio_source_codes() {
        for source in AudioSource::ALL {
            assert_eq!(AudioSource::from_code(source.code()), Some(source));
        }
        assert_eq!(AudioSource::AUX, AudioSource::Pvr);
        assert_eq!(AudioSource::from_code(3), Some(AudioSource::Pvr));
        assert_eq!(AudioSource::from_code(9), None);
    }
}
