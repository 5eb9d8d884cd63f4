//! Status reply classification and validation
//!
//! # Format
//! - `AV_` + command code: 4-byte family prefix
//! - status: `P` (pass) or `R` (rejected, e.g. zone on standby)
//! - zone: `1` or `2`
//! - value: one byte, meaning depends on the family
//!
//! A passed reply is always exactly 7 bytes once the separator is stripped.
//! Rejected replies are not length-checked; the amplifier declining a query
//! is a normal outcome and carries nothing to decode.

use std::fmt;

use crate::command::{Zone, MAX_VOLUME};
use crate::error::ParseError;
use crate::{EncodeCommand, RECORD_SEPARATOR};

/// Length of a passed status reply, without separator
pub const STATUS_MESSAGE_LEN: usize = 7;

/// Length of the family prefix
pub const FAMILY_PREFIX_LEN: usize = 4;

/// Attribute a status reply is about, identified by its 4-byte prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Family {
    /// `AV_0`: echo of an absolute volume set
    VolumeSet,
    /// `AV_/`: echo of volume inc/dec/query
    VolumeChange,
    /// `AV_*`: power
    Power,
    /// `AV_.`: mute
    Mute,
    /// `AV_1`: source select
    Source,
}

impl Family {
    /// All families
    pub const ALL: [Family; 5] = [
        Family::VolumeSet,
        Family::VolumeChange,
        Family::Power,
        Family::Mute,
        Family::Source,
    ];

    /// Command code shared by the `PC_` command and the `AV_` reply
    pub fn command_code(self) -> u8 {
        match self {
            Family::VolumeSet => b'0',
            Family::VolumeChange => b'/',
            Family::Power => b'*',
            Family::Mute => b'.',
            Family::Source => b'1',
        }
    }

    /// Look up a family by its command code
    pub fn from_command_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.command_code() == code)
    }

    /// Reply prefix, e.g. `AV_*`
    pub fn prefix(self) -> [u8; FAMILY_PREFIX_LEN] {
        [b'A', b'V', b'_', self.command_code()]
    }

    /// Classify a frame by its first four bytes
    pub fn from_prefix(msg: &[u8]) -> Option<Self> {
        let prefix = msg.get(..FAMILY_PREFIX_LEN)?;
        Self::ALL.into_iter().find(|f| f.prefix() == prefix)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.prefix();
        write!(f, "{}", String::from_utf8_lossy(&prefix))
    }
}

/// Status byte at offset 4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// `P`: request accepted, value follows
    Pass,
    /// `R`: request declined by the amplifier
    Reject,
}

impl StatusCode {
    /// Byte on the wire
    pub fn as_byte(self) -> u8 {
        match self {
            StatusCode::Pass => b'P',
            StatusCode::Reject => b'R',
        }
    }
}

/// Decoded value of a passed reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ZoneReport {
    /// Current volume level (0-100)
    Volume(u8),
    /// Whether the zone is powered on; standby reads as off
    Power(bool),
    /// Whether mute is engaged
    Mute(bool),
    /// Selected input code (0-9), see [`crate::AudioSource::from_code`]
    Source(u8),
}

impl ZoneReport {
    /// Decode the value byte of a passed reply
    ///
    /// The mute mapping is inverted on this hardware: `0` means muted.
    pub fn decode(family: Family, value: u8) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidValue { family, value };

        match family {
            Family::VolumeSet | Family::VolumeChange => value
                .checked_sub(b'0')
                .filter(|v| *v <= MAX_VOLUME)
                .map(ZoneReport::Volume)
                .ok_or_else(invalid),
            Family::Power => Ok(ZoneReport::Power(value == b'1')),
            Family::Mute => Ok(ZoneReport::Mute(value == b'0')),
            Family::Source => value
                .checked_sub(b'0')
                .filter(|code| *code <= 9)
                .map(ZoneReport::Source)
                .ok_or_else(invalid),
        }
    }

    /// Value byte the amplifier sends for this report
    pub fn value_byte(&self) -> u8 {
        match *self {
            ZoneReport::Volume(level) => b'0' + level,
            ZoneReport::Power(on) => {
                if on {
                    b'1'
                } else {
                    b'0'
                }
            }
            ZoneReport::Mute(muted) => {
                if muted {
                    b'0'
                } else {
                    b'1'
                }
            }
            ZoneReport::Source(code) => b'0' + code,
        }
    }
}

/// A status reply that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMessage {
    /// `P` reply carrying a new value for one zone attribute
    Report {
        family: Family,
        zone: Zone,
        report: ZoneReport,
    },
    /// `R` reply; nothing to apply
    Rejected { family: Family },
}

impl StatusMessage {
    /// Family this message belongs to
    pub fn family(&self) -> Family {
        match *self {
            StatusMessage::Report { family, .. } | StatusMessage::Rejected { family } => family,
        }
    }
}

/// Build a passed reply as the amplifier would send it
impl EncodeCommand for StatusMessage {
    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(STATUS_MESSAGE_LEN + 1);
        bytes.extend_from_slice(&self.family().prefix());
        match self {
            StatusMessage::Report { zone, report, .. } => {
                bytes.push(StatusCode::Pass.as_byte());
                bytes.push(zone.ascii());
                bytes.push(report.value_byte());
            }
            StatusMessage::Rejected { .. } => {
                bytes.push(StatusCode::Reject.as_byte());
            }
        }
        bytes.push(RECORD_SEPARATOR);
        bytes
    }
}

/// Validate prefix, status byte and length of a frame for one family
///
/// `Ok(StatusCode::Reject)` is the silent no-op outcome; only
/// `Ok(StatusCode::Pass)` frames should be decoded further.
pub fn check_status_message(msg: &[u8], family: Family) -> Result<StatusCode, ParseError> {
    if !msg.starts_with(&family.prefix()) {
        return Err(ParseError::PrefixMismatch { expected: family });
    }

    let status = *msg.get(FAMILY_PREFIX_LEN).ok_or(ParseError::InvalidLength {
        expected: STATUS_MESSAGE_LEN,
        actual: msg.len(),
    })?;

    match status {
        b'R' => Ok(StatusCode::Reject),
        b'P' if msg.len() == STATUS_MESSAGE_LEN => Ok(StatusCode::Pass),
        b'P' => Err(ParseError::InvalidLength {
            expected: STATUS_MESSAGE_LEN,
            actual: msg.len(),
        }),
        other => Err(ParseError::InvalidStatus(other)),
    }
}

/// Classify, validate and decode one framed reply
pub fn parse_status_message(msg: &[u8]) -> Result<StatusMessage, ParseError> {
    if msg.len() < FAMILY_PREFIX_LEN {
        return Err(ParseError::TooShort(msg.len()));
    }

    let family = Family::from_prefix(msg).ok_or_else(|| {
        ParseError::UnknownFamily(String::from_utf8_lossy(&msg[..FAMILY_PREFIX_LEN]).into_owned())
    })?;

    if check_status_message(msg, family)? == StatusCode::Reject {
        return Ok(StatusMessage::Rejected { family });
    }

    let zone = Zone::from_ascii(msg[5]).ok_or(ParseError::InvalidZone(msg[5]))?;
    let report = ZoneReport::decode(family, msg[6])?;

    Ok(StatusMessage::Report {
        family,
        zone,
        report,
    })
}
