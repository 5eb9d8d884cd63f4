//! Line command language
//!
//! One command per line, zone last:
//!
//! ```text
//! power on|off|status <zone>
//! mute|unmute <zone>          mute status <zone>
//! volume up|down|status <zone>
//! volume set <level> <zone>
//! source <0-9|name> <zone>    names: sat, aux, pvr, cd, status, ...
//! status | ports | help | quit
//! ```

use std::fmt::Write as _;

use anyhow::Context;
use arcam_control::{AmpClient, ControlError, LinkState};
use arcam_protocol::{AudioSource, Mode};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::warn;

pub const HELP: &str = "\
commands:
  power on|off|status <zone>
  mute <zone> | unmute <zone> | mute status <zone>
  volume up|down|status <zone>
  volume set <level> <zone>
  source <0-9|dvd|sat|av|pvr|aux|vcr|cd|fm|am|dvda|status> <zone>
  status
  ports
  quit";

/// Source argument as typed by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceArg {
    Code(i32),
    Named(AudioSource),
    Aux,
    Status,
}

/// A parsed console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Power { mode: Mode, zone: i32 },
    Mute { mode: Mode, zone: i32 },
    Volume { mode: Mode, zone: i32 },
    VolumeSet { level: i32, zone: i32 },
    Source { source: SourceArg, zone: i32 },
    Status,
    Ports,
    Help,
    Quit,
}

/// Why a console line could not be parsed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineError {
    #[error("empty line")]
    Empty,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("unexpected '{0}'")]
    Trailing(String),
}

/// Parse one input line
pub fn parse_line(line: &str) -> Result<ConsoleCommand, LineError> {
    let lowered = line.trim().to_ascii_lowercase();
    let mut words = lowered.split_whitespace();
    let Some(head) = words.next() else {
        return Err(LineError::Empty);
    };

    let command = match head {
        "power" => ConsoleCommand::Power {
            mode: switch(words.next())?,
            zone: number(words.next(), "zone")?,
        },
        "mute" => match words.next() {
            Some("status") => ConsoleCommand::Mute {
                mode: Mode::Status,
                zone: number(words.next(), "zone")?,
            },
            zone => ConsoleCommand::Mute {
                mode: Mode::Off,
                zone: number(zone, "zone")?,
            },
        },
        "unmute" => ConsoleCommand::Mute {
            mode: Mode::On,
            zone: number(words.next(), "zone")?,
        },
        "volume" => match words.next() {
            Some("set") => ConsoleCommand::VolumeSet {
                level: number(words.next(), "level")?,
                zone: number(words.next(), "zone")?,
            },
            Some("up") => ConsoleCommand::Volume {
                mode: Mode::On,
                zone: number(words.next(), "zone")?,
            },
            Some("down") => ConsoleCommand::Volume {
                mode: Mode::Off,
                zone: number(words.next(), "zone")?,
            },
            Some("status") => ConsoleCommand::Volume {
                mode: Mode::Status,
                zone: number(words.next(), "zone")?,
            },
            Some(other) => return Err(LineError::UnknownCommand(format!("volume {other}"))),
            None => return Err(LineError::Missing("up|down|status|set")),
        },
        "source" => ConsoleCommand::Source {
            source: source(words.next())?,
            zone: number(words.next(), "zone")?,
        },
        "status" => ConsoleCommand::Status,
        "ports" => ConsoleCommand::Ports,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(LineError::UnknownCommand(other.to_string())),
    };

    match words.next() {
        Some(extra) => Err(LineError::Trailing(extra.to_string())),
        None => Ok(command),
    }
}

fn switch(word: Option<&str>) -> Result<Mode, LineError> {
    match word {
        Some("on") => Ok(Mode::On),
        Some("off") => Ok(Mode::Off),
        Some("status") => Ok(Mode::Status),
        Some(other) => Err(LineError::UnknownCommand(format!("power {other}"))),
        None => Err(LineError::Missing("on|off|status")),
    }
}

fn number(word: Option<&str>, what: &'static str) -> Result<i32, LineError> {
    let word = word.ok_or(LineError::Missing(what))?;
    word.parse()
        .map_err(|_| LineError::NotANumber(word.to_string()))
}

fn source(word: Option<&str>) -> Result<SourceArg, LineError> {
    let word = word.ok_or(LineError::Missing("source"))?;
    if let Ok(code) = word.parse() {
        return Ok(SourceArg::Code(code));
    }
    match word {
        "status" => Ok(SourceArg::Status),
        "aux" => Ok(SourceArg::Aux),
        "pvr" => Ok(SourceArg::Named(AudioSource::Pvr)),
        _ => AudioSource::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(word))
            .map(SourceArg::Named)
            .ok_or_else(|| LineError::UnknownSource(word.to_string())),
    }
}

/// Issue a parsed command, returning text to print
///
/// `Quit` is handled by the caller.
pub fn execute(
    client: &AmpClient,
    link: &watch::Receiver<LinkState>,
    command: ConsoleCommand,
) -> Result<Option<String>, ControlError> {
    match command {
        ConsoleCommand::Power { mode, zone } => match mode {
            Mode::On => client.power_on(zone)?,
            Mode::Off => client.power_off(zone)?,
            Mode::Status => client.power_status(zone)?,
        },
        ConsoleCommand::Mute { mode, zone } => match mode {
            Mode::Off => client.mute(zone)?,
            Mode::On => client.unmute(zone)?,
            Mode::Status => client.mute_status(zone)?,
        },
        ConsoleCommand::Volume { mode, zone } => match mode {
            Mode::On => client.volume_inc(zone)?,
            Mode::Off => client.volume_dec(zone)?,
            Mode::Status => client.volume_status(zone)?,
        },
        ConsoleCommand::VolumeSet { level, zone } => client.volume_set(level, zone)?,
        ConsoleCommand::Source { source, zone } => match source {
            SourceArg::Code(code) => client.audio_select(code, zone)?,
            SourceArg::Status => client.audio_select_status(zone)?,
            SourceArg::Aux => client.audio_select_aux(zone)?,
            SourceArg::Named(AudioSource::Sat) => client.audio_select_sat(zone)?,
            SourceArg::Named(AudioSource::Pvr) => client.audio_select_pvr(zone)?,
            SourceArg::Named(AudioSource::Cd) => client.audio_select_cd(zone)?,
            SourceArg::Named(other) => client.audio_select(i32::from(other.code()), zone)?,
        },
        ConsoleCommand::Status => return Ok(Some(status_report(client, *link.borrow()))),
        ConsoleCommand::Ports => return Ok(Some(port_report())),
        ConsoleCommand::Help => return Ok(Some(HELP.to_string())),
        ConsoleCommand::Quit => {}
    }
    Ok(None)
}

/// Render the current state
pub fn status_report(client: &AmpClient, link: LinkState) -> String {
    let state = client.snapshot();
    let mut out = format!("link: {}  queued: {}\n", link.name(), state.queue_depth);

    for (zone, z) in state.zones() {
        let _ = writeln!(
            out,
            "{zone}: {:<7} volume {:>3}  mute {:<3}  source {}",
            if z.powered_on { "on" } else { "standby" },
            z.volume,
            if z.mute_on { "on" } else { "off" },
            z.source_display()
        );
    }
    out.pop();
    out
}

/// List serial ports that could host an amplifier
pub fn port_report() -> String {
    match serialport::available_ports() {
        Ok(ports) if ports.is_empty() => "no serial ports found".to_string(),
        Ok(ports) => ports
            .into_iter()
            .map(|port| match port.port_type {
                serialport::SerialPortType::UsbPort(usb) => match usb.product {
                    Some(product) => format!("{} ({product})", port.port_name),
                    None => format!("{} (USB {:04x}:{:04x})", port.port_name, usb.vid, usb.pid),
                },
                _ => port.port_name,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Err(e) => format!("failed to list serial ports: {e}"),
    }
}

/// Read commands until `quit` or end of input
pub async fn run<R>(
    input: R,
    client: &AmpClient,
    link: &watch::Receiver<LinkState>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        let command = match parse_line(&line) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => command,
            Err(LineError::Empty) => continue,
            Err(e) => {
                println!("{e} (type 'help')");
                continue;
            }
        };

        match execute(client, link, command) {
            Ok(Some(output)) => println!("{output}"),
            Ok(None) => {}
            Err(ControlError::QueueClosed) => {
                warn!("Amplifier link is closed");
                break;
            }
            Err(e) => println!("{e}"),
        }
    }

    Ok(())
}
