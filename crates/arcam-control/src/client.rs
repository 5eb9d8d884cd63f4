//! Caller-facing command API
//!
//! Every operation validates its arguments, encodes the command and appends it
//! to the write queue. Nothing here touches the serial line, so calls return
//! immediately. Rejected arguments are logged and reported as
//! [`ControlError::InvalidCommand`]; nothing is queued for them.

use arcam_protocol::{AmpCommand, AudioSource, CommandError, EncodeCommand};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::ControlError;
use crate::events::ControllerEvent;
use crate::queue::WriteQueue;
use crate::state::{AmpState, SharedState};

const OFF: i32 = 0;
const ON: i32 = 1;
const STATUS: i32 = 9;

/// Cheap, cloneable handle for issuing amplifier commands
#[derive(Debug, Clone)]
pub struct AmpClient {
    queue: WriteQueue,
    state: SharedState,
    events: broadcast::Sender<ControllerEvent>,
}

impl AmpClient {
    /// Build a handle over the controller's queue, state and event stream
    pub(crate) fn new(
        queue: WriteQueue,
        state: SharedState,
        events: broadcast::Sender<ControllerEvent>,
    ) -> Self {
        Self {
            queue,
            state,
            events,
        }
    }

    /// Queue an already validated command
    pub fn send(&self, command: AmpCommand) -> Result<(), ControlError> {
        debug!("Queueing {command}");
        self.queue.enqueue(command.encode())
    }

    fn submit(
        &self,
        operation: &'static str,
        command: Result<AmpCommand, CommandError>,
    ) -> Result<(), ControlError> {
        match command {
            Ok(command) => self.send(command),
            Err(reason) => {
                warn!("Rejected {operation}: {reason}");
                let _ = self
                    .events
                    .send(ControllerEvent::CommandRejected { operation, reason });
                Err(reason.into())
            }
        }
    }

    // -------------------------------------------------------------------------
    // Power
    // -------------------------------------------------------------------------

    /// Generic power command: 0 off, 1 on, 9 query
    pub fn power(&self, mode: i32, zone: i32) -> Result<(), ControlError> {
        self.submit("power", AmpCommand::power(mode, zone))
    }

    /// Switch the zone on
    pub fn power_on(&self, zone: i32) -> Result<(), ControlError> {
        self.power(ON, zone)
    }

    /// Put the zone into standby
    pub fn power_off(&self, zone: i32) -> Result<(), ControlError> {
        self.power(OFF, zone)
    }

    /// Ask for the zone's power state
    pub fn power_status(&self, zone: i32) -> Result<(), ControlError> {
        self.power(STATUS, zone)
    }

    // -------------------------------------------------------------------------
    // Mute
    // -------------------------------------------------------------------------

    /// Generic mute command: 0 mutes, 1 unmutes, 9 queries
    pub fn mute_generic(&self, mode: i32, zone: i32) -> Result<(), ControlError> {
        self.submit("mute", AmpCommand::mute(mode, zone))
    }

    /// Mute the zone
    pub fn mute(&self, zone: i32) -> Result<(), ControlError> {
        self.mute_generic(OFF, zone)
    }

    /// Unmute the zone
    pub fn unmute(&self, zone: i32) -> Result<(), ControlError> {
        self.mute_generic(ON, zone)
    }

    /// Ask for the zone's mute state
    pub fn mute_status(&self, zone: i32) -> Result<(), ControlError> {
        self.mute_generic(STATUS, zone)
    }

    // -------------------------------------------------------------------------
    // Volume
    // -------------------------------------------------------------------------

    /// Generic volume command: 0 steps down, 1 steps up, 9 queries
    pub fn volume(&self, mode: i32, zone: i32) -> Result<(), ControlError> {
        self.submit("volume", AmpCommand::volume(mode, zone))
    }

    /// Step the volume up by one
    pub fn volume_inc(&self, zone: i32) -> Result<(), ControlError> {
        self.volume(ON, zone)
    }

    /// Step the volume down by one
    pub fn volume_dec(&self, zone: i32) -> Result<(), ControlError> {
        self.volume(OFF, zone)
    }

    /// Ask for the zone's volume
    pub fn volume_status(&self, zone: i32) -> Result<(), ControlError> {
        self.volume(STATUS, zone)
    }

    /// Set an absolute volume level (0-100)
    pub fn volume_set(&self, level: i32, zone: i32) -> Result<(), ControlError> {
        let command = AmpCommand::volume_set(level, zone);
        if command.is_ok() {
            info!("Setting zone {zone} volume to {level}");
        }
        self.submit("volume_set", command)
    }

    // -------------------------------------------------------------------------
    // Source
    // -------------------------------------------------------------------------

    /// Select a source by code (0-8), or query with 9
    pub fn audio_select(&self, selection: i32, zone: i32) -> Result<(), ControlError> {
        self.submit("audio_select", AmpCommand::audio_select(selection, zone))
    }

    /// Ask for the zone's selected input
    pub fn audio_select_status(&self, zone: i32) -> Result<(), ControlError> {
        self.audio_select(STATUS, zone)
    }

    /// Select the SAT input
    pub fn audio_select_sat(&self, zone: i32) -> Result<(), ControlError> {
        self.audio_select(i32::from(AudioSource::Sat.code()), zone)
    }

    /// Select the AUX input, which shares its code with PVR
    pub fn audio_select_aux(&self, zone: i32) -> Result<(), ControlError> {
        self.audio_select(i32::from(AudioSource::AUX.code()), zone)
    }

    /// Select the PVR input
    pub fn audio_select_pvr(&self, zone: i32) -> Result<(), ControlError> {
        self.audio_select(i32::from(AudioSource::Pvr.code()), zone)
    }

    /// Select the CD input
    pub fn audio_select_cd(&self, zone: i32) -> Result<(), ControlError> {
        self.audio_select(i32::from(AudioSource::Cd.code()), zone)
    }

    // -------------------------------------------------------------------------
    // Observation
    // -------------------------------------------------------------------------

    /// Copy of the current amplifier state
    pub fn snapshot(&self) -> AmpState {
        self.state.snapshot()
    }

    /// Subscribe to controller events
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub(crate) fn state(&self) -> &SharedState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{write_queue, QueueReceiver};
    use arcam_protocol::Zone;

    fn client() -> (AmpClient, QueueReceiver, broadcast::Receiver<ControllerEvent>) {
        let state = SharedState::new();
        let (queue, rx) = write_queue(state.clone());
        let (events, events_rx) = broadcast::channel(16);
        (AmpClient::new(queue, state, events), rx, events_rx)
    }

    fn drain(rx: &mut QueueReceiver) -> Vec<Vec<u8>> {
        std::iter::from_fn(|| rx.try_dequeue()).collect()
    }

    #[test]
    fn test_wrapper_encodings() {
        let (client, mut rx, _events) = client();

        client.power_on(1).unwrap();
        client.power_off(2).unwrap();
        client.power_status(1).unwrap();
        client.mute(1).unwrap();
        client.unmute(2).unwrap();
        client.mute_status(1).unwrap();
        client.volume_inc(1).unwrap();
        client.volume_dec(2).unwrap();
        client.volume_status(1).unwrap();
        client.audio_select_status(2).unwrap();
        client.audio_select_sat(1).unwrap();
        client.audio_select_aux(1).unwrap();
        client.audio_select_pvr(2).unwrap();
        client.audio_select_cd(1).unwrap();

        let expected = [
            b"PC_*11\r", b"PC_*20\r", b"PC_*19\r", b"PC_.10\r", b"PC_.21\r", b"PC_.19\r",
            b"PC_/11\r", b"PC_/20\r", b"PC_/19\r", b"PC_129\r", b"PC_111\r", b"PC_113\r",
            b"PC_123\r", b"PC_115\r",
        ];
        let expected: Vec<Vec<u8>> = expected.iter().map(|b| b.to_vec()).collect();
        assert_eq!(drain(&mut rx), expected);
    }

    #[test]
    fn test_volume_set_encoding() {
        let (client, mut rx, _events) = client();

        client.volume_set(30, 1).unwrap();
        client.volume_set(0, 2).unwrap();
        client.volume_set(100, 1).unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                vec![b'P', b'C', b'_', b'0', b'1', 0x4E, b'\r'],
                vec![b'P', b'C', b'_', b'0', b'2', 0x30, b'\r'],
                vec![b'P', b'C', b'_', b'0', b'1', 0x94, b'\r'],
            ]
        );
    }

    #[test]
    fn test_invalid_arguments_queue_nothing() {
        let (client, mut rx, _events) = client();

        let results = [
            client.volume_set(150, 1),
            client.volume_set(-1, 1),
            client.power(5, 1),
            client.power_on(3),
            client.mute_generic(2, 1),
            client.volume(1, 0),
            client.audio_select(10, 1),
            client.audio_select(-3, 2),
        ];

        assert!(results
            .iter()
            .all(|r| matches!(r, Err(e) if e.is_invalid_command())));
        assert!(drain(&mut rx).is_empty());
        assert_eq!(client.snapshot().queue_depth, 0);
    }

    #[test]
    fn test_rejection_reports_reason_and_event() {
        let (client, _rx, mut events) = client();

        let err = client.volume_set(150, 1).unwrap_err();
        assert!(matches!(
            err,
            ControlError::InvalidCommand(CommandError::VolumeOutOfRange(150))
        ));

        match events.try_recv().unwrap() {
            ControllerEvent::CommandRejected { operation, reason } => {
                assert_eq!(operation, "volume_set");
                assert_eq!(reason, CommandError::VolumeOutOfRange(150));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_mode_is_checked_before_zone() {
        let (client, _rx, _events) = client();

        let err = client.power(4, 7).unwrap_err();
        assert!(matches!(
            err,
            ControlError::InvalidCommand(CommandError::InvalidMode(4))
        ));
    }

    #[test]
    fn test_send_typed_command() {
        let (client, mut rx, _events) = client();

        client
            .send(AmpCommand::select_source(AudioSource::Fm, Zone::Two))
            .unwrap();

        assert_eq!(drain(&mut rx), vec![b"PC_126\r".to_vec()]);
    }

    #[test]
    fn test_queue_depth_visible_in_snapshot() {
        let (client, _rx, _events) = client();

        client.power_status(1).unwrap();
        client.power_status(2).unwrap();

        assert_eq!(client.snapshot().queue_depth, 2);
    }
}
