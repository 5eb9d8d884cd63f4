//! Virtual receiver actor task
//!
//! Owns a [`VirtualAvr`] and serves it over any async byte stream. The task
//! uses a select! loop to:
//! - Read command frames from the stream and write back the replies
//! - Apply front-panel changes and shutdown requests from a channel
//! - Emit state change events via a broadcast channel

use std::io;

use arcam_protocol::{Framer, Zone};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::amplifier::{SimZone, VirtualAvr};

/// Commands that can be sent to a virtual receiver task
#[derive(Debug, Clone)]
pub enum VirtualAvrCommand {
    /// Press the front-panel power button
    SetPower { zone: Zone, on: bool },
    /// Turn the volume knob
    SetVolume { zone: Zone, level: u8 },
    /// Stop the task and close the stream
    Shutdown,
}

/// State event emitted when the virtual receiver changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualAvrStateEvent {
    pub zones: [SimZone; 2],
}

/// Run the virtual receiver task
///
/// Returns when the stream closes, the command channel closes, or a
/// shutdown is requested. Dropping the stream on return looks like a cable
/// pull to the controller.
pub async fn run_virtual_avr_task<S>(
    mut stream: S,
    mut avr: VirtualAvr,
    mut cmd_rx: mpsc::Receiver<VirtualAvrCommand>,
    state_tx: broadcast::Sender<VirtualAvrStateEvent>,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framer = Framer::new();
    let mut buf = [0u8; 256];

    info!("Starting virtual AVR task for {}", avr.id());

    let _ = state_tx.send(VirtualAvrStateEvent { zones: avr.zones() });

    loop {
        tokio::select! {
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("Virtual AVR stream closed for {}", avr.id());
                        break;
                    }
                    Ok(n) => {
                        framer.push_bytes(&buf[..n]);
                        let before = avr.zones();

                        while let Some(frame) = framer.next_frame() {
                            if let Some(reply) = avr.process_command(&frame) {
                                debug!("Virtual AVR {} replying {:02X?}", avr.id(), reply);
                                stream.write_all(&reply).await?;
                            }
                        }
                        stream.flush().await?;

                        if avr.zones() != before {
                            let _ = state_tx.send(VirtualAvrStateEvent { zones: avr.zones() });
                        }
                    }
                    Err(e) => {
                        warn!("Virtual AVR {} stream error: {}", avr.id(), e);
                        return Err(e);
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                let before = avr.zones();
                match cmd {
                    Some(VirtualAvrCommand::SetPower { zone, on }) => {
                        info!("Virtual AVR {} {zone} power {}", avr.id(), if on { "on" } else { "off" });
                        avr.set_power(zone, on);
                    }
                    Some(VirtualAvrCommand::SetVolume { zone, level }) => {
                        avr.set_volume(zone, level);
                    }
                    Some(VirtualAvrCommand::Shutdown) => {
                        info!("Shutdown requested for virtual AVR {}", avr.id());
                        break;
                    }
                    None => {
                        debug!("Command channel closed for virtual AVR {}", avr.id());
                        break;
                    }
                }
                if avr.zones() != before {
                    let _ = state_tx.send(VirtualAvrStateEvent { zones: avr.zones() });
                }
            }
        }
    }

    info!("Virtual AVR task ended for {}", avr.id());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn read_reply<S: AsyncRead + Unpin>(stream: &mut S, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        tokio::time::timeout(Duration::from_millis(500), stream.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn test_replies_to_split_commands() {
        let (mut host, avr_stream) = tokio::io::duplex(1024);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (state_tx, mut state_rx) = broadcast::channel(8);

        let task = tokio::spawn(run_virtual_avr_task(
            avr_stream,
            VirtualAvr::new("Test"),
            cmd_rx,
            state_tx,
        ));

        let initial = state_rx.recv().await.unwrap();
        assert!(!initial.zones[0].powered_on);

        host.write_all(b"PC_*1").await.unwrap();
        host.write_all(b"1\rPC_/19\r").await.unwrap();

        assert_eq!(read_reply(&mut host, 8).await, b"AV_*P11\r");
        assert_eq!(read_reply(&mut host, 8).await, b"AV_/P1N\r");

        let event = state_rx.recv().await.unwrap();
        assert!(event.zones[0].powered_on);

        drop(cmd_tx);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_front_panel_power_changes_replies() {
        let (mut host, avr_stream) = tokio::io::duplex(1024);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (state_tx, mut state_rx) = broadcast::channel(8);

        let task = tokio::spawn(run_virtual_avr_task(
            avr_stream,
            VirtualAvr::new("Test"),
            cmd_rx,
            state_tx,
        ));

        host.write_all(b"PC_.29\r").await.unwrap();
        assert_eq!(read_reply(&mut host, 6).await, b"AV_.R\r");

        cmd_tx
            .send(VirtualAvrCommand::SetPower {
                zone: Zone::Two,
                on: true,
            })
            .await
            .unwrap();
        cmd_tx
            .send(VirtualAvrCommand::SetVolume {
                zone: Zone::Two,
                level: 12,
            })
            .await
            .unwrap();

        loop {
            let event = state_rx.recv().await.unwrap();
            if event.zones[1].powered_on && event.zones[1].volume == 12 {
                break;
            }
        }

        host.write_all(b"PC_/29\r").await.unwrap();
        assert_eq!(read_reply(&mut host, 8).await, b"AV_/P2<\r");

        cmd_tx.send(VirtualAvrCommand::Shutdown).await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_stream() {
        let (mut host, avr_stream) = tokio::io::duplex(1024);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (state_tx, _state_rx) = broadcast::channel(8);

        let task = tokio::spawn(run_virtual_avr_task(
            avr_stream,
            VirtualAvr::new("Test"),
            cmd_rx,
            state_tx,
        ));

        cmd_tx.send(VirtualAvrCommand::Shutdown).await.unwrap();
        task.await.unwrap().unwrap();

        let mut buf = [0u8; 1];
        assert_eq!(host.read(&mut buf).await.unwrap(), 0);
    }
}
