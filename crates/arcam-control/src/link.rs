//! Reading and writing roles for one link session
//!
//! Each session splits the transport into halves and runs one task per half.
//! Both tasks return the error that ended them; the supervisor treats either
//! return as a transport fault. The writer also stops cleanly when asked, but
//! only between commands.

use std::io::ErrorKind;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info};

use crate::decoder::{DecodeOutcome, StatusDecoder};
use crate::error::ControlError;
use crate::events::ControllerEvent;
use crate::queue::QueueReceiver;

/// Read from the amplifier until the stream ends or fails
///
/// Every chunk is published as [`ControllerEvent::DataIn`] and then fed to the
/// decoder, whose outcomes are published in frame order.
pub async fn run_reader<R>(
    mut reader: R,
    mut decoder: StatusDecoder,
    buffer_size: usize,
    events: broadcast::Sender<ControllerEvent>,
) -> ControlError
where
    R: AsyncRead + Unpin,
{
    info!("Amplifier reader starting");
    let mut buffer = vec![0u8; buffer_size.max(1)];

    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => {
                error!("Amplifier stream closed");
                return ControlError::LinkClosed;
            }
            Ok(n) => {
                let data = &buffer[..n];
                debug!("Amp received {} bytes: {:02X?}", n, data);
                let _ = events.send(ControllerEvent::DataIn {
                    data: data.to_vec(),
                });

                for outcome in decoder.push_bytes(data) {
                    let _ = events.send(outcome_event(outcome));
                }
            }
            // Serial drivers surface read timeouts this way
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => {
                error!("Amplifier read error: {e}");
                return e.into();
            }
        }
    }
}

fn outcome_event(outcome: DecodeOutcome) -> ControllerEvent {
    match outcome {
        DecodeOutcome::Applied {
            zone,
            report,
            changed,
        } => ControllerEvent::StatusApplied {
            zone,
            report,
            changed,
        },
        DecodeOutcome::Rejected(family) => ControllerEvent::StatusRejected { family },
        DecodeOutcome::Discarded { frame, reason } => {
            ControllerEvent::FrameDiscarded { frame, reason }
        }
    }
}

/// Drain the write queue onto the amplifier until a write fails or `stop`
/// turns true
///
/// The queue receiver outlives sessions, so it is shared behind an async mutex
/// that this task holds for its whole life. `stop` is only checked between
/// commands, so a command that was dequeued always reaches the wire whole.
/// A command whose write fails is not retried.
pub async fn run_writer<W>(
    mut writer: W,
    queue: Arc<Mutex<QueueReceiver>>,
    events: broadcast::Sender<ControllerEvent>,
    mut stop: watch::Receiver<bool>,
) -> Result<(), ControlError>
where
    W: AsyncWrite + Unpin,
{
    let mut queue = queue.lock().await;
    info!("Amplifier writer starting");

    loop {
        let data = tokio::select! {
            biased;
            _ = stop.wait_for(|stop| *stop) => {
                debug!("Amplifier writer stopping");
                return Ok(());
            }
            next = queue.dequeue() => match next {
                Some(data) => data,
                None => break,
            },
        };

        debug!("Amp writing {} bytes: {:02X?}", data.len(), data);
        let result = match writer.write_all(&data).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!("Amplifier write error: {e}");
            return Err(e.into());
        }
        let _ = events.send(ControllerEvent::DataOut { data });
    }

    debug!("Write queue closed");
    Err(ControlError::QueueClosed)
}
