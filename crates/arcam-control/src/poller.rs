//! Periodic status polling
//!
//! The amplifier only speaks when spoken to, so the controller keeps its state
//! fresh by queueing status queries on a fixed cadence. Zone 1 power is always
//! queried; the remaining queries are only sent while zone 1 is on, because a
//! zone in standby answers them with `R`.

use std::time::Duration;

use arcam_protocol::Zone;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

use crate::client::AmpClient;
use crate::error::ControlError;
use crate::events::LinkState;

/// Queue one polling cycle, returning how many queries were queued
pub fn poll_once(client: &AmpClient) -> Result<usize, ControlError> {
    let main = i32::from(Zone::One.number());
    client.power_status(main)?;
    let mut queued = 1;

    if !client.state().is_powered_on(Zone::One) {
        trace!("Zone 1 in standby, skipping detail queries");
        return Ok(queued);
    }

    for zone in Zone::ALL {
        let zone = i32::from(zone.number());
        client.mute_status(zone)?;
        client.volume_status(zone)?;
        client.power_status(zone)?;
        client.audio_select_status(zone)?;
        queued += 4;
    }

    Ok(queued)
}

/// Run the poller until `shutdown` flips to true or the link closes
///
/// Cycles are skipped while the link is opening or reconnecting.
pub async fn run_status_poller(
    client: AmpClient,
    link: watch::Receiver<LinkState>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Status poller starting ({} ms)", interval.as_millis());

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.wait_for(|stop| *stop) => break,

            _ = ticker.tick() => {
                let link_state = *link.borrow();
                if link_state == LinkState::Closed {
                    break;
                }
                if link_state != LinkState::Running {
                    trace!("Skipping poll while link is {}", link_state.name());
                    continue;
                }

                match poll_once(&client) {
                    Ok(queued) => debug!("Queued {queued} status queries"),
                    Err(ControlError::QueueClosed) => break,
                    Err(e) => debug!("Poll cycle failed: {e}"),
                }
            }
        }
    }

    info!("Status poller shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{write_queue, QueueReceiver};
    use crate::state::SharedState;
    use arcam_protocol::ZoneReport;
    use tokio::sync::broadcast;

    fn client() -> (AmpClient, QueueReceiver, SharedState) {
        let state = SharedState::new();
        let (queue, rx) = write_queue(state.clone());
        let (events, _) = broadcast::channel(16);
        (AmpClient::new(queue, state.clone(), events), rx, state)
    }

    fn drain(rx: &mut QueueReceiver) -> Vec<Vec<u8>> {
        std::iter::from_fn(|| rx.try_dequeue()).collect()
    }

    #[test]
    fn test_standby_polls_only_power() {
        let (client, mut rx, _state) = client();

        assert_eq!(poll_once(&client).unwrap(), 1);
        assert_eq!(drain(&mut rx), vec![b"PC_*19\r".to_vec()]);
    }

    #[test]
    fn test_powered_on_polls_both_zones_in_order() {
        let (client, mut rx, state) = client();
        state.update(|s| s.apply(Zone::One, ZoneReport::Power(true)));

        assert_eq!(poll_once(&client).unwrap(), 9);

        let expected = [
            b"PC_*19\r", b"PC_.19\r", b"PC_/19\r", b"PC_*19\r", b"PC_119\r", b"PC_.29\r",
            b"PC_/29\r", b"PC_*29\r", b"PC_129\r",
        ];
        let expected: Vec<Vec<u8>> = expected.iter().map(|b| b.to_vec()).collect();
        assert_eq!(drain(&mut rx), expected);
    }

    #[test]
    fn test_zone_two_power_alone_does_not_expand_poll() {
        let (client, mut rx, state) = client();
        state.update(|s| s.apply(Zone::Two, ZoneReport::Power(true)));

        assert_eq!(poll_once(&client).unwrap(), 1);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_poller_pauses_while_link_down() {
        let (client, mut rx, _state) = client();
        let (link_tx, link_rx) = watch::channel(LinkState::Reconnecting { attempt: 1 });
        let (stop_tx, stop_rx) = watch::channel(false);

        let poller = tokio::spawn(run_status_poller(
            client,
            link_rx,
            Duration::from_millis(20),
            stop_rx,
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_dequeue().is_none());

        link_tx.send(LinkState::Running).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(drain(&mut rx).len() >= 2);

        stop_tx.send(true).unwrap();
        poller.await.unwrap();
    }

    #[tokio::test]
    async fn test_poller_stops_when_queue_closes() {
        let (client, rx, _state) = client();
        let (_link_tx, link_rx) = watch::channel(LinkState::Running);
        let (_stop_tx, stop_rx) = watch::channel(false);
        drop(rx);

        tokio::time::timeout(
            Duration::from_secs(1),
            run_status_poller(client, link_rx, Duration::from_millis(10), stop_rx),
        )
        .await
        .unwrap();
    }
}
