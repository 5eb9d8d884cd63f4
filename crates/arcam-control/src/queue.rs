//! Outbound write queue
//!
//! Unbounded FIFO between API callers and the writing role. Enqueueing never
//! blocks, so callers never wait on the serial line; the writer is the sole
//! consumer and drains one command at a time. The amplifier matches replies
//! to requests only by arrival order, so commands must reach the wire in
//! exactly the order they were enqueued.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::ControlError;
use crate::state::SharedState;

/// Create a connected queue pair that mirrors its depth into `state`
pub fn write_queue(state: SharedState) -> (WriteQueue, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));

    (
        WriteQueue {
            tx,
            depth: Arc::clone(&depth),
            state: state.clone(),
        },
        QueueReceiver { rx, depth, state },
    )
}

/// Producer side, cloned into every caller
#[derive(Debug, Clone)]
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    depth: Arc<AtomicUsize>,
    state: SharedState,
}

impl WriteQueue {
    /// Append an encoded command
    pub fn enqueue(&self, bytes: Vec<u8>) -> Result<(), ControlError> {
        // Count first so the consumer can never decrement below zero
        self.depth.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(bytes).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(ControlError::QueueClosed);
        }
        mirror_depth(&self.depth, &self.state);
        Ok(())
    }

    /// Commands waiting to be written
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Whether nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Consumer side, owned by the writing role
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    depth: Arc<AtomicUsize>,
    state: SharedState,
}

impl QueueReceiver {
    /// Wait for the next command
    ///
    /// Returns `None` once every producer has been dropped and the queue is
    /// drained.
    pub async fn dequeue(&mut self) -> Option<Vec<u8>> {
        let bytes = self.rx.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        mirror_depth(&self.depth, &self.state);
        Some(bytes)
    }

    /// Take the next command if one is already waiting
    pub fn try_dequeue(&mut self) -> Option<Vec<u8>> {
        let bytes = self.rx.try_recv().ok()?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        mirror_depth(&self.depth, &self.state);
        Some(bytes)
    }

    /// Commands waiting to be written
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Whether nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Load inside the lock so the last writer always publishes the latest count
fn mirror_depth(depth: &AtomicUsize, state: &SharedState) {
    state.update(|s| s.queue_depth = depth.load(Ordering::SeqCst));
}
