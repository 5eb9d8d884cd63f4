//! Status decoding
//!
//! Turns raw serial chunks into state mutations. Each complete frame is
//! classified by its family prefix, checked, and (for `P` replies) applied to
//! the shared state. Malformed frames are logged and dropped; they never stop
//! decoding of the frames that follow.

use arcam_protocol::{
    parse_status_message, Family, Framer, ParseError, StatusMessage, Zone, ZoneReport,
};
use tracing::{debug, trace, warn};

use crate::state::SharedState;

/// Result of decoding one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// A `P` reply was written to the state
    Applied {
        zone: Zone,
        report: ZoneReport,
        changed: bool,
    },
    /// An `R` reply; the state was left untouched
    Rejected(Family),
    /// The frame failed validation
    Discarded { frame: Vec<u8>, reason: ParseError },
}

/// Framer plus state writer for the reading role
#[derive(Debug)]
pub struct StatusDecoder {
    framer: Framer,
    state: SharedState,
}

impl StatusDecoder {
    /// Create a decoder that applies replies to `state`
    pub fn new(state: SharedState) -> Self {
        Self {
            framer: Framer::new(),
            state,
        }
    }

    /// Feed a chunk read from the wire and decode every frame it completes
    pub fn push_bytes(&mut self, data: &[u8]) -> Vec<DecodeOutcome> {
        self.framer.push_bytes(data);

        let mut outcomes = Vec::new();
        while let Some(frame) = self.framer.next_frame() {
            outcomes.push(self.decode_frame(frame));
        }
        outcomes
    }

    /// Drop any partial frame, e.g. after the link is reopened
    pub fn reset(&mut self) {
        self.framer.clear();
    }

    fn decode_frame(&self, frame: Vec<u8>) -> DecodeOutcome {
        match parse_status_message(&frame) {
            Ok(StatusMessage::Report { zone, report, .. }) => {
                let changed = self.state.update(|s| s.apply(zone, report));
                debug!("Status {zone}: {report:?} (changed: {changed})");
                DecodeOutcome::Applied {
                    zone,
                    report,
                    changed,
                }
            }
            Ok(StatusMessage::Rejected { family }) => {
                trace!("Amplifier rejected {family} request");
                DecodeOutcome::Rejected(family)
            }
            Err(reason) => {
                warn!(
                    "Discarding frame {:?}: {reason}",
                    String::from_utf8_lossy(&frame)
                );
                DecodeOutcome::Discarded { frame, reason }
            }
        }
    }
}
