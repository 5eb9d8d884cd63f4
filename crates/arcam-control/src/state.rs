//! Amplifier state tracking
//!
//! One [`AmpState`] lives behind a [`SharedState`] per controller. The reading
//! role is the only writer; callers, the poller and exporters read whole
//! snapshots so a reader never sees half of a multi-field update.

use std::sync::Arc;

use arcam_protocol::{AudioSource, Zone, ZoneReport};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Current state of one zone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneState {
    /// Volume level (0-100)
    pub volume: u8,
    /// Powered on; standby reads as off
    pub powered_on: bool,
    /// Mute engaged
    pub mute_on: bool,
    /// Selected input code (0-9), `None` until the first source report arrives
    pub audio_source: Option<u8>,
}

impl ZoneState {
    /// Apply a decoded report, returning true if anything changed
    pub fn apply(&mut self, report: ZoneReport) -> bool {
        let before = *self;
        match report {
            ZoneReport::Volume(level) => self.volume = level,
            ZoneReport::Power(on) => self.powered_on = on,
            ZoneReport::Mute(muted) => self.mute_on = muted,
            ZoneReport::Source(code) => self.audio_source = Some(code),
        }
        *self != before
    }

    /// Named input, if the reported code has one
    pub fn source(&self) -> Option<AudioSource> {
        self.audio_source.and_then(AudioSource::from_code)
    }

    /// Format source for display
    pub fn source_display(&self) -> &'static str {
        match (self.audio_source, self.source()) {
            (_, Some(source)) => source.name(),
            (Some(_), None) => "unknown",
            (None, None) => "---",
        }
    }
}

/// Snapshot of the whole amplifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmpState {
    /// Commands waiting to be written
    pub queue_depth: usize,
    zones: [ZoneState; 2],
}

impl AmpState {
    /// State of one zone
    pub fn zone(&self, zone: Zone) -> &ZoneState {
        &self.zones[zone.index()]
    }

    /// Mutable state of one zone
    pub fn zone_mut(&mut self, zone: Zone) -> &mut ZoneState {
        &mut self.zones[zone.index()]
    }

    /// Iterate zones with their identifiers
    pub fn zones(&self) -> impl Iterator<Item = (Zone, &ZoneState)> {
        Zone::ALL.into_iter().map(move |z| (z, self.zone(z)))
    }

    /// Apply a decoded report to one zone
    pub fn apply(&mut self, zone: Zone, report: ZoneReport) -> bool {
        self.zone_mut(zone).apply(report)
    }
}

/// Lock-guarded handle to the amplifier state
///
/// Cloning shares the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<AmpState>>,
}

impl SharedState {
    /// Create empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the full state
    pub fn snapshot(&self) -> AmpState {
        self.inner.read().clone()
    }

    /// Copy of one zone
    pub fn zone(&self, zone: Zone) -> ZoneState {
        *self.inner.read().zone(zone)
    }

    /// Whether a zone was last reported powered on
    pub fn is_powered_on(&self, zone: Zone) -> bool {
        self.inner.read().zone(zone).powered_on
    }

    /// Current queue depth
    pub fn queue_depth(&self) -> usize {
        self.inner.read().queue_depth
    }

    /// Mutate under the write lock
    pub fn update<R>(&self, f: impl FnOnce(&mut AmpState) -> R) -> R {
        f(&mut *self.inner.write())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_unknown() {
        let state = SharedState::new();
        let zone = state.zone(Zone::One);

        assert_eq!(zone.volume, 0);
        assert!(!zone.powered_on);
        assert!(!zone.mute_on);
        assert_eq!(zone.audio_source, None);
        assert_eq!(zone.source_display(), "---");
    }

    #[test]
    fn test_apply_reports_change_detection() {
        let mut state = AmpState::default();

        assert!(state.apply(Zone::Two, ZoneReport::Volume(42)));
        assert!(!state.apply(Zone::Two, ZoneReport::Volume(42)));
        assert!(state.apply(Zone::Two, ZoneReport::Source(5)));

        assert_eq!(state.zone(Zone::Two).volume, 42);
        assert_eq!(state.zone(Zone::Two).source(), Some(AudioSource::Cd));
        assert_eq!(state.zone(Zone::Two).source_display(), "CD");
        assert_eq!(state.zone(Zone::One), &ZoneState::default());
    }

    #[test]
    fn test_unnamed_source_code_is_kept() {
        let mut zone = ZoneState::default();

        assert!(zone.apply(ZoneReport::Source(9)));
        assert_eq!(zone.audio_source, Some(9));
        assert_eq!(zone.source(), None);
        assert_eq!(zone.source_display(), "unknown");
    }

    #[test]
    fn test_shared_state_clones_share_data() {
        let state = SharedState::new();
        let other = state.clone();

        other.update(|s| s.apply(Zone::One, ZoneReport::Power(true)));

        assert!(state.is_powered_on(Zone::One));
        assert!(!state.is_powered_on(Zone::Two));
    }

    #[test]
    fn test_snapshots_are_never_torn() {
        let state = SharedState::new();
        let writer = state.clone();

        let handle = std::thread::spawn(move || {
            for level in 0..=100u8 {
                writer.update(|s| {
                    s.apply(Zone::One, ZoneReport::Volume(level));
                    s.apply(Zone::Two, ZoneReport::Volume(level));
                });
            }
        });

        for _ in 0..1000 {
            let snap = state.snapshot();
            assert_eq!(snap.zone(Zone::One).volume, snap.zone(Zone::Two).volume);
        }

        handle.join().unwrap();
        assert_eq!(state.zone(Zone::Two).volume, 100);
    }
}
