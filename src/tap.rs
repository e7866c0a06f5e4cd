//! Tap tempo.
//!
//! Each tap is compared with the one before it and nothing else: no history,
//! no averaging. An interval inside the plausible window replaces the tempo
//! outright; anything outside it (the first tap, or a long pause) silently
//! starts a new tapping run.

use std::time::Duration;

use crate::tempo::{clamp_bpm, TempoConfig};

/// Intervals at or below this are too fast to be a tapped beat (300 BPM).
pub const MIN_TAP_INTERVAL: Duration = Duration::from_millis(200);
/// Intervals at or above this mean the user paused (20 BPM).
pub const MAX_TAP_INTERVAL: Duration = Duration::from_millis(3000);

/// Convert one tap interval to a tempo, or `None` if the interval is outside
/// the open window (`MIN_TAP_INTERVAL`, `MAX_TAP_INTERVAL`).
pub fn estimate_bpm(delta: Duration) -> Option<u32> {
    if delta <= MIN_TAP_INTERVAL || delta >= MAX_TAP_INTERVAL {
        return None;
    }
    let millis = delta.as_secs_f64() * 1000.0;
    let bpm = (60_000.0 / millis).round() as u32;
    Some(clamp_bpm(bpm))
}

#[derive(Debug, Default, Clone)]
pub struct TapTempo {
    last_tap: Option<Duration>,
}

impl TapTempo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tap at `now` (any monotonic timeline, e.g. time since the
    /// app started). The tap always becomes the new reference point, even
    /// when its interval is rejected.
    pub fn on_tap(&mut self, now: Duration) -> Option<u32> {
        let previous = self.last_tap.replace(now);
        let delta = now.checked_sub(previous?)?;
        estimate_bpm(delta)
    }

    /// Register a tap and write an accepted estimate into `tempo`.
    pub fn tap(&mut self, now: Duration, tempo: &TempoConfig) -> Option<u32> {
        let bpm = self.on_tap(now)?;
        let applied = tempo.set_bpm(bpm);
        log::debug!("tap tempo accepted: {applied} bpm");
        Some(applied)
    }

    pub fn last_tap(&self) -> Option<Duration> {
        self.last_tap
    }
}
