//! Live tempo settings shared between the UI and the scheduler.
//!
//! Every field is a lone atomic scalar. The UI (and tap tempo) write, the
//! scheduler reads once per beat it schedules. No field depends on another,
//! so there is nothing to keep consistent and no lock is needed. A change is
//! seen on the scheduler's next poll and only affects beats not yet scheduled.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{error::MetronomeError, meter::Meter};

pub const MIN_BPM: u32 = 30;
pub const MAX_BPM: u32 = 300;
pub const DEFAULT_BPM: u32 = 100;
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Clamp a tempo into the supported range.
#[inline]
pub fn clamp_bpm(bpm: u32) -> u32 {
    bpm.clamp(MIN_BPM, MAX_BPM)
}

/// Shared, lock-free tempo configuration.
#[derive(Debug)]
pub struct TempoConfig {
    bpm: AtomicU32,
    beats_per_measure: AtomicU8,
    /// f32 bit pattern
    volume: AtomicU32,
}

/// Plain copy of the settings at one instant (for display and persistence).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoSnapshot {
    pub bpm: u32,
    pub meter: Meter,
    pub volume: f32,
}

impl TempoConfig {
    pub fn new(bpm: u32, meter: Meter, volume: f32) -> Self {
        let config = Self {
            bpm: AtomicU32::new(clamp_bpm(bpm)),
            beats_per_measure: AtomicU8::new(meter.beats_per_measure()),
            volume: AtomicU32::new(DEFAULT_VOLUME.to_bits()),
        };
        config.set_volume(volume);
        config
    }

    pub fn bpm(&self) -> u32 {
        self.bpm.load(Ordering::Relaxed)
    }

    /// Set the tempo, clamped to [`MIN_BPM`, `MAX_BPM`]. Returns the stored value.
    pub fn set_bpm(&self, bpm: u32) -> u32 {
        let bpm = clamp_bpm(bpm);
        self.bpm.store(bpm, Ordering::Relaxed);
        bpm
    }

    /// Move the tempo by `delta` BPM, staying in range.
    pub fn nudge_bpm(&self, delta: i32) -> u32 {
        let target = (self.bpm() as i64 + delta as i64).max(0) as u32;
        self.set_bpm(target)
    }

    /// Length of one beat in seconds at the current tempo.
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm() as f64
    }

    pub fn beats_per_measure(&self) -> u8 {
        self.beats_per_measure.load(Ordering::Relaxed)
    }

    pub fn meter(&self) -> Meter {
        Meter::from_beats(self.beats_per_measure()).unwrap_or_default()
    }

    pub fn set_meter(&self, meter: Meter) {
        self.beats_per_measure
            .store(meter.beats_per_measure(), Ordering::Relaxed);
    }

    /// Set the meter by beat count. Unsupported counts leave the meter as is.
    pub fn set_beats_per_measure(&self, beats: u8) -> Result<Meter, MetronomeError> {
        let meter = Meter::from_beats(beats)?;
        self.set_meter(meter);
        Ok(meter)
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    /// Set the click volume, clamped to [0, 1]. Non-finite input is ignored.
    pub fn set_volume(&self, volume: f32) -> f32 {
        if !volume.is_finite() {
            return self.volume();
        }
        let volume = volume.clamp(0.0, 1.0);
        self.volume.store(volume.to_bits(), Ordering::Relaxed);
        volume
    }

    pub fn snapshot(&self) -> TempoSnapshot {
        TempoSnapshot {
            bpm: self.bpm(),
            meter: self.meter(),
            volume: self.volume(),
        }
    }
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BPM, Meter::FourFour, DEFAULT_VOLUME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_front_panel() {
        let tempo = TempoConfig::default();
        assert_eq!(
            tempo.snapshot(),
            TempoSnapshot {
                bpm: 100,
                meter: Meter::FourFour,
                volume: 0.7
            }
        );
    }

    #[test]
    fn bpm_is_clamped_at_the_setter() {
        let tempo = TempoConfig::default();
        assert_eq!(tempo.set_bpm(10), MIN_BPM);
        assert_eq!(tempo.set_bpm(1200), MAX_BPM);
        assert_eq!(tempo.set_bpm(120), 120);
        assert_eq!(tempo.bpm(), 120);
        assert!((tempo.seconds_per_beat() - 0.5).abs() < 1e-12);

        assert_eq!(TempoConfig::new(5, Meter::ThreeFour, 0.5).bpm(), MIN_BPM);
    }

    #[test]
    fn nudge_stays_in_range() {
        let tempo = TempoConfig::default();
        tempo.set_bpm(31);
        assert_eq!(tempo.nudge_bpm(-5), MIN_BPM);
        tempo.set_bpm(299);
        assert_eq!(tempo.nudge_bpm(5), MAX_BPM);
        assert_eq!(tempo.nudge_bpm(-1), 299);
    }

    #[test]
    fn unsupported_meter_is_rejected_and_keeps_previous() {
        let tempo = TempoConfig::default();
        assert_eq!(tempo.set_beats_per_measure(3).unwrap(), Meter::ThreeFour);
        assert!(tempo.set_beats_per_measure(7).is_err());
        assert_eq!(tempo.meter(), Meter::ThreeFour);
        assert_eq!(tempo.beats_per_measure(), 3);
    }

    #[test]
    fn volume_is_clamped_and_ignores_nan() {
        let tempo = TempoConfig::default();
        assert_eq!(tempo.set_volume(1.5), 1.0);
        assert_eq!(tempo.set_volume(-0.2), 0.0);
        tempo.set_volume(0.4);
        assert_eq!(tempo.set_volume(f32::NAN), 0.4);
        assert_eq!(tempo.volume(), 0.4);
    }
}
