//! Beat synthesis.
//!
//! Turns "beat N of the measure sounds at time T" into a fully described
//! sound event. The description is pure data; the [`render`](crate::render)
//! module turns it into samples on the audio thread, starting on the exact
//! frame for `time`.
//!
//! # How It Works
//!
//! Two timbres, both a single sine with a pitch sweep:
//!
//! 1. Downbeat ("kick"): 150Hz falling exponentially to almost nothing over
//!    half a second. Full volume, long decay.
//! 2. Other beats ("click"): 800Hz snapping up to 1200Hz in 50ms. 60% volume,
//!    very short decay.
//!
//! Amplitude starts at zero on the onset, ramps up over a few milliseconds,
//! then decays exponentially to 1% of peak by the end of the sound. Every
//! voice is stopped half a second after its onset regardless of timbre.
//!
//! The same inputs always produce the same event, so rendering it twice gives
//! identical samples.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Time from onset to forced stop, for every beat.
pub const VOICE_LENGTH: f64 = 0.5;
/// Linear rise from silence to peak gain.
pub const ATTACK_TIME: f32 = 0.005;
/// Level, relative to peak, the decay reaches at the end of the sound.
pub const DECAY_FLOOR: f32 = 0.01;

const DOWNBEAT_START_HZ: f32 = 150.0;
const DOWNBEAT_END_HZ: f32 = 0.01;
const DOWNBEAT_SWEEP: f32 = 0.5;
const DOWNBEAT_DECAY: f32 = 0.5;

const CLICK_START_HZ: f32 = 800.0;
const CLICK_END_HZ: f32 = 1200.0;
const CLICK_SWEEP: f32 = 0.05;
const CLICK_DECAY: f32 = 0.05;
const CLICK_GAIN: f32 = 0.6;

/// Which timbre a beat gets.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatRole {
    /// First beat of the measure
    Downbeat,
    /// Every other beat
    Beat,
}

impl BeatRole {
    pub fn for_index(beat_index: u8) -> Self {
        if beat_index == 0 {
            BeatRole::Downbeat
        } else {
            BeatRole::Beat
        }
    }
}

/// Shape of one beat's sound, relative to its onset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatSound {
    pub role: BeatRole,
    /// Pitch at onset (Hz)
    pub start_hz: f32,
    /// Pitch once the sweep completes (Hz)
    pub end_hz: f32,
    /// Sweep length (seconds)
    pub sweep_time: f32,
    /// Peak amplitude
    pub peak_gain: f32,
    /// Seconds from onset until the level is back at `DECAY_FLOOR`
    pub decay_time: f32,
}

impl BeatSound {
    pub fn new(role: BeatRole, volume: f32) -> Self {
        let volume = volume.clamp(0.0, 1.0);
        match role {
            BeatRole::Downbeat => Self {
                role,
                start_hz: DOWNBEAT_START_HZ,
                end_hz: DOWNBEAT_END_HZ,
                sweep_time: DOWNBEAT_SWEEP,
                peak_gain: volume,
                decay_time: DOWNBEAT_DECAY,
            },
            BeatRole::Beat => Self {
                role,
                start_hz: CLICK_START_HZ,
                end_hz: CLICK_END_HZ,
                sweep_time: CLICK_SWEEP,
                peak_gain: volume * CLICK_GAIN,
                decay_time: CLICK_DECAY,
            },
        }
    }

    /// Exponential pitch sweep, holding the end pitch afterwards.
    #[inline]
    pub fn frequency_at(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return self.start_hz;
        }
        if t >= self.sweep_time {
            return self.end_hz;
        }
        let progress = t / self.sweep_time;
        self.start_hz * (self.end_hz / self.start_hz).powf(progress)
    }

    /// Amplitude envelope: zero at onset, linear attack, exponential decay,
    /// silent once the decay is over.
    #[inline]
    pub fn level_at(&self, t: f32) -> f32 {
        if t <= 0.0 || t >= self.decay_time {
            return 0.0;
        }
        if t < ATTACK_TIME {
            return self.peak_gain * (t / ATTACK_TIME);
        }
        let progress = (t - ATTACK_TIME) / (self.decay_time - ATTACK_TIME);
        self.peak_gain * DECAY_FLOOR.powf(progress)
    }
}

/// A beat ready to be handed to the audio output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    /// Position in the measure (0 = downbeat)
    pub beat_index: u8,
    /// Onset, audio clock seconds
    pub time: f64,
    /// Forced stop, audio clock seconds
    pub stop_time: f64,
    pub sound: BeatSound,
}

/// Describe the sound for `beat_index` starting at `time` on the audio clock.
pub fn synthesize(beat_index: u8, time: f64, volume: f32) -> BeatEvent {
    BeatEvent {
        beat_index,
        time,
        stop_time: time + VOICE_LENGTH,
        sound: BeatSound::new(BeatRole::for_index(beat_index), volume),
    }
}
