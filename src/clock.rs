use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/*
Audio Clock
===========

All beat timing is expressed in seconds on a clock that belongs to the audio
output, never on the OS timer that wakes the scheduler thread up.

  OS timer:    "wake me in ~25ms"   (coalesced, late under load, jittery)
  Audio clock: "frame 48000 leaves the DAC at t = 1.0s" (sample exact)

The scheduler thread only has to wake up often enough. When it does, it
stamps every beat with an audio-clock time, and the renderer starts the sound
on exactly that frame. Timer jitter therefore never reaches the speaker.

FrameClock
----------

The real clock is a frame counter shared between the audio callback and the
control threads:

    now = frames_rendered / sample_rate

The callback advances the counter after each block, so `now()` is the start
time of the next block that will be rendered. A beat stamped with a time
before that is late and starts at the top of the next block.

ManualClock
-----------

A clock you move by hand. Used by tests and anywhere timing has to be
reproduced exactly.
*/

/// Monotonic time source rooted in the audio pipeline.
pub trait AudioClock: Clone + Send + Sync + 'static {
    /// Current audio time in seconds.
    fn now(&self) -> f64;
}

/// Sample-counter clock advanced by the audio callback.
#[derive(Clone, Debug)]
pub struct FrameClock {
    frames: Arc<AtomicU64>,
    sample_rate: f64,
}

impl FrameClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate as f64,
        }
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Called by the audio callback once a block has been rendered.
    pub fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::Release);
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate as f32
    }

    /// Convert an audio-clock time to the frame on which it falls.
    pub fn frame_at(&self, time: f64) -> u64 {
        (time * self.sample_rate).round().max(0.0) as u64
    }
}

impl AudioClock for FrameClock {
    fn now(&self) -> f64 {
        self.frames() as f64 / self.sample_rate
    }
}

/// Clock that only moves when told to.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(start.to_bits())),
        }
    }

    pub fn set(&self, time: f64) {
        self.bits.store(time.to_bits(), Ordering::Release);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}
