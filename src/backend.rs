//! Seams to the audio output.
//!
//! The metronome core needs three things from an output: a clock, a place to
//! drop beat events for sample-accurate playback, and a way to (re)start the
//! output. Everything else about devices and streams stays behind these traits.

use crate::{clock::AudioClock, error::MetronomeError, synth::BeatEvent};

/// Accepts beat events for playback at their stamped onset.
///
/// Called from the scheduler thread. Must not block.
pub trait BeatSink: Send + 'static {
    fn schedule(&mut self, event: BeatEvent);
}

/// An audio output owned by the transport.
pub trait AudioBackend {
    type Clock: AudioClock;
    type Sink: BeatSink;

    /// Open the output on first use, or resume it if it was suspended.
    fn resume(&mut self) -> Result<(), MetronomeError>;

    /// Whether the output is currently not advancing its clock.
    fn is_suspended(&self) -> bool;

    /// Handle to the output's clock.
    fn clock(&self) -> Self::Clock;

    /// Hand over the event sink. Returns `None` once it has been taken.
    fn take_sink(&mut self) -> Option<Self::Sink>;
}
