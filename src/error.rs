//! Error type shared by the metronome core.
//!
//! Only starting the transport can fail from a caller's point of view. Every
//! other condition on the timing path (implausible taps, scheduling overruns,
//! full queues) is absorbed where it happens.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetronomeError {
    /// No output device could be opened.
    #[error("audio backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The output exists but could not be resumed from suspension.
    #[error("could not resume audio output: {0}")]
    ResumeFailed(String),

    /// The output stream reported an error while building or playing.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// Time signatures other than 3/4, 4/4, 5/4 and 6/8 are rejected.
    #[error("unsupported meter: {0} beats per measure (expected 3, 4, 5 or 6)")]
    UnsupportedMeter(u8),

    /// The backend has no beat sink left to hand out.
    #[error("beat sink already taken by another session")]
    SinkUnavailable,

    /// The visual listener was lost when a previous session's loop panicked.
    #[error("visual listener lost by a previous session")]
    ListenerUnavailable,

    /// A scheduler or visual loop thread could not be spawned.
    #[error("could not spawn {name} thread: {source}")]
    Thread {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}
