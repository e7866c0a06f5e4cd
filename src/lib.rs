//! Drift-free metronome core.
//!
//! Beats are scheduled slightly ahead of time against the audio output's own
//! clock and rendered on their exact frame, while a separate frame-rate loop
//! shows each beat as it sounds.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use saavy_metronome::{meter::Meter, tempo::TempoConfig, transport::Transport};
//!
//! let tempo = Arc::new(TempoConfig::new(120, Meter::FourFour, 0.7));
//! let mut transport = Transport::new(backend, tempo.clone(), |event| println!("{event:?}"));
//! transport.start()?;
//! tempo.set_bpm(96); // heard from the next beat on
//! transport.stop();
//! ```

pub mod backend; // Audio output seams
pub mod clock;
pub mod error;
pub mod meter;
pub mod render; // Realtime click rendering
pub mod scheduler; // Lookahead beat scheduling
pub mod synth;
pub mod tap;
pub mod tempo;
pub mod transport; // Play/stop session control
pub mod visual;

pub use error::MetronomeError;

pub const MAX_BLOCK_SIZE: usize = 2048;
