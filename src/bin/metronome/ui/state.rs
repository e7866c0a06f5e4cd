//! Pulse state shared between the visual loop and the UI thread
//!
//! The visual loop writes, the draw loop reads. Plain atomics, no allocation.

use std::sync::{
    atomic::{AtomicBool, AtomicU8, Ordering},
    Arc,
};

use saavy_metronome::visual::{BeatListener, VisualEvent};

/// Most beats a measure can have
pub const MAX_BEATS: usize = 6;

/// Which beat indicators are currently lit
pub struct PulseBoard {
    leds: [AtomicBool; MAX_BEATS],
    /// Number of pulses lit; the speaker cone pulses while non-zero
    lit: AtomicU8,
}

impl PulseBoard {
    pub fn new() -> Self {
        Self {
            leds: std::array::from_fn(|_| AtomicBool::new(false)),
            lit: AtomicU8::new(0),
        }
    }

    pub fn apply(&self, event: VisualEvent) {
        match event {
            VisualEvent::Pulse { beat_index } => {
                if let Some(led) = self.leds.get(beat_index as usize) {
                    led.store(true, Ordering::Relaxed);
                }
                self.lit.fetch_add(1, Ordering::Relaxed);
            }
            VisualEvent::Clear { beat_index } => {
                if let Some(led) = self.leds.get(beat_index as usize) {
                    led.store(false, Ordering::Relaxed);
                }
                let _ = self
                    .lit
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
            }
        }
    }

    pub fn is_lit(&self, beat_index: usize) -> bool {
        self.leds
            .get(beat_index)
            .is_some_and(|led| led.load(Ordering::Relaxed))
    }

    pub fn speaker_active(&self) -> bool {
        self.lit.load(Ordering::Relaxed) > 0
    }
}

impl Default for PulseBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Visual-loop listener feeding a [`PulseBoard`]
pub struct BoardListener {
    board: Arc<PulseBoard>,
}

impl BoardListener {
    pub fn new(board: Arc<PulseBoard>) -> Self {
        Self { board }
    }
}

impl BeatListener for BoardListener {
    fn on_visual(&mut self, event: VisualEvent) {
        self.board.apply(event);
    }
}
