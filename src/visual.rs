//! Visual beat feedback kept in step with the audio.
//!
//! The scheduler publishes every beat it hands to the audio output into a
//! single-producer/single-consumer ring. A frame-rate loop drains the ring
//! against the same audio clock and fires a pulse as each beat comes due.
//! Pulses switch themselves off after a fixed time, independent of tempo.
//!
//! If frames are dropped the loop fires every overdue beat at once. Every
//! beat is shown exactly once; being on time comes second.

use std::collections::VecDeque;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::scheduler::SchedulerConfig;

/// A beat as handed out by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledBeat {
    /// Position in the measure (0 = downbeat)
    pub beat_index: u8,
    /// Onset on the audio clock (seconds)
    pub time: f64,
}

/// What the UI is told to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualEvent {
    /// Light the indicator for this beat (and the main pulse)
    Pulse { beat_index: u8 },
    /// Turn it off again
    Clear { beat_index: u8 },
}

/// Receives visual events from the visual loop.
///
/// Pulses arrive on the visual thread; the clears sent when a session stops
/// arrive on the thread that stopped it.
pub trait BeatListener: Send + 'static {
    fn on_visual(&mut self, event: VisualEvent);
}

impl<F> BeatListener for F
where
    F: FnMut(VisualEvent) + Send + 'static,
{
    fn on_visual(&mut self, event: VisualEvent) {
        self(event)
    }
}

/// Create an empty visual queue.
pub fn visual_queue(capacity: usize) -> (VisualProducer, VisualConsumer) {
    let (tx, rx) = RingBuffer::new(capacity);
    (VisualProducer { tx }, VisualConsumer { rx })
}

/// Scheduler end of the visual queue.
pub struct VisualProducer {
    tx: Producer<ScheduledBeat>,
}

impl VisualProducer {
    /// Append a beat. Returns `false` if the queue was full.
    pub fn publish(&mut self, beat: ScheduledBeat) -> bool {
        match self.tx.push(beat) {
            Ok(()) => true,
            Err(_) => {
                log::warn!(
                    "visual queue full, beat {} at {:.3}s will not be shown",
                    beat.beat_index,
                    beat.time
                );
                false
            }
        }
    }
}

/// Visual-loop end of the queue.
pub struct VisualConsumer {
    rx: Consumer<ScheduledBeat>,
}

impl VisualConsumer {
    /// Pop the head if it is due before `horizon`.
    pub fn pop_due(&mut self, horizon: f64) -> Option<ScheduledBeat> {
        match self.rx.peek() {
            Ok(beat) if beat.time < horizon => self.rx.pop().ok(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.slots()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Frame-driven consumer of the visual queue.
pub struct VisualLoop<L> {
    queue: VisualConsumer,
    listener: L,
    epsilon: f64,
    pulse_duration: f64,
    /// (clear time, beat) for pulses still lit, oldest first
    lit: VecDeque<(f64, u8)>,
}

impl<L: BeatListener> VisualLoop<L> {
    pub fn new(queue: VisualConsumer, listener: L, config: &SchedulerConfig) -> Self {
        Self {
            queue,
            listener,
            epsilon: config.visual_epsilon,
            pulse_duration: config.pulse_duration,
            lit: VecDeque::with_capacity(8),
        }
    }

    /// Run one frame at audio time `now`. Returns how many pulses fired.
    pub fn frame(&mut self, now: f64) -> usize {
        while let Some(&(clear_at, beat_index)) = self.lit.front() {
            if clear_at > now {
                break;
            }
            self.lit.pop_front();
            self.listener.on_visual(VisualEvent::Clear { beat_index });
        }

        let mut fired = 0;
        while let Some(beat) = self.queue.pop_due(now + self.epsilon) {
            self.listener.on_visual(VisualEvent::Pulse {
                beat_index: beat.beat_index,
            });
            self.lit.push_back((now + self.pulse_duration, beat.beat_index));
            fired += 1;
        }

        if fired > 1 {
            log::debug!("visual loop behind, fired {fired} beats in one frame");
        }
        fired
    }

    /// Number of beats queued but not shown yet.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Clear every pulse still lit, drop whatever is queued, and hand the
    /// listener back.
    pub fn finish(mut self) -> L {
        for (_, beat_index) in self.lit.drain(..) {
            self.listener.on_visual(VisualEvent::Clear { beat_index });
        }
        self.listener
    }
}
