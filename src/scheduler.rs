use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    backend::BeatSink,
    synth::synthesize,
    tempo::TempoConfig,
    visual::{ScheduledBeat, VisualProducer},
};

/*
Lookahead Scheduling
====================

The scheduler thread wakes roughly every 25ms and asks one question:

    which beats start before (now + lookahead)?

Each of those beats is stamped with its exact audio-clock time and handed to
the output, which starts it on that frame. The thread itself never has to be
on time, only early enough.

  audio clock ──────────────────────────────────────────────────▶
                 now            now + lookahead
                  │◀──── 100ms ────▶│
  poll ─────────▶ │   ▲ beat n      │        ▲ beat n+1 (next poll)
                      scheduled now

Poll interval vs lookahead
--------------------------

  lookahead > poll interval   so a slightly late wake-up still finds every
                              beat before it is due
  lookahead small             so a tempo change is heard on the very next beat

Catch-up
--------

If the thread is starved for several beat periods, `next_beat_time` ends up
behind `now`. The while loop then schedules every beat that fell due, in
order, before returning. Nothing is skipped; late beats play immediately.

Tempo and meter
---------------

Both are read live. The period added after beat n uses the tempo at the
moment beat n was scheduled, so a change never moves a beat that has already
been handed out. The measure position wraps with the beats-per-measure value
in force when it advances; if the meter shrinks below the position, the next
beat starts a new measure.
*/

/// Timing parameters for the scheduler and visual loops.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// How often the scheduler thread wakes up
    pub poll_interval: Duration,
    /// How far ahead of the audio clock beats are scheduled (seconds)
    pub lookahead: f64,
    /// Delay of the first beat after start (seconds)
    pub start_offset: f64,
    /// How often the visual loop runs
    pub frame_interval: Duration,
    /// A beat is shown once it is this close to sounding (seconds)
    pub visual_epsilon: f64,
    /// How long a visual pulse stays lit (seconds)
    pub pulse_duration: f64,
    /// Capacity of the visual queue
    pub queue_capacity: usize,
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(25),
            lookahead: 0.1,
            start_offset: 0.05,
            frame_interval: Duration::from_millis(16),
            visual_epsilon: 0.05,
            pulse_duration: 0.1,
            queue_capacity: 64,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn lookahead(mut self, seconds: f64) -> Self {
        self.lookahead = seconds;
        self
    }

    pub fn start_offset(mut self, seconds: f64) -> Self {
        self.start_offset = seconds;
        self
    }

    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn visual_epsilon(mut self, seconds: f64) -> Self {
        self.visual_epsilon = seconds;
        self
    }

    pub fn pulse_duration(mut self, seconds: f64) -> Self {
        self.pulse_duration = seconds;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Cursor over the beat grid of one running session.
#[derive(Debug, Clone)]
pub struct LookaheadScheduler {
    /// Audio-clock time of the next beat not yet scheduled
    next_beat_time: f64,
    /// Measure position of that beat
    beat_index: u8,
    lookahead: f64,
}

impl LookaheadScheduler {
    /// Create a scheduler whose first beat sounds `start_offset` after `now`.
    pub fn new(now: f64, start_offset: f64, lookahead: f64) -> Self {
        Self {
            next_beat_time: now + start_offset,
            beat_index: 0,
            lookahead,
        }
    }

    pub fn next_beat_time(&self) -> f64 {
        self.next_beat_time
    }

    pub fn beat_index(&self) -> u8 {
        self.beat_index
    }

    /// Schedule every beat due before `now + lookahead`.
    ///
    /// Each beat goes to the audio sink and the visual queue, in that order.
    /// Returns how many beats were scheduled.
    pub fn poll<S: BeatSink>(
        &mut self,
        now: f64,
        tempo: &TempoConfig,
        sink: &mut S,
        visual: &mut VisualProducer,
    ) -> usize {
        let horizon = now + self.lookahead;
        let overrun = self.next_beat_time < now;
        let mut scheduled = 0;

        while self.next_beat_time < horizon {
            let beats_per_measure = tempo.beats_per_measure().max(1);
            if self.beat_index >= beats_per_measure {
                self.beat_index = 0;
            }

            let beat = ScheduledBeat {
                beat_index: self.beat_index,
                time: self.next_beat_time,
            };
            sink.schedule(synthesize(beat.beat_index, beat.time, tempo.volume()));
            visual.publish(beat);
            log::trace!("scheduled beat {} at {:.4}s", beat.beat_index, beat.time);

            self.next_beat_time += tempo.seconds_per_beat();
            self.beat_index = (self.beat_index + 1) % beats_per_measure;
            scheduled += 1;
        }

        if overrun {
            log::debug!("scheduler fell behind, caught up {scheduled} beats");
        }
        scheduled
    }
}
