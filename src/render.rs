use std::f32::consts::TAU;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::{backend::BeatSink, clock::FrameClock, synth::BeatEvent};

/*
Click Renderer
==============

The audio-thread half of the metronome. Beat events arrive over a lock-free
ring buffer, already stamped with an audio-clock onset. The renderer parks
each one in a voice and starts it on the exact frame the stamp names, even
when that frame lands in the middle of a block.

  scheduler thread                       audio callback
  ----------------                       --------------
  synthesize(i, t, vol) ──push──▶ [ring] ──pop──▶ voice.start_frame = t * sr
                                                  render voices into block
                                                  clock.advance(block_len)

Timing
------

  block_start = clock.frames()          (the frame about to be written)

  event in the future:  starts at frame_at(time), possibly many blocks later
  event already late:   starts at block_start (plays now, never dropped)

Voices
------

A small fixed pool. At 300 BPM with half-second voices at most three overlap,
so eight is plenty; if the pool is ever exhausted the oldest voice is
replaced. Nothing here allocates, locks or logs.
*/

/// Size of the voice pool.
pub const MAX_VOICES: usize = 8;
/// Default capacity of the scheduler → audio event ring.
pub const EVENT_QUEUE_SIZE: usize = 64;

/// Create the event ring connecting the scheduler to a [`ClickRenderer`].
pub fn click_channel(capacity: usize) -> (Producer<BeatEvent>, Consumer<BeatEvent>) {
    RingBuffer::new(capacity)
}

impl BeatSink for Producer<BeatEvent> {
    fn schedule(&mut self, event: BeatEvent) {
        if let Err(rtrb::PushError::Full(event)) = self.push(event) {
            log::warn!(
                "audio event queue full, beat {} at {:.3}s not sent",
                event.beat_index,
                event.time
            );
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Voice {
    event: Option<BeatEvent>,
    start_frame: u64,
    end_frame: u64,
    /// Normalised oscillator phase (0..1)
    phase: f32,
}

impl Voice {
    const IDLE: Voice = Voice {
        event: None,
        start_frame: 0,
        end_frame: 0,
        phase: 0.0,
    };

    fn is_free(&self) -> bool {
        self.event.is_none()
    }

    fn start(&mut self, event: BeatEvent, start_frame: u64, sample_rate: f32) {
        let audible = event
            .sound
            .decay_time
            .min((event.stop_time - event.time) as f32)
            .max(0.0);

        self.event = Some(event);
        self.start_frame = start_frame;
        self.end_frame = start_frame + (audible * sample_rate).round() as u64;
        self.phase = 0.0;
    }

    fn render(&mut self, out: &mut [f32], block_start: u64, sample_rate: f32) {
        let Some(event) = self.event else {
            return;
        };
        let block_end = block_start + out.len() as u64;
        let first = self.start_frame.max(block_start);
        let last = self.end_frame.min(block_end);

        for frame in first..last {
            let t = (frame - self.start_frame) as f32 / sample_rate;
            let sample = (self.phase * TAU).sin() * event.sound.level_at(t);
            out[(frame - block_start) as usize] += sample;

            self.phase += event.sound.frequency_at(t) / sample_rate;
            self.phase -= self.phase.floor();
        }

        if block_end >= self.end_frame {
            *self = Voice::IDLE;
        }
    }
}

/// Sample-accurate renderer for scheduled beats. Lives in the audio callback.
pub struct ClickRenderer {
    rx: Consumer<BeatEvent>,
    clock: FrameClock,
    voices: [Voice; MAX_VOICES],
}

impl ClickRenderer {
    pub fn new(rx: Consumer<BeatEvent>, clock: FrameClock) -> Self {
        Self {
            rx,
            clock,
            voices: [Voice::IDLE; MAX_VOICES],
        }
    }

    /// Render one mono block and advance the clock past it.
    pub fn process(&mut self, out: &mut [f32]) {
        let block_start = self.clock.frames();
        let sample_rate = self.clock.sample_rate();

        while let Ok(event) = self.rx.pop() {
            let start_frame = self.clock.frame_at(event.time).max(block_start);
            self.allocate_voice().start(event, start_frame, sample_rate);
        }

        out.fill(0.0);
        for voice in self.voices.iter_mut().filter(|v| !v.is_free()) {
            voice.render(out, block_start, sample_rate);
        }

        self.clock.advance(out.len() as u64);
    }

    /// Number of voices still sounding or waiting for their onset.
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_free()).count()
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    fn allocate_voice(&mut self) -> &mut Voice {
        let idx = self
            .voices
            .iter()
            .position(Voice::is_free)
            .unwrap_or_else(|| {
                // Steal whichever voice started first
                self.voices
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, v)| v.start_frame)
                    .map(|(idx, _)| idx)
                    .unwrap_or(0)
            });
        &mut self.voices[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::AudioClock, synth::synthesize};

    const SAMPLE_RATE: f32 = 48_000.0;

    fn renderer() -> (Producer<BeatEvent>, ClickRenderer) {
        let (tx, rx) = click_channel(EVENT_QUEUE_SIZE);
        (tx, ClickRenderer::new(rx, FrameClock::new(SAMPLE_RATE)))
    }

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn onset_lands_on_the_scheduled_frame() {
        let (mut tx, mut renderer) = renderer();
        tx.schedule(synthesize(1, 0.01, 1.0)); // frame 480

        let mut block = vec![0.0; 1024];
        renderer.process(&mut block);

        assert!(block[..=480].iter().all(|&s| s == 0.0));
        assert!(peak(&block[481..]) > 0.1);
    }

    #[test]
    fn future_event_waits_for_its_block() {
        let (mut tx, mut renderer) = renderer();
        tx.schedule(synthesize(0, 0.1, 1.0)); // frame 4800

        let mut block = vec![0.0; 1024];
        for _ in 0..4 {
            renderer.process(&mut block);
            assert_eq!(peak(&block), 0.0);
        }
        assert_eq!(renderer.active_voices(), 1);

        renderer.process(&mut block); // frames 4096..5120
        assert!(peak(&block) > 0.0);
    }

    #[test]
    fn late_event_starts_at_block_start() {
        let (mut tx, mut renderer) = renderer();
        let mut block = vec![0.0; 512];
        renderer.process(&mut block);
        renderer.process(&mut block);

        tx.schedule(synthesize(1, 0.0, 1.0));
        renderer.process(&mut block);

        assert_eq!(block[0], 0.0);
        assert!(peak(&block[..64]) > 0.0);
    }

    #[test]
    fn clock_advances_by_rendered_frames() {
        let (_tx, mut renderer) = renderer();
        let mut block = vec![0.0; 480];
        renderer.process(&mut block);
        renderer.process(&mut block);

        assert_eq!(renderer.clock().frames(), 960);
        assert!((renderer.clock().now() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn voices_free_themselves_when_done() {
        let (mut tx, mut renderer) = renderer();
        tx.schedule(synthesize(0, 0.0, 1.0));
        tx.schedule(synthesize(1, 0.0, 1.0));

        let mut block = vec![0.0; 4800]; // 100ms
        renderer.process(&mut block);
        assert_eq!(renderer.active_voices(), 1, "click voice lasts 50ms");

        for _ in 0..5 {
            renderer.process(&mut block);
        }
        assert_eq!(renderer.active_voices(), 0);
        assert_eq!(peak(&block), 0.0);
    }

    #[test]
    fn same_event_renders_identically() {
        let event = synthesize(0, 0.005, 0.7);
        let mut first = vec![0.0; 2048];
        let mut second = vec![0.0; 2048];

        let (mut tx, mut a) = renderer();
        tx.schedule(event);
        a.process(&mut first);

        let (mut tx, mut b) = renderer();
        tx.schedule(event);
        b.process(&mut second);

        assert_eq!(first, second);
    }

    #[test]
    fn output_stays_in_range() {
        let (mut tx, mut renderer) = renderer();
        for i in 0..MAX_VOICES as u8 + 2 {
            tx.schedule(synthesize(i % 4, 0.001 * i as f64, 1.0));
        }
        let mut block = vec![0.0; 2048];
        renderer.process(&mut block);

        assert!(block.iter().all(|s| s.is_finite()));
        assert!(renderer.active_voices() <= MAX_VOICES);
    }

    #[test]
    fn full_queue_does_not_panic() {
        let (mut tx, _rx) = click_channel(2);
        for i in 0..4 {
            tx.schedule(synthesize(i, i as f64, 1.0));
        }
        assert_eq!(tx.slots(), 0);
    }
}
