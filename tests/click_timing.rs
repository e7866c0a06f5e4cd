use rtrb::Producer;
use saavy_metronome::{
    backend::BeatSink,
    clock::{AudioClock, FrameClock},
    meter::Meter,
    render::{click_channel, ClickRenderer, EVENT_QUEUE_SIZE},
    scheduler::{LookaheadScheduler, SchedulerConfig},
    synth::BeatEvent,
    tempo::TempoConfig,
    visual::visual_queue,
};

const SAMPLE_RATE: f32 = 48_000.0;
/// One scheduler poll (25ms) worth of frames
const POLL_FRAMES: usize = 1200;

/// Forwards to the renderer and keeps a copy of every event.
struct Tee {
    tx: Producer<BeatEvent>,
    seen: Vec<BeatEvent>,
}

impl BeatSink for Tee {
    fn schedule(&mut self, event: BeatEvent) {
        self.seen.push(event);
        self.tx.schedule(event);
    }
}

/// Interleave scheduler polls with rendering, the way the two threads would.
fn run(tempo: &TempoConfig, seconds: f32) -> (Vec<f32>, Vec<BeatEvent>) {
    let config = SchedulerConfig::default();
    let clock = FrameClock::new(SAMPLE_RATE);
    let (tx, rx) = click_channel(EVENT_QUEUE_SIZE);
    let (mut visual_tx, _visual_rx) = visual_queue(256);
    let mut renderer = ClickRenderer::new(rx, clock.clone());
    let mut sink = Tee { tx, seen: Vec::new() };
    let mut scheduler = LookaheadScheduler::new(clock.now(), config.start_offset, config.lookahead);

    let total = (seconds * SAMPLE_RATE) as usize;
    let mut audio = vec![0.0; total];
    for block in audio.chunks_mut(POLL_FRAMES) {
        scheduler.poll(clock.now(), tempo, &mut sink, &mut visual_tx);
        renderer.process(block);
    }
    (audio, sink.seen)
}

fn first_sound_after(audio: &[f32], frame: usize) -> Option<usize> {
    audio[frame..]
        .iter()
        .position(|&s| s != 0.0)
        .map(|offset| frame + offset)
}

#[test]
fn beats_sound_on_their_grid_frames() {
    let tempo = TempoConfig::new(120, Meter::FourFour, 0.7);
    let (audio, events) = run(&tempo, 2.1);

    let indices: Vec<u8> = events.iter().map(|e| e.beat_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 0]);
    for (n, event) in events.iter().enumerate() {
        assert!((event.time - (0.05 + 0.5 * n as f64)).abs() < 1e-9);
    }

    // Nothing before the first onset, which is silent itself (zero envelope)
    assert_eq!(first_sound_after(&audio, 0), Some(2401));

    // Beat 1 is a 50ms click, then silence until beat 2 at frame 50400
    let click_end = 26_400 + 2_400;
    assert_eq!(first_sound_after(&audio, click_end), Some(50_401));
}

#[test]
fn audio_stays_bounded_at_full_volume() {
    let tempo = TempoConfig::new(300, Meter::SixEight, 1.0);
    let (audio, events) = run(&tempo, 3.0);

    assert!(events.len() >= 14);
    assert!(audio.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
    assert!(audio.iter().any(|s| s.abs() > 0.1));
}

#[test]
fn silent_volume_renders_silence() {
    let tempo = TempoConfig::new(120, Meter::ThreeFour, 0.0);
    let (audio, events) = run(&tempo, 1.0);

    assert_eq!(events.len(), 3);
    assert!(audio.iter().all(|&s| s == 0.0));
}
