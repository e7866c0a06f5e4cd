use std::sync::{mpsc, Arc};
use std::time::Duration;

use rtrb::Producer;
use saavy_metronome::{
    backend::AudioBackend,
    clock::FrameClock,
    meter::Meter,
    render::{click_channel, ClickRenderer, EVENT_QUEUE_SIZE},
    synth::BeatEvent,
    tempo::TempoConfig,
    transport::{Transport, TransportState},
    visual::VisualEvent,
    MetronomeError,
};

const SAMPLE_RATE: f32 = 48_000.0;

/// Device stand-in: the test drives the renderer instead of an audio callback.
struct OfflineBackend {
    clock: FrameClock,
    sink: Option<Producer<BeatEvent>>,
    opened: bool,
}

impl OfflineBackend {
    fn new() -> (Self, ClickRenderer) {
        let clock = FrameClock::new(SAMPLE_RATE);
        let (tx, rx) = click_channel(EVENT_QUEUE_SIZE);
        let renderer = ClickRenderer::new(rx, clock.clone());
        let backend = Self {
            clock,
            sink: Some(tx),
            opened: false,
        };
        (backend, renderer)
    }
}

impl AudioBackend for OfflineBackend {
    type Clock = FrameClock;
    type Sink = Producer<BeatEvent>;

    fn resume(&mut self) -> Result<(), MetronomeError> {
        self.opened = true;
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        !self.opened
    }

    fn clock(&self) -> FrameClock {
        self.clock.clone()
    }

    fn take_sink(&mut self) -> Option<Producer<BeatEvent>> {
        self.sink.take()
    }
}

fn render(renderer: &mut ClickRenderer, frames: usize) -> Vec<f32> {
    let mut audio = vec![0.0; frames];
    for block in audio.chunks_mut(480) {
        renderer.process(block);
    }
    audio
}

#[test]
fn first_downbeat_sounds_fifty_ms_after_start() {
    let (backend, mut renderer) = OfflineBackend::new();
    let tempo = Arc::new(TempoConfig::new(120, Meter::FourFour, 0.7));
    let mut transport = Transport::new(backend, tempo, |_: VisualEvent| {});

    transport.start().unwrap();
    assert!(transport.backend().opened);

    let audio = render(&mut renderer, 4_800);
    let onset = audio.iter().position(|&s| s != 0.0);
    assert_eq!(onset, Some(2_401));

    transport.stop();
    assert_eq!(transport.state(), TransportState::Stopped);
}

#[test]
fn session_can_be_restarted_with_the_same_output() {
    let (backend, mut renderer) = OfflineBackend::new();
    let tempo = Arc::new(TempoConfig::default());
    let mut transport = Transport::new(backend, tempo, |_: VisualEvent| {});

    transport.start().unwrap();
    transport.stop();
    render(&mut renderer, 48_000);

    // One second in, the next session starts a new measure at 1.05s
    transport.start().unwrap();
    let audio = render(&mut renderer, 4_800);
    assert_eq!(audio.iter().position(|&s| s != 0.0), Some(2_401));
    assert_eq!(transport.state(), TransportState::Running);
}

#[test]
fn visual_pulse_follows_the_rendered_audio() {
    let (backend, mut renderer) = OfflineBackend::new();
    let (tx, rx) = mpsc::channel();
    let tempo = Arc::new(TempoConfig::new(90, Meter::ThreeFour, 0.5));
    let mut transport = Transport::new(backend, tempo, move |event: VisualEvent| {
        let _ = tx.send(event);
    });

    transport.start().unwrap();
    assert!(rx.try_recv().is_err());

    render(&mut renderer, 2_400);
    let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(event, VisualEvent::Pulse { beat_index: 0 });

    transport.stop();
    let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(event, VisualEvent::Clear { beat_index: 0 });
}

#[test]
fn dropping_a_running_transport_stops_it() {
    let (backend, _renderer) = OfflineBackend::new();
    let (tx, rx) = mpsc::channel();
    let mut transport = Transport::new(
        backend,
        Arc::new(TempoConfig::default()),
        move |event: VisualEvent| {
            let _ = tx.send(event);
        },
    );

    transport.start().unwrap();
    drop(transport);

    // Listener went down with the visual thread
    while rx.recv_timeout(Duration::from_secs(2)).is_ok() {}
    assert!(matches!(
        rx.recv_timeout(Duration::from_millis(10)),
        Err(mpsc::RecvTimeoutError::Disconnected)
    ));
}
