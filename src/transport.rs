//! Transport - play/stop control over the scheduler and visual loops.
//!
//! A running session is two threads sharing nothing but the tempo settings,
//! the audio clock and one SPSC ring:
//!
//! ```text
//!   scheduler thread (~25ms)                 visual thread (~16ms)
//!   poll(clock.now()) ──▶ BeatSink (audio)
//!                     └─▶ visual ring ──────▶ frame(clock.now()) ──▶ BeatListener
//! ```
//!
//! Start opens or resumes the output and spawns both loops idle. Only then
//! does it run the first poll and the first frame on the calling thread and
//! hand each loop its state, so a failed spawn leaves the sink and the
//! listener with the transport. Stop flags the
//! session, wakes both threads and joins them; the sink and the listener come
//! back to the transport for the next session, and whatever was still queued
//! for display is dropped with the ring. Beats already handed to the audio
//! output play out.

use std::{
    io,
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use rtrb::{Producer, RingBuffer};

use crate::{
    backend::AudioBackend,
    clock::AudioClock,
    error::MetronomeError,
    scheduler::{LookaheadScheduler, SchedulerConfig},
    tap::TapTempo,
    tempo::{TempoConfig, TempoSnapshot},
    visual::{visual_queue, BeatListener, VisualEvent, VisualLoop, VisualProducer},
};

const NO_BEAT: u8 = u8::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Running,
}

/// Everything the UI needs to draw the transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportStatus {
    pub state: TransportState,
    pub tempo: TempoSnapshot,
    /// Last beat shown by the visual loop in this session
    pub current_beat: Option<u8>,
}

/// Forwards visual events and remembers the last beat shown.
struct StatusListener<L> {
    inner: L,
    current_beat: Arc<AtomicU8>,
}

impl<L: BeatListener> BeatListener for StatusListener<L> {
    fn on_visual(&mut self, event: VisualEvent) {
        if let VisualEvent::Pulse { beat_index } = event {
            self.current_beat.store(beat_index, Ordering::Relaxed);
        }
        self.inner.on_visual(event);
    }
}

/// What the scheduler thread owns while it runs.
struct SchedulerState<S> {
    scheduler: LookaheadScheduler,
    sink: S,
    visual_tx: VisualProducer,
}

struct Session<S, L> {
    running: Arc<AtomicBool>,
    scheduler: JoinHandle<Option<SchedulerState<S>>>,
    visual: JoinHandle<Option<VisualLoop<StatusListener<L>>>>,
}

/// Spawn a loop thread that waits for its state, then calls `tick` every
/// `interval` until `running` clears.
///
/// The state goes in through the returned one-slot ring only after the
/// thread exists, so a failed spawn never swallows it. The thread hands it
/// back on join, or `None` if it was stopped before receiving any.
fn spawn_loop<T, F>(
    name: &str,
    running: &Arc<AtomicBool>,
    interval: Duration,
    mut tick: F,
) -> io::Result<(Producer<T>, JoinHandle<Option<T>>)>
where
    T: Send + 'static,
    F: FnMut(&mut T) + Send + 'static,
{
    let (tx, mut rx) = RingBuffer::new(1);
    let running = Arc::clone(running);
    let handle = thread::Builder::new()
        .name(name.into())
        .spawn(move || {
            let mut state = loop {
                if let Ok(state) = rx.pop() {
                    break state;
                }
                if !running.load(Ordering::Acquire) {
                    return None;
                }
                thread::park();
            };
            while running.load(Ordering::Acquire) {
                thread::park_timeout(interval);
                if !running.load(Ordering::Acquire) {
                    break;
                }
                tick(&mut state);
            }
            Some(state)
        })?;
    Ok((tx, handle))
}

/// Stop a loop thread and collect whatever state it holds.
fn halt<T>(running: &AtomicBool, handle: JoinHandle<Option<T>>) -> thread::Result<Option<T>> {
    running.store(false, Ordering::Release);
    handle.thread().unpark();
    handle.join()
}

/// Give a spawned loop its state and wake it.
fn hand_over<T>(mut slot: Producer<T>, handle: &JoinHandle<Option<T>>, state: T) {
    // A fresh slot of one is never full
    let _ = slot.push(state);
    handle.thread().unpark();
}

pub struct Transport<B: AudioBackend, L: BeatListener> {
    backend: B,
    tempo: Arc<TempoConfig>,
    config: SchedulerConfig,
    tap: TapTempo,
    sink: Option<B::Sink>,
    listener: Option<L>,
    current_beat: Arc<AtomicU8>,
    session: Option<Session<B::Sink, L>>,
}

impl<B: AudioBackend, L: BeatListener> Transport<B, L> {
    pub fn new(backend: B, tempo: Arc<TempoConfig>, listener: L) -> Self {
        Self {
            backend,
            tempo,
            config: SchedulerConfig::default(),
            tap: TapTempo::new(),
            sink: None,
            listener: Some(listener),
            current_beat: Arc::new(AtomicU8::new(NO_BEAT)),
            session: None,
        }
    }

    /// Replace the timing parameters. Takes effect on the next start.
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn state(&self) -> TransportState {
        if self.session.is_some() {
            TransportState::Running
        } else {
            TransportState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    pub fn tempo(&self) -> &Arc<TempoConfig> {
        &self.tempo
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn current_beat(&self) -> Option<u8> {
        match self.current_beat.load(Ordering::Relaxed) {
            NO_BEAT => None,
            beat => Some(beat),
        }
    }

    pub fn status(&self) -> TransportStatus {
        TransportStatus {
            state: self.state(),
            tempo: self.tempo.snapshot(),
            current_beat: self.current_beat(),
        }
    }

    /// Feed a tap-tempo tap. `now` is any monotonic timestamp.
    pub fn tap(&mut self, now: Duration) -> Option<u32> {
        self.tap.tap(now, &self.tempo)
    }

    /// Start a session. Does nothing if one is already running.
    ///
    /// Fails only if the output cannot be opened or resumed (or the pieces of
    /// a previous session were lost); the transport then stays stopped.
    pub fn start(&mut self) -> Result<(), MetronomeError> {
        if self.session.is_some() {
            log::debug!("start ignored, transport already running");
            return Ok(());
        }

        if self.backend.is_suspended() {
            if let Err(err) = self.backend.resume() {
                log::warn!("could not start: {err}");
                return Err(err);
            }
        }

        let mut sink = self
            .sink
            .take()
            .or_else(|| self.backend.take_sink())
            .ok_or(MetronomeError::SinkUnavailable)?;
        let Some(listener) = self.listener.take() else {
            self.sink = Some(sink);
            return Err(MetronomeError::ListenerUnavailable);
        };

        let clock = self.backend.clock();
        let config = self.config.clone();
        let running = Arc::new(AtomicBool::new(true));

        let scheduler_thread = {
            let clock = clock.clone();
            let tempo = Arc::clone(&self.tempo);
            spawn_loop(
                "metronome-scheduler",
                &running,
                config.poll_interval,
                move |state: &mut SchedulerState<B::Sink>| {
                    state.scheduler.poll(
                        clock.now(),
                        &tempo,
                        &mut state.sink,
                        &mut state.visual_tx,
                    );
                },
            )
        };
        let (scheduler_slot, scheduler_thread) = match scheduler_thread {
            Ok(spawned) => spawned,
            Err(source) => {
                self.sink = Some(sink);
                self.listener = Some(listener);
                return Err(MetronomeError::Thread {
                    name: "scheduler",
                    source,
                });
            }
        };

        let visual_thread = {
            let clock = clock.clone();
            spawn_loop(
                "metronome-visual",
                &running,
                config.frame_interval,
                move |visual: &mut VisualLoop<StatusListener<L>>| {
                    visual.frame(clock.now());
                },
            )
        };
        let (visual_slot, visual_thread) = match visual_thread {
            Ok(spawned) => spawned,
            Err(source) => {
                if halt(&running, scheduler_thread).is_err() {
                    log::error!("scheduler thread panicked before it started");
                }
                self.sink = Some(sink);
                self.listener = Some(listener);
                return Err(MetronomeError::Thread {
                    name: "visual",
                    source,
                });
            }
        };

        // Both threads exist; nothing below can fail
        let (mut visual_tx, visual_rx) = visual_queue(config.queue_capacity);
        self.current_beat.store(NO_BEAT, Ordering::Relaxed);
        let now = clock.now();
        let mut scheduler = LookaheadScheduler::new(now, config.start_offset, config.lookahead);
        scheduler.poll(now, &self.tempo, &mut sink, &mut visual_tx);

        let mut visual = VisualLoop::new(
            visual_rx,
            StatusListener {
                inner: listener,
                current_beat: Arc::clone(&self.current_beat),
            },
            &config,
        );
        visual.frame(clock.now());

        hand_over(
            scheduler_slot,
            &scheduler_thread,
            SchedulerState {
                scheduler,
                sink,
                visual_tx,
            },
        );
        hand_over(visual_slot, &visual_thread, visual);

        self.session = Some(Session {
            running,
            scheduler: scheduler_thread,
            visual: visual_thread,
        });
        log::debug!(
            "transport started at {:.3}s, {} bpm {}",
            now,
            self.tempo.bpm(),
            self.tempo.meter()
        );
        Ok(())
    }

    /// Stop the running session. Does nothing when already stopped.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        match halt(&session.running, session.scheduler) {
            Ok(Some(state)) => self.sink = Some(state.sink),
            Ok(None) => log::error!("scheduler thread exited without its state"),
            Err(_) => log::error!("scheduler thread panicked, audio sink lost"),
        }
        match halt(&session.running, session.visual) {
            Ok(Some(visual)) => self.listener = Some(visual.finish().inner),
            Ok(None) => log::error!("visual thread exited without its state"),
            Err(_) => log::error!("visual thread panicked, listener lost"),
        }

        self.current_beat.store(NO_BEAT, Ordering::Relaxed);
        log::debug!("transport stopped");
    }

    /// Start if stopped, stop if running. Returns the new state.
    pub fn toggle(&mut self) -> Result<TransportState, MetronomeError> {
        match self.state() {
            TransportState::Running => self.stop(),
            TransportState::Stopped => self.start()?,
        }
        Ok(self.state())
    }
}

impl<B: AudioBackend, L: BeatListener> Drop for Transport<B, L> {
    fn drop(&mut self) {
        self.stop();
    }
}
