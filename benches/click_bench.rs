//! Benchmarks for the realtime half of the metronome.
//!
//! Run with: cargo bench
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 512 samples = 10.67ms deadline

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use saavy_metronome::{
    backend::BeatSink,
    clock::{AudioClock, FrameClock},
    render::{click_channel, ClickRenderer, EVENT_QUEUE_SIZE},
    scheduler::LookaheadScheduler,
    synth::{synthesize, BeatEvent},
    tempo::TempoConfig,
    visual::visual_queue,
};

/// Common buffer sizes used in audio applications.
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

fn bench_renderer(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/click");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // No voices, just the queue check and clear
        let (_tx, rx) = click_channel(EVENT_QUEUE_SIZE);
        let mut renderer = ClickRenderer::new(rx, FrameClock::new(48_000.0));
        group.bench_with_input(BenchmarkId::new("idle", size), &size, |b, _| {
            b.iter(|| renderer.process(black_box(&mut buffer)))
        });

        // Downbeat plus click overlapping, retriggered whenever they finish
        let (mut tx, rx) = click_channel(EVENT_QUEUE_SIZE);
        let clock = FrameClock::new(48_000.0);
        let mut renderer = ClickRenderer::new(rx, clock.clone());
        group.bench_with_input(BenchmarkId::new("sounding", size), &size, |b, _| {
            b.iter(|| {
                if renderer.active_voices() == 0 {
                    let now = clock.now();
                    tx.schedule(synthesize(0, now, 0.7));
                    tx.schedule(synthesize(1, now + 0.01, 0.7));
                }
                renderer.process(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}

/// Sink that drops everything, so only scheduling is measured.
struct Discard;

impl BeatSink for Discard {
    fn schedule(&mut self, event: BeatEvent) {
        black_box(event);
    }
}

fn bench_scheduler(c: &mut Criterion) {
    let tempo = TempoConfig::new(300, Default::default(), 0.7);

    c.bench_function("scheduler/poll", |b| {
        let (mut visual_tx, mut visual_rx) = visual_queue(EVENT_QUEUE_SIZE);
        let mut scheduler = LookaheadScheduler::new(0.0, 0.05, 0.1);
        let mut now = 0.0;
        b.iter(|| {
            now += 0.025;
            scheduler.poll(black_box(now), &tempo, &mut Discard, &mut visual_tx);
            while visual_rx.pop_due(f64::INFINITY).is_some() {}
        })
    });
}

criterion_group!(benches, bench_renderer, bench_scheduler);
criterion_main!(benches);
