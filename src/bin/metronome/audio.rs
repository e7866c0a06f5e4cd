//! cpal output backend
//!
//! The device and its format are resolved up front; the stream itself is
//! only built on the first start and is kept playing from then on, so a
//! stop never cuts off a click that is already sounding.
//!
//! If the stream reports an error (device unplugged, server gone) the
//! backend counts as suspended again. The next start drops the dead stream,
//! gets the renderer back from its callback and opens a new one, or fails
//! and leaves the transport stopped.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};

use saavy_metronome::{
    backend::AudioBackend,
    clock::FrameClock,
    render::{click_channel, ClickRenderer, EVENT_QUEUE_SIZE},
    synth::BeatEvent,
    MetronomeError, MAX_BLOCK_SIZE,
};

/// Renderer on loan to a stream callback. Goes back home when the callback
/// is dropped along with its stream.
struct LoanedRenderer {
    renderer: Option<ClickRenderer>,
    home: Producer<ClickRenderer>,
}

impl LoanedRenderer {
    fn process(&mut self, out: &mut [f32]) {
        match &mut self.renderer {
            Some(renderer) => renderer.process(out),
            None => out.fill(0.0),
        }
    }
}

impl Drop for LoanedRenderer {
    fn drop(&mut self) {
        if let Some(renderer) = self.renderer.take() {
            // Slot of one, filled at most once
            let _ = self.home.push(renderer);
        }
    }
}

pub struct CpalBackend {
    device: cpal::Device,
    config: cpal::StreamConfig,
    clock: FrameClock,
    /// Renderer not currently owned by a stream
    renderer: Option<ClickRenderer>,
    /// Where the current stream's callback returns the renderer
    returned: Consumer<ClickRenderer>,
    sink: Option<Producer<BeatEvent>>,
    stream: Option<cpal::Stream>,
    /// Set by the stream's error callback
    failed: Arc<AtomicBool>,
}

impl CpalBackend {
    pub fn new() -> Result<Self, MetronomeError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            MetronomeError::BackendUnavailable("no default output device available".into())
        })?;
        let config: cpal::StreamConfig = device
            .default_output_config()
            .map_err(|err| MetronomeError::BackendUnavailable(err.to_string()))?
            .into();

        let clock = FrameClock::new(config.sample_rate.0 as f32);
        let (tx, rx) = click_channel(EVENT_QUEUE_SIZE);
        let (_, returned) = RingBuffer::new(1);

        Ok(Self {
            device,
            config,
            renderer: Some(ClickRenderer::new(rx, clock.clone())),
            returned,
            clock,
            sink: Some(tx),
            stream: None,
            failed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    fn build_stream(&mut self) -> Result<cpal::Stream, MetronomeError> {
        let renderer = self
            .renderer
            .take()
            .or_else(|| self.returned.pop().ok())
            .ok_or_else(|| {
                MetronomeError::Stream("click renderer still held by the old stream".into())
            })?;
        let (home, returned) = RingBuffer::new(1);
        self.returned = returned;
        let mut loaned = LoanedRenderer {
            renderer: Some(renderer),
            home,
        };

        let channels = self.config.channels as usize;
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];
        let failed = Arc::clone(&self.failed);

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _| {
                    let total_frames = data.len() / channels;
                    let mut frames_written = 0;

                    while frames_written < total_frames {
                        let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                        let block = &mut render_buf[..frames];
                        loaned.process(block);

                        // Mono to all channels
                        let out_off = frames_written * channels;
                        for (i, &s) in block.iter().enumerate() {
                            for ch in 0..channels {
                                data[out_off + i * channels + ch] = s;
                            }
                        }

                        frames_written += frames;
                    }
                },
                move |err| {
                    log::error!("audio stream error: {err}");
                    failed.store(true, Ordering::Release);
                },
                None,
            )
            .map_err(|err| MetronomeError::Stream(err.to_string()))
    }
}

impl AudioBackend for CpalBackend {
    type Clock = FrameClock;
    type Sink = Producer<BeatEvent>;

    fn resume(&mut self) -> Result<(), MetronomeError> {
        if self.failed.swap(false, Ordering::AcqRel) {
            log::warn!("audio stream failed, reopening output");
            self.stream = None;
            if let Some(device) = cpal::default_host().default_output_device() {
                self.device = device;
            }
        }

        if let Some(stream) = &self.stream {
            return stream
                .play()
                .map_err(|err| MetronomeError::ResumeFailed(err.to_string()));
        }

        let stream = self.build_stream()?;
        stream
            .play()
            .map_err(|err| MetronomeError::ResumeFailed(err.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        self.stream.is_none() || self.failed.load(Ordering::Acquire)
    }

    fn clock(&self) -> FrameClock {
        self.clock.clone()
    }

    fn take_sink(&mut self) -> Option<Producer<BeatEvent>> {
        self.sink.take()
    }
}
