//! metronome - terminal metronome
//!
//! Run with: cargo run -- --bpm 120 --beats 4

mod audio;
mod ui;

use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};

use audio::CpalBackend;
use saavy_metronome::{
    meter::Meter,
    tempo::{TempoConfig, DEFAULT_BPM, DEFAULT_VOLUME, MAX_BPM, MIN_BPM},
    transport::Transport,
};
use ui::{BoardListener, PulseBoard, UiApp};

#[derive(Parser, Debug)]
#[command(name = "metronome", version, about = "Drift-free terminal metronome")]
struct Args {
    /// Tempo in beats per minute
    #[arg(long, default_value_t = DEFAULT_BPM,
          value_parser = clap::value_parser!(u32).range(MIN_BPM as i64..=MAX_BPM as i64))]
    bpm: u32,

    /// Beats per measure (3, 4, 5 or 6)
    #[arg(long, default_value_t = 4)]
    beats: u8,

    /// Click volume, 0.0 to 1.0
    #[arg(long, default_value_t = DEFAULT_VOLUME)]
    volume: f32,
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let meter = Meter::from_beats(args.beats).wrap_err("invalid --beats")?;
    let tempo = Arc::new(TempoConfig::new(args.bpm, meter, args.volume));

    // The device is looked up now but only opened on the first start
    let backend = CpalBackend::new().wrap_err("failed to set up audio output")?;
    log::info!(
        "output ready: {} Hz, {} channels",
        backend.sample_rate(),
        backend.channels()
    );

    let board = Arc::new(PulseBoard::new());
    let transport = Transport::new(backend, tempo, BoardListener::new(Arc::clone(&board)));

    let mut terminal = ratatui::init();
    let result = UiApp::new(transport, board).run(&mut terminal);
    ratatui::restore();
    result
}
