//! TUI module for the metronome
//!
//! Draws the transport and beat LEDs and turns key presses into transport
//! commands. Beat feedback arrives from the visual loop through a
//! [`PulseBoard`]; everything else is read from the transport each frame.

mod beats;
pub mod state;
mod transport;

use std::sync::Arc;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};

use saavy_metronome::transport::Transport;

pub use state::{BoardListener, PulseBoard};

use super::audio::CpalBackend;
use beats::render_beats;
use transport::render_transport;

const VOLUME_STEP: f32 = 0.1;

/// UI application state
pub struct UiApp {
    transport: Transport<CpalBackend, BoardListener>,
    board: Arc<PulseBoard>,
    /// Reference point for tap timestamps
    started_at: Instant,
    /// Last error to show in the transport bar
    message: Option<String>,
    should_quit: bool,
}

impl UiApp {
    pub fn new(transport: Transport<CpalBackend, BoardListener>, board: Arc<PulseBoard>) -> Self {
        Self {
            transport,
            board,
            started_at: Instant::now(),
            message: None,
            should_quit: false,
        }
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            terminal.draw(|frame| self.render(frame))?;

            // Handle keyboard input (non-blocking, ~60fps)
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        self.transport.stop();
        Ok(())
    }

    /// Handle keyboard input
    fn handle_key(&mut self, key: KeyCode) {
        let tempo = Arc::clone(self.transport.tempo());
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char(' ') => match self.transport.toggle() {
                Ok(_) => self.message = None,
                Err(err) => self.message = Some(format!("could not start: {err}")),
            },
            KeyCode::Char('t') | KeyCode::Char('T') => {
                self.transport.tap(self.started_at.elapsed());
            }
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Right => {
                tempo.nudge_bpm(1);
            }
            KeyCode::Char('-') | KeyCode::Left => {
                tempo.nudge_bpm(-1);
            }
            KeyCode::Up => {
                tempo.set_volume(tempo.volume() + VOLUME_STEP);
            }
            KeyCode::Down => {
                tempo.set_volume(tempo.volume() - VOLUME_STEP);
            }
            KeyCode::Char('m') | KeyCode::Char('M') => {
                tempo.set_meter(tempo.meter().next());
            }
            _ => {}
        }
    }

    /// Render the UI
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let status = self.transport.status();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Transport bar
                Constraint::Length(5), // Speaker + LEDs
                Constraint::Min(0),
                Constraint::Length(1), // Help bar
            ])
            .split(area);

        render_transport(
            frame,
            chunks[0],
            &status,
            self.transport.backend().sample_rate(),
            self.message.as_deref(),
        );
        render_beats(frame, chunks[1], status.tempo.meter, &self.board);

        let help = Paragraph::new(
            " [Space] Start/Stop  [T] Tap  [+/-] BPM  [Up/Down] Volume  [M] Meter  [Q] Quit",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }
}
