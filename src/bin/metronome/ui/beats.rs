//! Beat row widget - speaker cone plus one LED per beat of the measure

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use saavy_metronome::meter::Meter;

use super::state::PulseBoard;

const SPEAKER_WIDTH: u16 = 11;

/// Render the speaker and LED row
pub fn render_beats(frame: &mut Frame, area: Rect, meter: Meter, board: &PulseBoard) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SPEAKER_WIDTH), Constraint::Min(10)])
        .split(area);

    let speaker_style = if board.speaker_active() {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let cone = if board.speaker_active() { "(( ● ))" } else { "( ● )" };
    let speaker = Paragraph::new(cone)
        .alignment(Alignment::Center)
        .style(speaker_style)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(speaker, chunks[0]);

    let beats = meter.beats_per_measure() as u32;
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints((0..beats).map(|_| Constraint::Ratio(1, beats)))
        .split(chunks[1]);

    for (i, cell) in cells.iter().enumerate() {
        // Downbeat glows amber, the rest red
        let (on, off) = if i == 0 {
            (Color::Yellow, Color::Rgb(120, 53, 15))
        } else {
            (Color::Red, Color::Rgb(127, 29, 29))
        };
        let bg = if board.is_lit(i) { on } else { off };

        let led = Paragraph::new(format!("{}", i + 1))
            .alignment(Alignment::Center)
            .style(Style::default().bg(bg).fg(Color::Black))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(led, *cell);
    }
}
