//! Transport bar widget - shows BPM, play state, meter, volume and beat

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use saavy_metronome::transport::{TransportState, TransportStatus};

/// Render the transport bar
pub fn render_transport(
    frame: &mut Frame,
    area: Rect,
    status: &TransportStatus,
    sample_rate: u32,
    message: Option<&str>,
) {
    let block = Block::default()
        .title(" metronome ")
        .borders(Borders::ALL);

    let running = status.state == TransportState::Running;
    let (play_symbol, play_state_str) = if running {
        ("▶", "Running")
    } else {
        ("■", "Stopped")
    };

    let beat = match status.current_beat {
        Some(beat) => format!("{}", beat + 1),
        None => "-".to_string(),
    };

    let mut spans = vec![
        Span::styled(
            format!(" BPM: {:03}  ", status.tempo.bpm),
            Style::default().fg(Color::Red),
        ),
        Span::styled(
            format!("{} {}  ", play_symbol, play_state_str),
            Style::default().fg(if running { Color::Green } else { Color::Yellow }),
        ),
        Span::styled(
            format!("{}  Beat {}  ", status.tempo.meter, beat),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Vol: {:.1}  ", status.tempo.volume),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(
            format!("{:.1}kHz", sample_rate as f32 / 1000.0),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    if let Some(message) = message {
        spans.push(Span::styled(
            format!("  {message}"),
            Style::default().fg(Color::LightRed),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}
