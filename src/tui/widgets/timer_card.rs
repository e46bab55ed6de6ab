// Countdown overlay: the spoken draw timer's mm:ss clock.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::committee::TimerPhase;
use crate::format;
use crate::tui::layout::centered_rect;
use crate::tui::TimerCard;

const OVERLAY_WIDTH: u16 = 26;
const OVERLAY_HEIGHT: u16 = 7;

/// Render the countdown overlay centered in the given area.
pub fn render(frame: &mut Frame, area: Rect, timer: &TimerCard) {
    let overlay = centered_rect(OVERLAY_WIDTH, OVERLAY_HEIGHT, area);
    frame.render_widget(Clear, overlay);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(phase_color(timer.phase)))
        .title(Span::styled(
            " Draw timer ",
            Style::default()
                .fg(phase_color(timer.phase))
                .add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let (minutes, seconds) = format::clock_digits(timer.remaining);
    let clock = Paragraph::new(Line::from(Span::styled(
        format!("{minutes} : {seconds}"),
        Style::default()
            .fg(phase_color(timer.phase))
            .add_modifier(Modifier::BOLD),
    )))
    .centered();
    frame.render_widget(clock, rows[1]);

    let label = Paragraph::new(Line::from(Span::styled(
        phase_label(timer.phase).to_string(),
        Style::default().fg(Color::DarkGray),
    )))
    .centered();
    frame.render_widget(label, rows[2]);

    let hint = Paragraph::new(Line::from(Span::styled(
        " s: restart   Esc: stop",
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(hint, rows[3]);
}

pub fn phase_color(phase: TimerPhase) -> Color {
    match phase {
        TimerPhase::Running => Color::Cyan,
        TimerPhase::Expired => Color::Red,
        TimerPhase::Stopped => Color::DarkGray,
    }
}

pub fn phase_label(phase: TimerPhase) -> &'static str {
    match phase {
        TimerPhase::Running => "counting down",
        TimerPhase::Expired => "time is up",
        TimerPhase::Stopped => "stopped",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
