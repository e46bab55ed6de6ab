// Lottery reveal overlay: the spinning name strip and the settled winner.
//
// The strip is the eligible roster repeated three times; the controller
// reports a position within that strip and this widget draws a window of
// names around it, highlight in the middle.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::committee::RevealPhase;
use crate::protocol::RevealFrame;
use crate::tui::layout::centered_rect;

const OVERLAY_WIDTH: u16 = 48;
const OVERLAY_HEIGHT: u16 = 13;

/// Rows of the strip shown at once. Odd so the highlight sits in the middle.
const WINDOW_ROWS: usize = 7;

/// Render the reveal overlay centered in the given area.
pub fn render(frame: &mut Frame, area: Rect, reveal: &RevealFrame) {
    let overlay = centered_rect(OVERLAY_WIDTH, OVERLAY_HEIGHT, area);
    frame.render_widget(Clear, overlay);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            " Lucky draw ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);

    match reveal.phase {
        RevealPhase::Requesting => {
            let paragraph = Paragraph::new("\n  Drawing...")
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(paragraph, rows[0]);
        }
        RevealPhase::Animating | RevealPhase::Settled | RevealPhase::Confirmed => {
            render_strip(frame, rows[0], reveal);
        }
        RevealPhase::Idle | RevealPhase::Cancelled => {
            let paragraph = Paragraph::new("\n  Draw cancelled.")
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(paragraph, rows[0]);
        }
    }

    let hint = Paragraph::new(Line::from(Span::styled(
        footer(reveal.phase),
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(hint, rows[1]);
}

fn render_strip(frame: &mut Frame, area: Rect, reveal: &RevealFrame) {
    if reveal.roster.is_empty() {
        return;
    }
    let Some(position) = reveal.strip_position else {
        return;
    };

    let lines: Vec<Line> = strip_window(reveal.roster.len(), position, WINDOW_ROWS)
        .into_iter()
        .enumerate()
        .map(|(row, strip_index)| {
            let candidate = &reveal.roster[strip_index % reveal.roster.len()];
            let name = candidate.display_name();
            let is_center = row == WINDOW_ROWS / 2;
            let style = if is_center && reveal.phase != RevealPhase::Animating {
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD)
            } else if is_center {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let marker = if is_center { " ➤ " } else { "   " };
            Line::from(vec![Span::raw(marker), Span::styled(name.to_string(), style)])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}

/// Strip indices for a window of `rows` names with `position` in the middle.
///
/// Indices wrap within the tripled strip so the window is always full.
pub fn strip_window(roster_len: usize, position: usize, rows: usize) -> Vec<usize> {
    let strip_len = roster_len * 3;
    let half = rows / 2;
    (0..rows)
        .map(|row| (position + strip_len + row - half) % strip_len)
        .collect()
}

/// Keyboard hint line for the current phase.
pub fn footer(phase: RevealPhase) -> &'static str {
    match phase {
        RevealPhase::Settled => " Enter: confirm winner   Esc: cancel",
        RevealPhase::Confirmed => " Winner confirmed. Esc: close",
        RevealPhase::Requesting | RevealPhase::Animating => " Esc: cancel",
        RevealPhase::Idle | RevealPhase::Cancelled => " Esc: close",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
