// Member roster overlay: the opened committee's enrolled members.
//
// Members who already won a cycle are dimmed; they are excluded from
// future lotteries.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use ratatui::Frame;

use crate::api::types::Candidate;
use crate::tui::layout::centered_rect;
use crate::tui::ViewState;

const OVERLAY_WIDTH: u16 = 64;

/// Render the member roster as a centered overlay.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let height = overlay_height(state.members.len(), area.height);
    let overlay = centered_rect(OVERLAY_WIDTH, height, area);
    frame.render_widget(Clear, overlay);

    let title = format!(" Members ({}) ", state.members.len());
    if state.members.is_empty() {
        let paragraph = Paragraph::new("  No members enrolled.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(paragraph, overlay);
        return;
    }

    let header = Row::new(vec![
        Cell::from("Name"),
        Cell::from("Phone"),
        Cell::from("Won"),
    ])
    .style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = state
        .members
        .iter()
        .enumerate()
        .map(|(i, member)| {
            let mut style = if i == state.member_cursor {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            if member.is_draw_completed {
                style = style.fg(Color::DarkGray);
            }
            Row::new(vec![
                Cell::from(member.display_name().to_string()),
                Cell::from(member.phone.clone().unwrap_or_else(|| "—".to_string())),
                Cell::from(won_marker(member)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Min(20),
        Constraint::Length(14),
        Constraint::Length(4),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, overlay);
}

/// Checkmark for members who already won a cycle.
pub fn won_marker(member: &Candidate) -> &'static str {
    if member.is_draw_completed {
        "✓"
    } else {
        ""
    }
}

/// Rows plus border and header, clamped to the screen.
pub fn overlay_height(rows: usize, available: u16) -> u16 {
    let wanted = (rows as u16).saturating_add(4).max(5);
    wanted.min(available)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
