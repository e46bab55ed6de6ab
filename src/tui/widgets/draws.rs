// Draw schedule widget: one row per draw of the opened committee.
//
// The amount column doubles as an inline editor: while an edit is pending
// the cell shows the keystroke buffer instead of the committed value.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use ratatui::Frame;

use crate::api::types::Draw;
use crate::committee::FieldKey;
use crate::format;
use crate::tui::ViewState;

/// Render the draw table into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let name = state
        .selected_committee_row()
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "Committee".to_string());

    if state.draws.is_empty() {
        let paragraph = Paragraph::new("  No draws scheduled.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(name));
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from("Date"),
        Cell::from("Time"),
        Cell::from("Min"),
        Cell::from("Amount"),
    ])
    .style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = state
        .draws
        .iter()
        .enumerate()
        .map(|(i, draw)| {
            let style = if i == state.draw_cursor {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            let (amount, editing) = amount_cell(state, draw);
            let amount_style = if editing {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(format!("{}", i + 1)),
                Cell::from(format::draw_date(draw.date.as_deref())),
                Cell::from(format::draw_time(draw.time.as_deref())),
                Cell::from(optional_amount(draw.min_amount)),
                Cell::from(amount).style(amount_style),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Length(13),
        Constraint::Length(8),
        Constraint::Length(9),
        Constraint::Min(10),
    ];

    let title = format!("{} — draws ({})", name, state.draws.len());
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, area);
}

/// The amount column content for one draw, and whether it is being edited.
pub fn amount_cell(state: &ViewState, draw: &Draw) -> (String, bool) {
    if let Some(ref edit) = state.editing {
        if let FieldKey::DrawAmount { draw_id, .. } = edit.key {
            if draw_id == draw.id {
                return (format!("{}_", edit.buffer), true);
            }
        }
    }
    (optional_amount(draw.amount), false)
}

/// Format an optional amount for a table cell.
pub fn optional_amount(amount: Option<f64>) -> String {
    match amount {
        Some(a) if a.fract() == 0.0 => format!("{a:.0}"),
        Some(a) => format!("{a:.2}"),
        None => "—".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
