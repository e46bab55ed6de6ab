// Payment overlay: per-member payment status for one draw.
//
// The paid column is inline-editable like the draw amount; the done flag
// reflects optimistic toggles before the server confirms them.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use ratatui::Frame;

use crate::api::types::PaidRow;
use crate::committee::{FieldKey, ToggleKey};
use crate::tui::layout::centered_rect;
use crate::tui::ViewState;

const OVERLAY_WIDTH: u16 = 72;

/// Render the payment table for `draw_id` as a centered overlay.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState, draw_id: i64) {
    let height = (state.paid_rows.len() as u16).saturating_add(4).max(5).min(area.height);
    let overlay = centered_rect(OVERLAY_WIDTH, height, area);
    frame.render_widget(Clear, overlay);

    let title = format!(" Payments — draw {draw_id} ");
    if state.paid_rows.is_empty() {
        let paragraph = Paragraph::new("  No payment rows.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(paragraph, overlay);
        return;
    }

    let header = Row::new(vec![
        Cell::from("Name"),
        Cell::from("Paid"),
        Cell::from("Fine"),
        Cell::from("Total"),
        Cell::from("Done"),
    ])
    .style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = state
        .paid_rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let style = if i == state.paid_cursor {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            let (paid, editing) = paid_cell(state, draw_id, row);
            let paid_style = if editing {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let done = display_done(state, draw_id, row);
            Row::new(vec![
                Cell::from(row.name.clone().unwrap_or_else(|| "—".to_string())),
                Cell::from(paid).style(paid_style),
                Cell::from(money(row.fine_amount_paid)),
                Cell::from(format!("{:.0}", row.total_paid())),
                Cell::from(if done { "[x]" } else { "[ ]" }).style(Style::default().fg(
                    if done { Color::Green } else { Color::DarkGray },
                )),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Min(18),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(5),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, overlay);
}

/// The paid column content for one row, and whether it is being edited.
pub fn paid_cell(state: &ViewState, draw_id: i64, row: &PaidRow) -> (String, bool) {
    if let (Some(edit), Some(user_id)) = (state.editing.as_ref(), row.user_id) {
        if let FieldKey::MemberPaid {
            draw_id: edit_draw,
            user_id: edit_user,
            ..
        } = edit.key
        {
            if edit_draw == draw_id && edit_user == user_id {
                return (format!("{}_", edit.buffer), true);
            }
        }
    }
    (money(row.draw_amount_paid), false)
}

/// The done flag to display: the optimistic override when one exists,
/// otherwise the last fetched value.
pub fn display_done(state: &ViewState, draw_id: i64, row: &PaidRow) -> bool {
    row.user_id
        .and_then(|user_id| state.paid_flags.get(&ToggleKey { draw_id, user_id }))
        .copied()
        .unwrap_or(row.is_draw_completed)
}

fn money(amount: Option<f64>) -> String {
    match amount {
        Some(a) => format!("{a:.0}"),
        None => "—".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::EditCell;

    fn row(user_id: i64, paid: Option<f64>, done: bool) -> PaidRow {
        PaidRow {
            user_id: Some(user_id),
            name: Some(format!("Member {user_id}")),
            phone: None,
            draw_amount_paid: paid,
            fine_amount_paid: None,
            is_draw_completed: done,
        }
    }

    #[test]
    fn paid_cell_shows_fetched_value() {
        let mut state = ViewState::default();
        state.paid_rows = vec![row(7, Some(900.0), false)];
        let (text, editing) = paid_cell(&state, 4, &state.paid_rows[0]);
        assert_eq!(text, "900");
        assert!(!editing);
    }

    #[test]
    fn paid_cell_shows_edit_buffer() {
        let mut state = ViewState::default();
        state.paid_rows = vec![row(7, Some(900.0), false)];
        state.editing = Some(EditCell {
            key: FieldKey::MemberPaid {
                committee_id: 1,
                draw_id: 4,
                user_id: 7,
            },
            buffer: "1000".to_string(),
        });
        let (text, editing) = paid_cell(&state, 4, &state.paid_rows[0]);
        assert_eq!(text, "1000_");
        assert!(editing);

        // Same user under a different draw is untouched.
        let (other, other_editing) = paid_cell(&state, 5, &state.paid_rows[0]);
        assert_eq!(other, "900");
        assert!(!other_editing);
    }

    #[test]
    fn display_done_prefers_optimistic_override() {
        let mut state = ViewState::default();
        let r = row(7, None, false);
        assert!(!display_done(&state, 4, &r));
        state
            .paid_flags
            .insert(ToggleKey { draw_id: 4, user_id: 7 }, true);
        assert!(display_done(&state, 4, &r));
        // Other draws fall back to the fetched value.
        assert!(!display_done(&state, 5, &r));
    }

    #[test]
    fn render_does_not_panic() {
        let backend = ratatui::backend::TestBackend::new(90, 24);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let mut state = ViewState::default();
        state.paid_rows = vec![row(1, Some(500.0), true), row(2, None, false)];
        terminal
            .draw(|frame| render(frame, frame.area(), &state, 4))
            .unwrap();
    }

    #[test]
    fn render_does_not_panic_empty() {
        let backend = ratatui::backend::TestBackend::new(90, 24);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &state, 4))
            .unwrap();
    }
}
