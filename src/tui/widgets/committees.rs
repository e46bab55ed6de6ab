// Committee list widget: one row per rotating-savings group.
//
// Each: name, monthly amount, members, months, start date, status.
// The cursor row is highlighted; ACTIVE committees are green.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use ratatui::Frame;

use crate::format;
use crate::tui::ViewState;

/// Render the committee table into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    if state.committees.is_empty() {
        let paragraph = Paragraph::new("  No committees yet. Press r to refresh.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("Committees"));
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from("Name"),
        Cell::from("Amount"),
        Cell::from("Members"),
        Cell::from("Months"),
        Cell::from("Starts"),
        Cell::from("Status"),
    ])
    .style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = state
        .committees
        .iter()
        .enumerate()
        .map(|(i, committee)| {
            let style = if i == state.committee_cursor {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(committee.name.clone()),
                Cell::from(amount_cell(committee.amount)),
                Cell::from(count_cell(committee.max_members)),
                Cell::from(count_cell(committee.no_of_months)),
                Cell::from(format::draw_date(committee.start_date.as_deref())),
                Cell::from(committee.status.clone())
                    .style(Style::default().fg(status_color(&committee.status))),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Min(18),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(12),
        Constraint::Length(10),
    ];

    let title = format!("Committees ({})", state.committees.len());
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, area);
}

/// Format an optional amount for a table cell.
pub fn amount_cell(amount: Option<f64>) -> String {
    match amount {
        Some(a) => format!("{a:.0}"),
        None => "—".to_string(),
    }
}

/// Format an optional count for a table cell.
pub fn count_cell(count: Option<i64>) -> String {
    match count {
        Some(c) => c.to_string(),
        None => "—".to_string(),
    }
}

/// ACTIVE green, everything else gray.
pub fn status_color(status: &str) -> Color {
    if status.eq_ignore_ascii_case("active") {
        Color::Green
    } else {
        Color::DarkGray
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Committee;

    fn committee(id: i64, name: &str, status: &str) -> Committee {
        Committee {
            id,
            name: name.to_string(),
            amount: Some(1000.0),
            max_members: Some(12),
            no_of_months: Some(12),
            fine_amount: None,
            extra_days_for_fine: None,
            start_date: Some("2026-09-01".to_string()),
            created_at: None,
            status: status.to_string(),
        }
    }

    #[test]
    fn amount_cell_formats() {
        assert_eq!(amount_cell(Some(1500.0)), "1500");
        assert_eq!(amount_cell(None), "—");
    }

    #[test]
    fn count_cell_formats() {
        assert_eq!(count_cell(Some(12)), "12");
        assert_eq!(count_cell(None), "—");
    }

    #[test]
    fn status_color_cases() {
        assert_eq!(status_color("ACTIVE"), Color::Green);
        assert_eq!(status_color("active"), Color::Green);
        assert_eq!(status_color("INACTIVE"), Color::DarkGray);
        assert_eq!(status_color("CLOSED"), Color::DarkGray);
    }

    #[test]
    fn render_does_not_panic_empty() {
        let backend = ratatui::backend::TestBackend::new(80, 20);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }

    #[test]
    fn render_does_not_panic_with_rows() {
        let backend = ratatui::backend::TestBackend::new(80, 20);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let mut state = ViewState::default();
        state.committees = vec![
            committee(1, "Diwali fund", "ACTIVE"),
            committee(2, "Office pool", "INACTIVE"),
        ];
        state.committee_cursor = 1;
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }
}
