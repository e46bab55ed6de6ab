// Modal data-entry form: create committee, add member, change password.
//
// One field per row, the focused row carries a cursor and the accent color.
// Masked fields render their value as asterisks.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::tui::layout::centered_rect;
use crate::tui::{FormField, FormKind, FormState};

const FORM_WIDTH: u16 = 52;

pub fn render(frame: &mut Frame, area: Rect, form: &FormState) {
    let height = form.fields.len() as u16 + 4;
    let popup = centered_rect(FORM_WIDTH, height, area);
    frame.render_widget(Clear, popup);

    let mut lines: Vec<Line> = Vec::with_capacity(form.fields.len() + 2);
    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focus;
        let cursor = if focused { "_" } else { "" };
        let style = if focused {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!(" {:<16}{}{}", label(field), display_value(field), cursor),
            style,
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " Tab:Next field  Enter:Submit  Esc:Close",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title(form.kind));
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

pub fn title(kind: FormKind) -> &'static str {
    match kind {
        FormKind::NewCommittee => " New committee ",
        FormKind::NewMember => " Add member ",
        FormKind::ChangePassword => " Change password ",
    }
}

/// Field label, starred when the field is required.
pub fn label(field: &FormField) -> String {
    if field.required {
        format!("{}*", field.label)
    } else {
        field.label.to_string()
    }
}

/// Field value as rendered; masked fields show asterisks.
pub fn display_value(field: &FormField) -> String {
    if field.masked {
        "*".repeat(field.value.chars().count())
    } else {
        field.value.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
