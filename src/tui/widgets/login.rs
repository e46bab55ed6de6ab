// Login form widget: centered phone/password form.
//
// Rendered as the whole main panel when nobody is signed in. The focused
// field gets a highlighted border; the password is masked.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::tui::layout::centered_rect;
use crate::tui::{LoginField, ViewState};

const FORM_WIDTH: u16 = 44;
const FORM_HEIGHT: u16 = 10;

/// Render the login form centered in the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let form_area = centered_rect(FORM_WIDTH, FORM_HEIGHT, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            " Sign in ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    // phone(3) | password(3) | hint(1)
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(inner);

    render_field(
        frame,
        rows[0],
        "Phone",
        &state.login_phone,
        state.login_focus == LoginField::Phone,
    );
    render_field(
        frame,
        rows[1],
        "Password",
        &mask(&state.login_password),
        state.login_focus == LoginField::Password,
    );

    let hint = Paragraph::new(Line::from(Span::styled(
        " Tab: switch field   Enter: sign in",
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(hint, rows[2]);
}

fn render_field(frame: &mut Frame, area: Rect, label: &str, value: &str, focused: bool) {
    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let cursor = if focused { "_" } else { "" };
    let paragraph = Paragraph::new(format!("{value}{cursor}")).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(label.to_string()),
    );
    frame.render_widget(paragraph, area);
}

/// Replace every character with a mask dot.
pub fn mask(value: &str) -> String {
    "*".repeat(value.chars().count())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
