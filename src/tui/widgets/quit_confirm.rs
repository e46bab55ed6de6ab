// Quit confirmation overlay widget.
//
// Renders a centered modal dialog asking the user to confirm quitting.
// Displayed on top of the main layout when `ViewState::confirm_quit` is true.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::tui::layout::centered_rect;

const DIALOG_WIDTH: u16 = 28;
const DIALOG_HEIGHT: u16 = 5;

/// Render the quit confirmation overlay centered on the screen.
pub fn render(frame: &mut Frame, area: Rect) {
    let dialog_area = centered_rect(DIALOG_WIDTH, DIALOG_HEIGHT, area);

    // Clear the area behind the dialog so it renders cleanly on top
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            " Quit? ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));

    let text = Line::from(vec![
        Span::raw("  Really quit? ("),
        Span::styled("y", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw("/"),
        Span::styled("n", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        Span::raw(")"),
    ]);

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().bg(Color::Black));

    frame.render_widget(paragraph, dialog_area);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
