// Status bar widget: signed-in admin and transient notifications.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::protocol::{Notification, NotificationKind};
use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [app name] [signed-in admin] [notification]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = vec![Span::styled(
        " samiti ",
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];

    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        admin_label(state),
        Style::default().fg(Color::White),
    ));

    if let Some(ref notification) = state.notification {
        spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
        spans.push(Span::styled(
            notification_text(notification),
            Style::default()
                .fg(notification_color(notification.kind))
                .add_modifier(Modifier::BOLD),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Who is signed in, or a prompt when nobody is.
pub fn admin_label(state: &ViewState) -> String {
    match state.profile {
        Some(ref profile) => {
            let name = profile.name.as_deref().unwrap_or("admin");
            match profile.phone {
                Some(ref phone) => format!("{name} ({phone})"),
                None => name.to_string(),
            }
        }
        None => "not signed in".to_string(),
    }
}

/// Flatten a notification into a single status line segment.
pub fn notification_text(notification: &Notification) -> String {
    if notification.body.is_empty() {
        notification.title.clone()
    } else {
        format!("{}: {}", notification.title, notification.body)
    }
}

/// Color for each notification kind.
pub fn notification_color(kind: NotificationKind) -> Color {
    match kind {
        NotificationKind::Info => Color::Cyan,
        NotificationKind::Success => Color::Green,
        NotificationKind::Error => Color::Red,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
