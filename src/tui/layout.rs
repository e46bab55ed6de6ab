// Screen layout: panel arrangement and sizing.
//
// The console is a single full-width stack; overlays (roster, payments,
// reveal, timer) are centered modals drawn on top of the main panel:
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Main Panel (fill)                                 |
// |   login form / committee table / draw table       |
// +--------------------------------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Flex, Layout, Rect};

/// Resolved screen areas for each console zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: signed-in admin, transient notifications.
    pub status_bar: Rect,
    /// Everything between the bars: the active screen.
    pub main: Rect,
    /// Bottom row: keyboard shortcut hints for the active screen.
    pub help_bar: Rect,
}

/// Build the console layout from the available terminal area.
pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(5),    // main panel
            Constraint::Length(1), // help bar
        ])
        .split(area);

    AppLayout {
        status_bar: vertical[0],
        main: vertical[1],
        help_bar: vertical[2],
    }
}

/// Compute a centered rectangle of the given size within `area`.
///
/// If the area is too small, the rectangle is clamped to the available space.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let clamped_width = width.min(area.width);
    let clamped_height = height.min(area.height);

    let vertical = Layout::vertical([Constraint::Length(clamped_height)])
        .flex(Flex::Center)
        .split(area);

    let horizontal = Layout::horizontal([Constraint::Length(clamped_width)])
        .flex(Flex::Center)
        .split(vertical[0]);

    horizontal[0]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
