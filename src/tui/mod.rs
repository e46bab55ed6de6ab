// TUI console: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors relevant parts of the application
// state. The app orchestrator pushes `UiUpdate` messages over an mpsc channel;
// the TUI applies them to `ViewState` and re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::collections::HashMap;
use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;

use crate::api::types::{Candidate, Committee, Draw, PaidRow, Profile};
use crate::committee::{FieldKey, TimerPhase, ToggleKey};
use crate::protocol::{Notification, RevealFrame, UiUpdate, UserCommand};

use layout::build_layout;

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// Which full-screen view is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Committees,
    Detail,
}

/// Modal drawn on top of the active screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Members,
    PaidRows { draw_id: i64 },
    Reveal,
    Timer,
    /// Data-entry form; its content lives in `ViewState::form`.
    Form,
}

/// Which modal data-entry form is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    NewCommittee,
    NewMember,
    ChangePassword,
}

/// One text field of a modal form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub label: &'static str,
    pub value: String,
    /// Render as asterisks.
    pub masked: bool,
    /// Submit is refused while empty.
    pub required: bool,
}

impl FormField {
    fn new(label: &'static str, required: bool) -> Self {
        FormField {
            label,
            value: String::new(),
            masked: false,
            required,
        }
    }

    fn secret(label: &'static str, required: bool) -> Self {
        FormField {
            label,
            value: String::new(),
            masked: true,
            required,
        }
    }
}

/// A modal data-entry form and its focus position.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub kind: FormKind,
    pub fields: Vec<FormField>,
    pub focus: usize,
}

impl FormState {
    pub fn new_committee() -> Self {
        FormState {
            kind: FormKind::NewCommittee,
            fields: vec![
                FormField::new("Name", true),
                FormField::new("Monthly amount", true),
                FormField::new("Max members", true),
                FormField::new("Months", true),
                FormField::new("Fine amount", false),
                FormField::new("Start date", false),
            ],
            focus: 0,
        }
    }

    pub fn new_member() -> Self {
        FormState {
            kind: FormKind::NewMember,
            fields: vec![
                FormField::new("Name", true),
                FormField::new("Phone", true),
                FormField::new("Email", false),
                FormField::secret("Password", false),
            ],
            focus: 0,
        }
    }

    pub fn change_password() -> Self {
        FormState {
            kind: FormKind::ChangePassword,
            fields: vec![
                FormField::secret("Old password", true),
                FormField::secret("New password", true),
            ],
            focus: 0,
        }
    }

    /// Trimmed value of one field.
    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.trim()).unwrap_or("")
    }
}

/// Which login form field has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Phone,
    Password,
}

/// An inline amount edit in progress: the field and its keystroke buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct EditCell {
    pub key: FieldKey,
    pub buffer: String,
}

/// The countdown state last pushed by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerCard {
    pub phase: TimerPhase,
    pub remaining: u32,
    pub total: u32,
}

/// TUI-local state that mirrors the application state for rendering.
///
/// Updated incrementally via `UiUpdate` messages from the app orchestrator.
/// The `render_frame` function reads this struct to draw the console.
pub struct ViewState {
    pub screen: Screen,
    pub overlay: Option<Overlay>,
    /// Quit confirmation dialog is showing.
    pub confirm_quit: bool,

    pub login_phone: String,
    pub login_password: String,
    pub login_focus: LoginField,

    /// Signed-in admin, `None` before login and after expiry.
    pub profile: Option<Profile>,
    pub committees: Vec<Committee>,
    pub committee_cursor: usize,
    /// The committee whose detail view is open.
    pub selected_committee: Option<i64>,
    pub draws: Vec<Draw>,
    pub draw_cursor: usize,
    pub members: Vec<Candidate>,
    pub member_cursor: usize,
    pub paid_rows: Vec<PaidRow>,
    pub paid_cursor: usize,

    /// Inline amount edit in progress, if any.
    pub editing: Option<EditCell>,
    /// Content of the open data-entry form, paired with `Overlay::Form`.
    pub form: Option<FormState>,
    /// Optimistic paid-flag overrides, keyed per member per draw. Cleared
    /// when fresh rows for the draw arrive.
    pub paid_flags: HashMap<ToggleKey, bool>,

    /// Latest reveal animation frame.
    pub reveal: Option<RevealFrame>,
    /// Latest countdown frame.
    pub timer: Option<TimerCard>,

    /// Most recent notification, shown in the status bar.
    pub notification: Option<Notification>,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            screen: Screen::Login,
            overlay: None,
            confirm_quit: false,
            login_phone: String::new(),
            login_password: String::new(),
            login_focus: LoginField::Phone,
            profile: None,
            committees: Vec::new(),
            committee_cursor: 0,
            selected_committee: None,
            draws: Vec::new(),
            draw_cursor: 0,
            members: Vec::new(),
            member_cursor: 0,
            paid_rows: Vec::new(),
            paid_cursor: 0,
            editing: None,
            form: None,
            paid_flags: HashMap::new(),
            reveal: None,
            timer: None,
            notification: None,
        }
    }
}

impl ViewState {
    /// The committee row under the cursor.
    pub fn selected_committee_row(&self) -> Option<&Committee> {
        self.committees.get(self.committee_cursor)
    }

    /// The draw row under the cursor.
    pub fn selected_draw(&self) -> Option<&Draw> {
        self.draws.get(self.draw_cursor)
    }

    /// Drop everything tied to the signed-in session.
    fn reset_to_login(&mut self) {
        self.screen = Screen::Login;
        self.overlay = None;
        self.confirm_quit = false;
        self.profile = None;
        self.committees.clear();
        self.committee_cursor = 0;
        self.selected_committee = None;
        self.draws.clear();
        self.draw_cursor = 0;
        self.members.clear();
        self.member_cursor = 0;
        self.paid_rows.clear();
        self.paid_cursor = 0;
        self.editing = None;
        self.form = None;
        self.paid_flags.clear();
        self.reveal = None;
        self.timer = None;
        self.login_password.clear();
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::LoggedIn(profile) => {
            state.profile = Some(*profile);
            state.screen = Screen::Committees;
            state.login_password.clear();
        }
        UiUpdate::LoggedOut | UiUpdate::SessionExpired => {
            state.reset_to_login();
        }
        UiUpdate::Committees(committees) => {
            state.committees = committees;
            if state.committee_cursor >= state.committees.len() {
                state.committee_cursor = state.committees.len().saturating_sub(1);
            }
        }
        UiUpdate::Draws { committee_id, draws } => {
            if state.selected_committee == Some(committee_id) {
                state.draws = draws;
                if state.draw_cursor >= state.draws.len() {
                    state.draw_cursor = state.draws.len().saturating_sub(1);
                }
            }
        }
        UiUpdate::Members { committee_id, members } => {
            if state.selected_committee == Some(committee_id) {
                state.members = members;
                if state.member_cursor >= state.members.len() {
                    state.member_cursor = state.members.len().saturating_sub(1);
                }
            }
        }
        UiUpdate::PaidRows { draw_id, rows } => {
            state.paid_rows = rows;
            if state.paid_cursor >= state.paid_rows.len() {
                state.paid_cursor = state.paid_rows.len().saturating_sub(1);
            }
            // Fresh rows are authoritative for this draw.
            state.paid_flags.retain(|key, _| key.draw_id != draw_id);
        }
        UiUpdate::AmountCommitted { key, amount } => {
            apply_amount(state, key, Some(amount));
        }
        UiUpdate::AmountReverted { key, value } => {
            apply_amount(state, key, value);
        }
        UiUpdate::PaidFlag { key, value } => {
            state.paid_flags.insert(key, value);
        }
        UiUpdate::RevealFrame(frame) => {
            state.reveal = Some(*frame);
        }
        UiUpdate::TimerFrame {
            phase,
            remaining,
            total,
        } => {
            state.timer = Some(TimerCard {
                phase,
                remaining,
                total,
            });
        }
        UiUpdate::Notification(notification) => {
            state.notification = Some(notification);
        }
    }
}

/// Write a committed or reverted amount back into the row it belongs to.
fn apply_amount(state: &mut ViewState, key: FieldKey, value: Option<f64>) {
    match key {
        FieldKey::DrawAmount { draw_id, .. } => {
            if let Some(draw) = state.draws.iter_mut().find(|d| d.id == draw_id) {
                draw.amount = value;
            }
        }
        FieldKey::MemberPaid { user_id, .. } => {
            if let Some(row) = state
                .paid_rows
                .iter_mut()
                .find(|r| r.user_id == Some(user_id))
            {
                row.draw_amount_paid = value;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the complete console frame.
fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);

    match state.screen {
        Screen::Login => widgets::login::render(frame, layout.main, state),
        Screen::Committees => widgets::committees::render(frame, layout.main, state),
        Screen::Detail => widgets::draws::render(frame, layout.main, state),
    }

    match state.overlay {
        Some(Overlay::Members) => widgets::members::render(frame, layout.main, state),
        Some(Overlay::PaidRows { draw_id }) => {
            widgets::paid_rows::render(frame, layout.main, state, draw_id);
        }
        Some(Overlay::Reveal) => {
            if let Some(ref reveal) = state.reveal {
                widgets::reveal::render(frame, layout.main, reveal);
            }
        }
        Some(Overlay::Timer) => {
            if let Some(ref timer) = state.timer {
                widgets::timer_card::render(frame, layout.main, timer);
            }
        }
        Some(Overlay::Form) => {
            if let Some(ref form) = state.form {
                widgets::form::render(frame, layout.main, form);
            }
        }
        None => {}
    }

    if state.confirm_quit {
        widgets::quit_confirm::render(frame, layout.main);
    }

    render_help_bar(frame, layout.help_bar, state);
}

fn render_help_bar(frame: &mut Frame, area: Rect, state: &ViewState) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        help_line(state),
        Style::default().fg(Color::White).add_modifier(Modifier::DIM),
    )))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

/// Keyboard hints for the active screen or overlay.
pub fn help_line(state: &ViewState) -> &'static str {
    if state.confirm_quit {
        return " y:Quit  n:Stay";
    }
    if state.editing.is_some() {
        return " 0-9 .:Type  Enter:Save now  Esc:Discard";
    }
    match state.overlay {
        Some(Overlay::Members) => " Up/Dn:Scroll  Esc:Close",
        Some(Overlay::PaidRows { .. }) => " Up/Dn:Select  Space:Toggle paid  e:Edit paid  Esc:Close",
        Some(Overlay::Reveal) => " Enter:Confirm winner  Esc:Cancel",
        Some(Overlay::Timer) => " s:Restart  Esc:Stop",
        Some(Overlay::Form) => " Tab:Next field  Enter:Submit  Esc:Close",
        None => match state.screen {
            Screen::Login => " Tab:Field  Enter:Sign in  Ctrl+C:Quit",
            Screen::Committees => {
                " Up/Dn:Select  Enter:Open  n:New  r:Refresh  c:Password  o:Sign out  q:Quit"
            }
            Screen::Detail => {
                " Up/Dn:Draw  e:Edit amount  a:Add member  m:Members  p:Payments  l:Lucky draw  t:Timer  Esc:Back  q:Quit"
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// This is the main entry point for the terminal UI. It:
/// 1. Initializes the terminal (enters raw mode, enables alternate screen).
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard input, render ticks.
/// 4. Restores the terminal on clean exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    // Restore the terminal before the default hook prints the panic.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => {
                        apply_ui_update(&mut view_state, ui_update);
                    }
                    None => {
                        // Channel closed: app is shutting down
                        break;
                    }
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(command) = input::handle_key(key_event, &mut view_state) {
                            let quitting = command == UserCommand::Quit;
                            let _ = cmd_tx.send(command).await;
                            if quitting {
                                break;
                            }
                        }
                    }
                    Some(Ok(_)) => {
                        // Mouse events, resize events, etc. -- ignore
                    }
                    Some(Err(_)) | None => {
                        break;
                    }
                }
            }

            _ = render_tick.tick() => {
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    ratatui::restore();

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
