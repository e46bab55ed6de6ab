// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages sent to the
// app orchestrator, or into local ViewState mutations (cursor movement,
// overlay opening, edit buffers).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::{EditCell, FormKind, FormState, LoginField, Overlay, Screen, ViewState};
use crate::api::{NewCommittee, NewMember};
use crate::committee::FieldKey;
use crate::protocol::{Notification, UserCommand};

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app orchestrator (e.g. Login, StartReveal, Quit). Returns `None` when the
/// key press was handled locally by mutating `ViewState` (cursor movement,
/// closing an overlay).
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Only process key press events. On Windows, crossterm emits both
    // Press and Release events for each physical keypress; ignoring
    // non-Press events prevents double-processing.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits immediately regardless of mode (escape hatch)
    if key_event.modifiers.contains(KeyModifiers::CONTROL)
        && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    // Quit confirmation mode: only y/q confirm, n/Esc cancel, everything else blocked
    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    // An inline amount edit captures everything until Enter or Esc.
    if view_state.editing.is_some() {
        return handle_editing(key_event, view_state);
    }

    if view_state.screen == Screen::Login {
        return handle_login(key_event, view_state);
    }

    if let Some(overlay) = view_state.overlay {
        return handle_overlay(overlay, key_event, view_state);
    }

    match view_state.screen {
        Screen::Committees => handle_committees(key_event, view_state),
        Screen::Detail => handle_detail(key_event, view_state),
        Screen::Login => None,
    }
}

fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('q') => {
            view_state.confirm_quit = false;
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

fn handle_editing(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    let edit = view_state.editing.as_mut()?;
    match key_event.code {
        KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
            edit.buffer.push(c);
            Some(UserCommand::EditAmount {
                key: edit.key,
                raw: edit.buffer.clone(),
            })
        }
        KeyCode::Backspace => {
            edit.buffer.pop();
            Some(UserCommand::EditAmount {
                key: edit.key,
                raw: edit.buffer.clone(),
            })
        }
        KeyCode::Enter => {
            let key = edit.key;
            view_state.editing = None;
            Some(UserCommand::FlushEdit { key })
        }
        KeyCode::Esc => {
            let key = edit.key;
            view_state.editing = None;
            Some(UserCommand::CancelEdit { key })
        }
        _ => None,
    }
}

fn handle_login(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
            view_state.login_focus = match view_state.login_focus {
                LoginField::Phone => LoginField::Password,
                LoginField::Password => LoginField::Phone,
            };
            None
        }
        KeyCode::Enter => {
            if view_state.login_phone.is_empty() || view_state.login_password.is_empty() {
                return None;
            }
            Some(UserCommand::Login {
                phone: view_state.login_phone.clone(),
                password: view_state.login_password.clone(),
            })
        }
        KeyCode::Backspace => {
            match view_state.login_focus {
                LoginField::Phone => view_state.login_phone.pop(),
                LoginField::Password => view_state.login_password.pop(),
            };
            None
        }
        KeyCode::Char(c) => {
            match view_state.login_focus {
                LoginField::Phone => view_state.login_phone.push(c),
                LoginField::Password => view_state.login_password.push(c),
            }
            None
        }
        _ => None,
    }
}

fn handle_overlay(
    overlay: Overlay,
    key_event: KeyEvent,
    view_state: &mut ViewState,
) -> Option<UserCommand> {
    match overlay {
        Overlay::Members => handle_members_overlay(key_event, view_state),
        Overlay::PaidRows { draw_id } => handle_paid_overlay(draw_id, key_event, view_state),
        Overlay::Reveal => handle_reveal_overlay(key_event, view_state),
        Overlay::Timer => handle_timer_overlay(key_event, view_state),
        Overlay::Form => handle_form(key_event, view_state),
    }
}

fn handle_form(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            view_state.overlay = None;
            view_state.form = None;
            None
        }
        KeyCode::Enter => submit_form(view_state),
        code => {
            let form = view_state.form.as_mut()?;
            match code {
                KeyCode::Tab | KeyCode::Down => {
                    form.focus = (form.focus + 1) % form.fields.len();
                }
                KeyCode::BackTab | KeyCode::Up => {
                    form.focus = (form.focus + form.fields.len() - 1) % form.fields.len();
                }
                KeyCode::Backspace => {
                    form.fields[form.focus].value.pop();
                }
                KeyCode::Char(c) => {
                    form.fields[form.focus].value.push(c);
                }
                _ => {}
            }
            None
        }
    }
}

/// Validate the open form. A valid form closes and emits its command; an
/// invalid one stays open and surfaces the first problem as a notification.
fn submit_form(view_state: &mut ViewState) -> Option<UserCommand> {
    let form = view_state.form.as_ref()?;
    match build_form_command(form, view_state.selected_committee) {
        Ok(command) => {
            view_state.overlay = None;
            view_state.form = None;
            Some(command)
        }
        Err(message) => {
            view_state.notification = Some(Notification::error("Check the form", message));
            None
        }
    }
}

fn build_form_command(
    form: &FormState,
    selected_committee: Option<i64>,
) -> Result<UserCommand, String> {
    match form.kind {
        FormKind::NewCommittee => Ok(UserCommand::CreateCommittee(NewCommittee {
            name: require(form, 0)?,
            amount: parse_amount(form, 1)?,
            max_members: parse_count(form, 2)?,
            no_of_months: parse_count(form, 3)?,
            fine_amount: optional_amount(form, 4)?,
            extra_days_for_fine: None,
            start_date: optional(form, 5),
        })),
        FormKind::NewMember => {
            let committee_id =
                selected_committee.ok_or_else(|| "no committee is open".to_string())?;
            Ok(UserCommand::AddMember(NewMember {
                committee_id,
                name: require(form, 0)?,
                phone: require(form, 1)?,
                email: optional(form, 2),
                password: optional(form, 3),
            }))
        }
        FormKind::ChangePassword => Ok(UserCommand::ChangePassword {
            old: require(form, 0)?,
            new: require(form, 1)?,
        }),
    }
}

fn require(form: &FormState, index: usize) -> Result<String, String> {
    let value = form.value(index);
    if value.is_empty() {
        Err(format!("{} is required", form.fields[index].label))
    } else {
        Ok(value.to_string())
    }
}

fn optional(form: &FormState, index: usize) -> Option<String> {
    let value = form.value(index);
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_amount(form: &FormState, index: usize) -> Result<f64, String> {
    let label = form.fields[index].label;
    let amount: f64 = require(form, index)?
        .parse()
        .map_err(|_| format!("{label} must be a number"))?;
    if amount > 0.0 {
        Ok(amount)
    } else {
        Err(format!("{label} must be positive"))
    }
}

fn parse_count(form: &FormState, index: usize) -> Result<i64, String> {
    let label = form.fields[index].label;
    let count: i64 = require(form, index)?
        .parse()
        .map_err(|_| format!("{label} must be a whole number"))?;
    if count > 0 {
        Ok(count)
    } else {
        Err(format!("{label} must be positive"))
    }
}

fn optional_amount(form: &FormState, index: usize) -> Result<Option<f64>, String> {
    let Some(raw) = optional(form, index) else {
        return Ok(None);
    };
    let label = form.fields[index].label;
    let amount: f64 = raw
        .parse()
        .map_err(|_| format!("{label} must be a number"))?;
    if amount >= 0.0 {
        Ok(Some(amount))
    } else {
        Err(format!("{label} must not be negative"))
    }
}

fn handle_members_overlay(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Up => {
            view_state.member_cursor = view_state.member_cursor.saturating_sub(1);
            None
        }
        KeyCode::Down => {
            if view_state.member_cursor + 1 < view_state.members.len() {
                view_state.member_cursor += 1;
            }
            None
        }
        KeyCode::Esc | KeyCode::Char('m') => {
            view_state.overlay = None;
            None
        }
        _ => None,
    }
}

fn handle_paid_overlay(
    draw_id: i64,
    key_event: KeyEvent,
    view_state: &mut ViewState,
) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Up => {
            view_state.paid_cursor = view_state.paid_cursor.saturating_sub(1);
            None
        }
        KeyCode::Down => {
            if view_state.paid_cursor + 1 < view_state.paid_rows.len() {
                view_state.paid_cursor += 1;
            }
            None
        }
        KeyCode::Char(' ') => {
            let committee_id = view_state.selected_committee?;
            let user_id = view_state.paid_rows.get(view_state.paid_cursor)?.user_id?;
            Some(UserCommand::TogglePaid {
                committee_id,
                key: crate::committee::ToggleKey { draw_id, user_id },
            })
        }
        KeyCode::Char('e') => {
            let committee_id = view_state.selected_committee?;
            let row = view_state.paid_rows.get(view_state.paid_cursor)?;
            let user_id = row.user_id?;
            view_state.editing = Some(EditCell {
                key: FieldKey::MemberPaid {
                    committee_id,
                    draw_id,
                    user_id,
                },
                buffer: seed_buffer(row.draw_amount_paid),
            });
            None
        }
        KeyCode::Esc => {
            view_state.overlay = None;
            None
        }
        _ => None,
    }
}

fn handle_reveal_overlay(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    use crate::committee::RevealPhase;
    let phase = view_state.reveal.as_ref().map(|r| r.phase);
    match key_event.code {
        KeyCode::Enter if phase == Some(RevealPhase::Settled) => Some(UserCommand::ConfirmReveal),
        KeyCode::Esc => {
            view_state.overlay = None;
            match phase {
                Some(RevealPhase::Requesting)
                | Some(RevealPhase::Animating)
                | Some(RevealPhase::Settled) => Some(UserCommand::CancelReveal),
                _ => None,
            }
        }
        _ => None,
    }
}

fn handle_timer_overlay(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('s') => Some(UserCommand::StartTimer),
        KeyCode::Esc => {
            view_state.overlay = None;
            Some(UserCommand::StopTimer)
        }
        _ => None,
    }
}

fn handle_committees(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Up => {
            view_state.committee_cursor = view_state.committee_cursor.saturating_sub(1);
            None
        }
        KeyCode::Down => {
            if view_state.committee_cursor + 1 < view_state.committees.len() {
                view_state.committee_cursor += 1;
            }
            None
        }
        KeyCode::Enter => {
            let committee_id = view_state.selected_committee_row()?.id;
            view_state.selected_committee = Some(committee_id);
            view_state.screen = Screen::Detail;
            view_state.draws.clear();
            view_state.draw_cursor = 0;
            Some(UserCommand::OpenCommittee { committee_id })
        }
        KeyCode::Char('r') => Some(UserCommand::RefreshCommittees),
        KeyCode::Char('n') => {
            view_state.overlay = Some(Overlay::Form);
            view_state.form = Some(FormState::new_committee());
            None
        }
        KeyCode::Char('c') => {
            view_state.overlay = Some(Overlay::Form);
            view_state.form = Some(FormState::change_password());
            None
        }
        KeyCode::Char('o') => Some(UserCommand::Logout),
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }
        _ => None,
    }
}

fn handle_detail(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    let committee_id = view_state.selected_committee?;
    match key_event.code {
        KeyCode::Up => {
            view_state.draw_cursor = view_state.draw_cursor.saturating_sub(1);
            None
        }
        KeyCode::Down => {
            if view_state.draw_cursor + 1 < view_state.draws.len() {
                view_state.draw_cursor += 1;
            }
            None
        }
        KeyCode::Char('e') => {
            let draw = view_state.selected_draw()?;
            let key = FieldKey::DrawAmount {
                committee_id,
                draw_id: draw.id,
            };
            view_state.editing = Some(EditCell {
                key,
                buffer: seed_buffer(draw.amount),
            });
            None
        }
        KeyCode::Char('m') => {
            view_state.overlay = Some(Overlay::Members);
            view_state.member_cursor = 0;
            Some(UserCommand::ShowMembers { committee_id })
        }
        KeyCode::Char('p') => {
            let draw_id = view_state.selected_draw()?.id;
            view_state.overlay = Some(Overlay::PaidRows { draw_id });
            view_state.paid_cursor = 0;
            Some(UserCommand::ShowPaidRows {
                committee_id,
                draw_id,
            })
        }
        KeyCode::Char('l') => {
            let draw_id = view_state.selected_draw()?.id;
            view_state.overlay = Some(Overlay::Reveal);
            view_state.reveal = None;
            Some(UserCommand::StartReveal {
                committee_id,
                draw_id,
            })
        }
        KeyCode::Char('a') => {
            view_state.overlay = Some(Overlay::Form);
            view_state.form = Some(FormState::new_member());
            None
        }
        KeyCode::Char('t') => {
            view_state.overlay = Some(Overlay::Timer);
            Some(UserCommand::StartTimer)
        }
        KeyCode::Char('r') => Some(UserCommand::OpenCommittee { committee_id }),
        KeyCode::Esc => {
            view_state.screen = Screen::Committees;
            view_state.selected_committee = None;
            None
        }
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }
        _ => None,
    }
}

/// Seed an edit buffer with the current value, trailing zeros trimmed.
fn seed_buffer(amount: Option<f64>) -> String {
    match amount {
        Some(a) if a.fract() == 0.0 => format!("{a:.0}"),
        Some(a) => format!("{a}"),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
