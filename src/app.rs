// Application state and orchestration logic.
//
// The central event loop that coordinates user commands from the TUI, results
// from spawned fetch tasks, settle/animation/countdown ticks, and the
// session-expiry watch channel. Owns the four interaction controllers and all
// `RemoteResource` fetch guards, and pushes UI updates to the TUI render loop.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::types::{Candidate, Committee, Draw, Profile};
use crate::api::{ApiClient, ApiError, RemoteResource};
use crate::committee::{
    CommitRequest, CommitResolution, CommitSink, DebouncedCommitController, DrawRevealController,
    DrawTimer, FieldKey, OptimisticToggleController, RevealError, Speaker, ToggleKey,
};
use crate::config::Config;
use crate::protocol::{CoreEvent, Notification, RevealFrame, UiUpdate, UserCommand};

// ---------------------------------------------------------------------------
// Commit sink over the live API
// ---------------------------------------------------------------------------

#[async_trait]
impl CommitSink for ApiClient {
    async fn commit(&self, request: &CommitRequest) -> Result<f64, ApiError> {
        match request.key {
            FieldKey::DrawAmount {
                committee_id,
                draw_id,
            } => {
                self.update_draw_amount(committee_id, draw_id, request.amount)
                    .await
            }
            FieldKey::MemberPaid {
                committee_id,
                draw_id,
                user_id,
            } => {
                self.mark_user_draw_paid(committee_id, user_id, draw_id, request.amount)
                    .await
            }
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    pub client: Arc<ApiClient>,
    /// Where amount commits are written. The live app passes the API client;
    /// tests substitute a recording sink.
    pub sink: Arc<dyn CommitSink>,
    pub speaker: Arc<dyn Speaker>,

    pub profile: Option<Profile>,
    pub committees: Vec<Committee>,
    pub selected_committee: Option<i64>,
    pub draws: Vec<Draw>,
    /// Roster of the selected committee, refreshed on open and after a
    /// confirmed draw.
    pub members: Vec<Candidate>,
    /// The (committee, draw) pair a reveal session is running for.
    reveal_target: Option<(i64, i64)>,

    pub commit: DebouncedCommitController,
    pub toggles: OptimisticToggleController,
    pub reveal: DrawRevealController,
    pub timer: DrawTimer,

    committees_fetch: RemoteResource<Vec<Committee>>,
    members_fetch: RemoteResource<Vec<Candidate>>,
    draws_fetch: RemoteResource<Vec<Draw>>,
    paid_fetch: RemoteResource<Vec<crate::api::types::PaidRow>>,
    winner_fetch: RemoteResource<crate::api::types::DrawWinner>,

    core_tx: mpsc::Sender<CoreEvent>,
}

impl AppState {
    pub fn new(
        config: Config,
        client: Arc<ApiClient>,
        sink: Arc<dyn CommitSink>,
        speaker: Arc<dyn Speaker>,
        core_tx: mpsc::Sender<CoreEvent>,
    ) -> Self {
        let commit = DebouncedCommitController::new(config.settle_period(), core_tx.clone());
        let reveal = DrawRevealController::new(config.reveal_duration(), core_tx.clone());
        let timer = DrawTimer::new(core_tx.clone());

        AppState {
            config,
            client,
            sink,
            speaker,
            profile: None,
            committees: Vec::new(),
            selected_committee: None,
            draws: Vec::new(),
            members: Vec::new(),
            reveal_target: None,
            commit,
            toggles: OptimisticToggleController::new(),
            reveal,
            timer,
            committees_fetch: RemoteResource::new(),
            members_fetch: RemoteResource::new(),
            draws_fetch: RemoteResource::new(),
            paid_fetch: RemoteResource::new(),
            winner_fetch: RemoteResource::new(),
            core_tx: core_tx.clone(),
        }
    }

    /// Members eligible for the next lottery draw. The server's winner pick
    /// is authoritative; this filter only shapes what the reveal strip shows.
    pub fn eligible_members(&self) -> Vec<Candidate> {
        self.members
            .iter()
            .filter(|m| !m.is_draw_completed)
            .cloned()
            .collect()
    }

    fn refresh_committees(&mut self) {
        let client = Arc::clone(&self.client);
        self.committees_fetch.fetch(
            async move { client.committees().await },
            self.core_tx.clone(),
            |generation, result| CoreEvent::CommitteesLoaded { generation, result },
        );
    }

    fn refresh_members(&mut self, committee_id: i64) {
        let client = Arc::clone(&self.client);
        self.members_fetch.fetch(
            async move { client.members(committee_id).await },
            self.core_tx.clone(),
            |generation, result| CoreEvent::MembersLoaded { generation, result },
        );
    }

    fn refresh_draws(&mut self, committee_id: i64) {
        let client = Arc::clone(&self.client);
        self.draws_fetch.fetch(
            async move { client.draws(committee_id).await },
            self.core_tx.clone(),
            move |generation, result| CoreEvent::DrawsLoaded {
                generation,
                committee_id,
                result,
            },
        );
    }

    fn refresh_paid_rows(&mut self, committee_id: i64, draw_id: i64) {
        let client = Arc::clone(&self.client);
        self.paid_fetch.fetch(
            async move { client.paid_rows(committee_id, draw_id).await },
            self.core_tx.clone(),
            move |generation, result| CoreEvent::PaidRowsLoaded {
                generation,
                draw_id,
                result,
            },
        );
    }

    /// Refetch whatever the committed field feeds. Totals in the draw table
    /// and the payment breakdown both derive from these amounts, so after
    /// any resolved commit the visible rows are pulled fresh from the
    /// server.
    fn refresh_for_field(&mut self, key: FieldKey) {
        match key {
            FieldKey::DrawAmount { committee_id, .. } => self.refresh_draws(committee_id),
            FieldKey::MemberPaid {
                committee_id,
                draw_id,
                ..
            } => self.refresh_paid_rows(committee_id, draw_id),
        }
    }

    fn send_commit(&self, request: CommitRequest) {
        let sink = Arc::clone(&self.sink);
        let core_tx = self.core_tx.clone();
        tokio::spawn(async move {
            let result = sink.commit(&request).await;
            let _ = core_tx
                .send(CoreEvent::CommitResolved {
                    key: request.key,
                    result,
                })
                .await;
        });
    }

    fn reveal_frame(&self) -> RevealFrame {
        RevealFrame {
            phase: self.reveal.phase(),
            roster: self.reveal.roster().map(<[_]>::to_vec).unwrap_or_default(),
            strip_position: self.reveal.strip_position(),
            winner: self.reveal.winner().cloned(),
        }
    }

    /// Drop everything tied to the expired session.
    fn clear_session(&mut self) {
        self.client.set_token(None);
        self.profile = None;
        self.committees.clear();
        self.selected_committee = None;
        self.draws.clear();
        self.members.clear();
        self.reveal_target = None;
        self.reveal.cancel();
        self.timer.stop();
        self.committees_fetch.cancel();
        self.members_fetch.cancel();
        self.draws_fetch.cancel();
        self.paid_fetch.cancel();
        self.winner_fetch.cancel();
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens with `tokio::select!` on:
/// 1. User commands from the TUI
/// 2. Core events from spawned fetch/timer tasks
/// 3. The session-expiry watch channel
///
/// Pushes UI updates through `ui_tx` for the TUI render loop.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut core_rx: mpsc::Receiver<CoreEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let mut expiry_rx = state.client.subscribe_expiry();
    // Consume the initial value so only future expiries trigger.
    expiry_rx.borrow_and_update();

    // Auto-login when credentials.toml carries a stored pair.
    if let Some((phone, password)) = state.config.credentials.login_pair() {
        info!("Stored credentials found, logging in");
        let client = Arc::clone(&state.client);
        let core_tx = state.core_tx.clone();
        tokio::spawn(async move {
            let result = client.login(&phone, &password).await;
            let _ = core_tx.send(CoreEvent::LoginResolved { result }).await;
        });
    }

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            event = core_rx.recv() => {
                match event {
                    Some(event) => {
                        handle_core_event(&mut state, event, &ui_tx).await;
                    }
                    None => {
                        info!("Core event channel closed, shutting down");
                        break;
                    }
                }
            }

            changed = expiry_rx.changed() => {
                if changed.is_ok() {
                    warn!("Session expired, returning to login");
                    state.clear_session();
                    let _ = ui_tx.send(UiUpdate::SessionExpired).await;
                    let _ = ui_tx
                        .send(UiUpdate::Notification(Notification::error(
                            "Session expired",
                            "Your session has expired. Please sign in again.",
                        )))
                        .await;
                }
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

/// Handle a user command from the TUI.
pub async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::Login { phone, password } => {
            let client = Arc::clone(&state.client);
            let core_tx = state.core_tx.clone();
            tokio::spawn(async move {
                let result = client.login(&phone, &password).await;
                let _ = core_tx.send(CoreEvent::LoginResolved { result }).await;
            });
        }
        UserCommand::Logout => {
            let client = Arc::clone(&state.client);
            let core_tx = state.core_tx.clone();
            tokio::spawn(async move {
                let result = client.logout().await;
                let _ = core_tx.send(CoreEvent::LogoutResolved { result }).await;
            });
        }
        UserCommand::ChangePassword { old, new } => {
            let client = Arc::clone(&state.client);
            let core_tx = state.core_tx.clone();
            tokio::spawn(async move {
                let result = client.change_password(&old, &new).await;
                let _ = core_tx.send(CoreEvent::PasswordChanged { result }).await;
            });
        }

        UserCommand::RefreshCommittees => {
            state.refresh_committees();
        }
        UserCommand::OpenCommittee { committee_id } => {
            info!(committee_id, "opening committee");
            state.selected_committee = Some(committee_id);
            state.refresh_draws(committee_id);
            state.refresh_members(committee_id);
        }
        UserCommand::CreateCommittee(new) => {
            let client = Arc::clone(&state.client);
            let core_tx = state.core_tx.clone();
            tokio::spawn(async move {
                let result = client.create_committee(&new).await;
                let _ = core_tx.send(CoreEvent::CommitteeCreated { result }).await;
            });
        }
        UserCommand::AddMember(new) => {
            let client = Arc::clone(&state.client);
            let core_tx = state.core_tx.clone();
            tokio::spawn(async move {
                let result = client.add_member(&new).await;
                let _ = core_tx.send(CoreEvent::MemberAdded { result }).await;
            });
        }
        UserCommand::ShowMembers { committee_id } => {
            state.refresh_members(committee_id);
        }
        UserCommand::ShowPaidRows {
            committee_id,
            draw_id,
        } => {
            state.refresh_paid_rows(committee_id, draw_id);
        }

        UserCommand::EditAmount { key, raw } => {
            state.commit.edit(key, raw);
        }
        UserCommand::FlushEdit { key } => {
            if let Some(request) = state.commit.flush(key) {
                state.send_commit(request);
            }
        }
        UserCommand::CancelEdit { key } => {
            state.commit.cancel(key);
        }

        UserCommand::TogglePaid { committee_id, key } => {
            if let Some(request) = state.toggles.toggle(key) {
                let _ = ui_tx
                    .send(UiUpdate::PaidFlag {
                        key,
                        value: request.desired,
                    })
                    .await;
                let client = Arc::clone(&state.client);
                let core_tx = state.core_tx.clone();
                tokio::spawn(async move {
                    let result = client
                        .toggle_draw_completed(
                            committee_id,
                            key.draw_id,
                            key.user_id,
                            request.desired,
                        )
                        .await;
                    let _ = core_tx.send(CoreEvent::ToggleResolved { key, result }).await;
                });
            }
        }

        UserCommand::StartReveal {
            committee_id,
            draw_id,
        } => {
            let roster = state.eligible_members();
            match state.reveal.begin_request(roster) {
                Ok(()) => {
                    state.reveal_target = Some((committee_id, draw_id));
                    let client = Arc::clone(&state.client);
                    state.winner_fetch.fetch(
                        async move { client.lottery_random_user(committee_id).await },
                        state.core_tx.clone(),
                        |generation, result| CoreEvent::WinnerLoaded { generation, result },
                    );
                    let _ = ui_tx
                        .send(UiUpdate::RevealFrame(Box::new(state.reveal_frame())))
                        .await;
                }
                Err(RevealError::EmptyRoster) => {
                    let _ = ui_tx
                        .send(UiUpdate::Notification(Notification::error(
                            "Cannot run draw",
                            "No eligible members remain in this committee.",
                        )))
                        .await;
                }
                Err(RevealError::AlreadyActive) => {
                    debug!("reveal already active, start ignored");
                }
            }
        }
        UserCommand::ConfirmReveal => {
            let Some(winner) = state.reveal.confirm() else {
                return;
            };
            let _ = ui_tx
                .send(UiUpdate::RevealFrame(Box::new(state.reveal_frame())))
                .await;
            let Some((committee_id, draw_id)) = state.reveal_target.take() else {
                return;
            };
            let Some(user_id) = winner.id else {
                warn!("confirmed winner has no id, skipping completion write");
                return;
            };
            let client = Arc::clone(&state.client);
            let core_tx = state.core_tx.clone();
            tokio::spawn(async move {
                let result = client
                    .toggle_draw_completed(committee_id, draw_id, user_id, true)
                    .await;
                let _ = core_tx.send(CoreEvent::WinnerConfirmed { result }).await;
            });
        }
        UserCommand::CancelReveal => {
            state.winner_fetch.cancel();
            state.reveal.cancel();
            state.reveal_target = None;
            let _ = ui_tx
                .send(UiUpdate::RevealFrame(Box::new(state.reveal_frame())))
                .await;
        }

        UserCommand::StartTimer => {
            state.timer.start(state.config.draw.timer_seconds);
            send_timer_frame(state, ui_tx).await;
        }
        UserCommand::StopTimer => {
            state.timer.stop();
            send_timer_frame(state, ui_tx).await;
        }

        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

/// Handle a result or tick reported by a spawned task.
pub async fn handle_core_event(
    state: &mut AppState,
    event: CoreEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match event {
        CoreEvent::LoginResolved { result } => match result {
            Ok(profile) => {
                info!("logged in");
                state.profile = Some(profile.clone());
                let _ = ui_tx.send(UiUpdate::LoggedIn(Box::new(profile))).await;
                state.refresh_committees();
            }
            Err(e) => {
                notify_error(ui_tx, "Sign-in failed", &e).await;
            }
        },
        CoreEvent::LogoutResolved { result } => {
            // The token is already dropped client-side; a failed logout call
            // still ends the local session.
            if let Err(e) = result {
                debug!("logout request failed: {e}");
            }
            state.clear_session();
            let _ = ui_tx.send(UiUpdate::LoggedOut).await;
        }
        CoreEvent::PasswordChanged { result } => match result {
            Ok(()) => {
                let _ = ui_tx
                    .send(UiUpdate::Notification(Notification::success(
                        "Password changed",
                        "Your password has been updated.",
                    )))
                    .await;
            }
            Err(e) => notify_error(ui_tx, "Password change failed", &e).await,
        },

        CoreEvent::CommitteesLoaded { generation, result } => {
            if !state.committees_fetch.is_current(generation) {
                debug!("stale committee list discarded");
                return;
            }
            match result {
                Ok(committees) => {
                    state.committees = committees.clone();
                    let _ = ui_tx.send(UiUpdate::Committees(committees)).await;
                }
                Err(e) => notify_error(ui_tx, "Could not load committees", &e).await,
            }
        }
        CoreEvent::CommitteeCreated { result } => match result {
            Ok(()) => {
                let _ = ui_tx
                    .send(UiUpdate::Notification(Notification::success(
                        "Committee created",
                        "The new committee has been added.",
                    )))
                    .await;
                state.refresh_committees();
            }
            Err(e) => notify_error(ui_tx, "Could not create committee", &e).await,
        },
        CoreEvent::MemberAdded { result } => match result {
            Ok(()) => {
                let _ = ui_tx
                    .send(UiUpdate::Notification(Notification::success(
                        "Member added",
                        "The member has been enrolled.",
                    )))
                    .await;
                if let Some(committee_id) = state.selected_committee {
                    state.refresh_members(committee_id);
                }
            }
            Err(e) => notify_error(ui_tx, "Could not add member", &e).await,
        },
        CoreEvent::MembersLoaded { generation, result } => {
            if !state.members_fetch.is_current(generation) {
                debug!("stale member roster discarded");
                return;
            }
            match result {
                Ok(members) => {
                    state.members = members.clone();
                    if let Some(committee_id) = state.selected_committee {
                        let _ = ui_tx
                            .send(UiUpdate::Members {
                                committee_id,
                                members,
                            })
                            .await;
                    }
                }
                Err(e) => notify_error(ui_tx, "Could not load members", &e).await,
            }
        }
        CoreEvent::DrawsLoaded {
            generation,
            committee_id,
            result,
        } => {
            if !state.draws_fetch.is_current(generation) {
                debug!("stale draw list discarded");
                return;
            }
            match result {
                Ok(draws) => {
                    for draw in &draws {
                        state.commit.register(
                            FieldKey::DrawAmount {
                                committee_id,
                                draw_id: draw.id,
                            },
                            draw.amount,
                        );
                    }
                    state.draws = draws.clone();
                    let _ = ui_tx
                        .send(UiUpdate::Draws {
                            committee_id,
                            draws,
                        })
                        .await;
                }
                Err(e) => notify_error(ui_tx, "Could not load draws", &e).await,
            }
        }
        CoreEvent::PaidRowsLoaded {
            generation,
            draw_id,
            result,
        } => {
            if !state.paid_fetch.is_current(generation) {
                debug!("stale paid rows discarded");
                return;
            }
            match result {
                Ok(rows) => {
                    let committee_id = state.selected_committee.unwrap_or_default();
                    for row in &rows {
                        let Some(user_id) = row.user_id else { continue };
                        state.commit.register(
                            FieldKey::MemberPaid {
                                committee_id,
                                draw_id,
                                user_id,
                            },
                            row.draw_amount_paid,
                        );
                        state
                            .toggles
                            .sync(ToggleKey { draw_id, user_id }, row.is_draw_completed);
                    }
                    let _ = ui_tx.send(UiUpdate::PaidRows { draw_id, rows }).await;
                }
                Err(e) => notify_error(ui_tx, "Could not load payments", &e).await,
            }
        }
        CoreEvent::WinnerLoaded { generation, result } => {
            if !state.winner_fetch.is_current(generation) {
                debug!("stale lottery winner discarded");
                return;
            }
            match result {
                Ok(winner) => {
                    state.reveal.winner_received(winner);
                    let _ = ui_tx
                        .send(UiUpdate::RevealFrame(Box::new(state.reveal_frame())))
                        .await;
                }
                Err(e) => {
                    state.reveal.request_failed();
                    state.reveal_target = None;
                    let _ = ui_tx
                        .send(UiUpdate::RevealFrame(Box::new(state.reveal_frame())))
                        .await;
                    notify_error(ui_tx, "Draw failed", &e).await;
                }
            }
        }
        CoreEvent::WinnerConfirmed { result } => match result {
            Ok(()) => {
                let _ = ui_tx
                    .send(UiUpdate::Notification(Notification::success(
                        "Draw recorded",
                        "The winner has been saved.",
                    )))
                    .await;
                if let Some(committee_id) = state.selected_committee {
                    state.refresh_members(committee_id);
                    state.refresh_draws(committee_id);
                }
            }
            Err(e) => notify_error(ui_tx, "Could not record winner", &e).await,
        },

        CoreEvent::CommitSettle { key, generation } => {
            if let Some(request) = state.commit.settle_elapsed(key, generation) {
                state.send_commit(request);
            }
        }
        CoreEvent::CommitResolved { key, result } => {
            let Some(resolution) = state.commit.commit_resolved(key, result) else {
                return;
            };
            match resolution {
                CommitResolution::Committed { amount, followup } => {
                    let _ = ui_tx.send(UiUpdate::AmountCommitted { key, amount }).await;
                    // Refresh once the field is quiet; a buffered follow-up
                    // commit means more writes are coming first.
                    if let Some(request) = followup {
                        state.send_commit(request);
                    } else {
                        state.refresh_for_field(key);
                    }
                }
                CommitResolution::Failed {
                    error,
                    revert_to,
                    followup,
                } => {
                    let _ = ui_tx
                        .send(UiUpdate::AmountReverted {
                            key,
                            value: revert_to,
                        })
                        .await;
                    notify_error(ui_tx, "Could not save amount", &error).await;
                    // Failed attempts reconcile against the server too, so
                    // the view never keeps a value that was not persisted.
                    if let Some(request) = followup {
                        state.send_commit(request);
                    } else {
                        state.refresh_for_field(key);
                    }
                }
            }
        }
        CoreEvent::ToggleResolved { key, result } => {
            if let Some(error) = state.toggles.resolved(key, result) {
                if let Some(value) = state.toggles.value(key) {
                    let _ = ui_tx.send(UiUpdate::PaidFlag { key, value }).await;
                }
                notify_error(ui_tx, "Could not update status", &error).await;
            }
            // Success keeps the optimistic value; no refetch.
        }

        CoreEvent::RevealTick { generation } => {
            if state.reveal.tick(generation) {
                let _ = ui_tx
                    .send(UiUpdate::RevealFrame(Box::new(state.reveal_frame())))
                    .await;
            }
        }
        CoreEvent::TimerTick { generation } => {
            let speaker = Arc::clone(&state.speaker);
            if state.timer.tick(generation, speaker.as_ref()) {
                send_timer_frame(state, ui_tx).await;
            }
        }
    }
}

async fn send_timer_frame(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::TimerFrame {
            phase: state.timer.phase(),
            remaining: state.timer.remaining(),
            total: state.timer.total(),
        })
        .await;
}

async fn notify_error(ui_tx: &mpsc::Sender<UiUpdate>, title: &str, error: &ApiError) {
    warn!("{title}: {error}");
    let _ = ui_tx
        .send(UiUpdate::Notification(Notification::error(
            title,
            error.user_message(),
        )))
        .await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
