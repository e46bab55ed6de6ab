// Integration tests for the committee admin console.
//
// These tests exercise the orchestrator end-to-end through the library
// crate's public API: user commands in, core events from spawned tasks,
// UI updates out. Network-bound fetches are either answered synthetically
// (the orchestrator discards the real responses by generation) or replaced
// by a recording commit sink. Timers run on tokio's paused test clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use committee_assistant::api::types::{Candidate, Committee, Draw, DrawWinner, PaidRow, Profile};
use committee_assistant::api::{ApiClient, ApiError};
use committee_assistant::app::{self, AppState};
use committee_assistant::committee::{
    CommitRequest, CommitSink, FieldKey, RevealPhase, SilentSpeaker, TimerPhase, ToggleKey,
};
use committee_assistant::config::{
    ApiConfig, Config, CredentialsConfig, DrawConfig, EditingConfig,
};
use committee_assistant::protocol::{CoreEvent, UiUpdate, UserCommand};

use async_trait::async_trait;
use tokio::sync::mpsc;

// ===========================================================================
// Test helpers
// ===========================================================================

/// A commit sink that records every write and answers with the sent amount.
struct RecordingSink {
    committed: Mutex<Vec<CommitRequest>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(RecordingSink {
            committed: Mutex::new(Vec::new()),
        })
    }

    fn amounts(&self) -> Vec<f64> {
        self.committed.lock().unwrap().iter().map(|r| r.amount).collect()
    }
}

#[async_trait]
impl CommitSink for RecordingSink {
    async fn commit(&self, request: &CommitRequest) -> Result<f64, ApiError> {
        self.committed.lock().unwrap().push(request.clone());
        Ok(request.amount)
    }
}

/// Short settle and reveal windows so the paused clock has little to skip.
fn test_config() -> Config {
    Config {
        api: ApiConfig {
            base_url: "http://localhost:4000".into(),
            timeout_secs: 5,
        },
        draw: DrawConfig {
            reveal_duration_secs: 2,
            timer_seconds: 3,
        },
        editing: EditingConfig { settle_millis: 500 },
        credentials: CredentialsConfig::default(),
    }
}

struct Harness {
    state: AppState,
    core_rx: mpsc::Receiver<CoreEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    ui_rx: mpsc::Receiver<UiUpdate>,
    sink: Arc<RecordingSink>,
}

fn harness() -> Harness {
    let config = test_config();
    let client = Arc::new(ApiClient::new(
        &config.api.base_url,
        Duration::from_secs(config.api.timeout_secs),
    ));
    let sink = RecordingSink::new();
    let (core_tx, core_rx) = mpsc::channel(256);
    let (ui_tx, ui_rx) = mpsc::channel(256);
    let state = AppState::new(
        config,
        client,
        Arc::clone(&sink) as Arc<dyn CommitSink>,
        Arc::new(SilentSpeaker),
        core_tx,
    );
    Harness {
        state,
        core_rx,
        ui_tx,
        ui_rx,
        sink,
    }
}

/// Receive core events until one matches, skipping everything else (e.g. the
/// network errors of real fetches the test answers synthetically).
async fn wait_for<F>(core_rx: &mut mpsc::Receiver<CoreEvent>, mut want: F) -> CoreEvent
where
    F: FnMut(&CoreEvent) -> bool,
{
    loop {
        let event = core_rx.recv().await.expect("core channel closed");
        if want(&event) {
            return event;
        }
    }
}

/// Drain pending UI updates without blocking.
fn drain_ui(ui_rx: &mut mpsc::Receiver<UiUpdate>) -> Vec<UiUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = ui_rx.try_recv() {
        updates.push(update);
    }
    updates
}

fn member(id: i64, completed: bool) -> Candidate {
    Candidate {
        id: Some(id),
        name: Some(format!("member-{id}")),
        phone: Some(format!("98{id:08}")),
        email: None,
        is_draw_completed: completed,
    }
}

fn draw(id: i64, amount: Option<f64>) -> Draw {
    Draw {
        id,
        date: Some("2026-09-01".to_string()),
        time: Some("15:00".to_string()),
        min_amount: Some(900.0),
        amount,
    }
}

fn committee(id: i64, name: &str) -> Committee {
    Committee {
        id,
        name: name.to_string(),
        amount: Some(1000.0),
        max_members: Some(10),
        no_of_months: Some(10),
        fine_amount: None,
        extra_days_for_fine: None,
        start_date: None,
        created_at: None,
        status: "ACTIVE".to_string(),
    }
}

// ===========================================================================
// Login and committee list
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn login_flows_into_the_committee_list() {
    let mut h = harness();

    app::handle_core_event(
        &mut h.state,
        CoreEvent::LoginResolved {
            result: Ok(Profile {
                name: Some("Sunita".to_string()),
                phone: Some("9800000001".to_string()),
                email: None,
            }),
        },
        &h.ui_tx,
    )
    .await;

    match h.ui_rx.recv().await.unwrap() {
        UiUpdate::LoggedIn(profile) => assert_eq!(profile.name.as_deref(), Some("Sunita")),
        other => panic!("expected LoggedIn, got {other:?}"),
    }

    // A successful login starts a committee fetch; answer it.
    app::handle_core_event(
        &mut h.state,
        CoreEvent::CommitteesLoaded {
            generation: 1,
            result: Ok(vec![committee(1, "Diwali fund"), committee(2, "Office pool")]),
        },
        &h.ui_tx,
    )
    .await;

    match h.ui_rx.recv().await.unwrap() {
        UiUpdate::Committees(list) => assert_eq!(list.len(), 2),
        other => panic!("expected Committees, got {other:?}"),
    }

    // A result from a superseded fetch generation changes nothing.
    app::handle_core_event(
        &mut h.state,
        CoreEvent::CommitteesLoaded {
            generation: 0,
            result: Ok(Vec::new()),
        },
        &h.ui_tx,
    )
    .await;
    assert!(h.ui_rx.try_recv().is_err());
    assert_eq!(h.state.committees.len(), 2);
}

// ===========================================================================
// Debounced amount editing
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn keystrokes_coalesce_into_one_commit_and_flush_makes_a_second() {
    let mut h = harness();
    let key = FieldKey::DrawAmount {
        committee_id: 1,
        draw_id: 7,
    };

    // Opening the committee fetches its draws; answer with one draw at 100.
    app::handle_user_command(
        &mut h.state,
        UserCommand::OpenCommittee { committee_id: 1 },
        &h.ui_tx,
    )
    .await;
    app::handle_core_event(
        &mut h.state,
        CoreEvent::DrawsLoaded {
            generation: 1,
            committee_id: 1,
            result: Ok(vec![draw(7, Some(100.0))]),
        },
        &h.ui_tx,
    )
    .await;
    drain_ui(&mut h.ui_rx);

    // Three keystrokes inside the settle window.
    for raw in ["1", "15", "150"] {
        app::handle_user_command(
            &mut h.state,
            UserCommand::EditAmount {
                key,
                raw: raw.to_string(),
            },
            &h.ui_tx,
        )
        .await;
        tokio::time::advance(Duration::from_millis(100)).await;
    }

    // Only the settle window of the last keystroke fires.
    let settle = wait_for(&mut h.core_rx, |e| matches!(e, CoreEvent::CommitSettle { .. })).await;
    app::handle_core_event(&mut h.state, settle, &h.ui_tx).await;

    let resolved = wait_for(&mut h.core_rx, |e| {
        matches!(e, CoreEvent::CommitResolved { .. })
    })
    .await;
    app::handle_core_event(&mut h.state, resolved, &h.ui_tx).await;

    assert_eq!(h.sink.amounts(), vec![150.0]);
    assert!(drain_ui(&mut h.ui_rx)
        .iter()
        .any(|u| matches!(u, UiUpdate::AmountCommitted { amount, .. } if *amount == 150.0)));

    // A new edit flushed with Enter commits immediately, without waiting.
    app::handle_user_command(
        &mut h.state,
        UserCommand::EditAmount {
            key,
            raw: "200".to_string(),
        },
        &h.ui_tx,
    )
    .await;
    app::handle_user_command(&mut h.state, UserCommand::FlushEdit { key }, &h.ui_tx).await;

    let resolved = wait_for(&mut h.core_rx, |e| {
        matches!(e, CoreEvent::CommitResolved { .. })
    })
    .await;
    app::handle_core_event(&mut h.state, resolved, &h.ui_tx).await;

    assert_eq!(h.sink.amounts(), vec![150.0, 200.0]);
    assert_eq!(h.state.commit.last_committed(key), Some(200.0));

    // The flushed edit's settle timer was cancelled; nothing further fires.
    tokio::time::advance(Duration::from_secs(2)).await;
    while let Ok(event) = h.core_rx.try_recv() {
        app::handle_core_event(&mut h.state, event, &h.ui_tx).await;
    }
    assert_eq!(h.sink.amounts(), vec![150.0, 200.0]);
}

#[tokio::test(start_paused = true)]
async fn cancelled_edit_never_reaches_the_sink() {
    let mut h = harness();
    let key = FieldKey::DrawAmount {
        committee_id: 1,
        draw_id: 7,
    };
    h.state.commit.register(key, Some(100.0));

    app::handle_user_command(
        &mut h.state,
        UserCommand::EditAmount {
            key,
            raw: "175".to_string(),
        },
        &h.ui_tx,
    )
    .await;
    app::handle_user_command(&mut h.state, UserCommand::CancelEdit { key }, &h.ui_tx).await;

    tokio::time::advance(Duration::from_secs(2)).await;
    while let Ok(event) = h.core_rx.try_recv() {
        app::handle_core_event(&mut h.state, event, &h.ui_tx).await;
    }
    assert!(h.sink.amounts().is_empty());
    assert_eq!(h.state.commit.last_committed(key), Some(100.0));
}

// ===========================================================================
// Lottery reveal
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn reveal_settles_on_the_server_winner_and_confirms_once() {
    let mut h = harness();
    h.state.members = (1..=5).map(|id| member(id, false)).collect();

    app::handle_user_command(
        &mut h.state,
        UserCommand::StartReveal {
            committee_id: 1,
            draw_id: 7,
        },
        &h.ui_tx,
    )
    .await;
    assert_eq!(h.state.reveal.phase(), RevealPhase::Requesting);

    // The server picks member 3 (index 2 of the eligible roster).
    app::handle_core_event(
        &mut h.state,
        CoreEvent::WinnerLoaded {
            generation: 1,
            result: Ok(DrawWinner {
                id: Some(3),
                name: None,
                phone: None,
                email: None,
            }),
        },
        &h.ui_tx,
    )
    .await;
    assert_eq!(h.state.reveal.phase(), RevealPhase::Animating);

    // Drive animation ticks off the paused clock until the strip settles.
    let mut guard = 0;
    while h.state.reveal.phase() == RevealPhase::Animating {
        let tick = wait_for(&mut h.core_rx, |e| matches!(e, CoreEvent::RevealTick { .. })).await;
        app::handle_core_event(&mut h.state, tick, &h.ui_tx).await;
        guard += 1;
        assert!(guard < 500, "reveal never settled");
    }

    assert_eq!(h.state.reveal.phase(), RevealPhase::Settled);
    assert_eq!(h.state.reveal.winner().and_then(|c| c.id), Some(3));
    assert_eq!(h.state.reveal.highlighted().and_then(|c| c.id), Some(3));

    app::handle_user_command(&mut h.state, UserCommand::ConfirmReveal, &h.ui_tx).await;
    assert_eq!(h.state.reveal.phase(), RevealPhase::Confirmed);

    // A second confirm is a no-op: no new frame, no second write.
    drain_ui(&mut h.ui_rx);
    app::handle_user_command(&mut h.state, UserCommand::ConfirmReveal, &h.ui_tx).await;
    assert!(h.ui_rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn cancelling_mid_animation_discards_later_ticks() {
    let mut h = harness();
    h.state.members = vec![member(1, false), member(2, false)];

    app::handle_user_command(
        &mut h.state,
        UserCommand::StartReveal {
            committee_id: 1,
            draw_id: 7,
        },
        &h.ui_tx,
    )
    .await;
    app::handle_core_event(
        &mut h.state,
        CoreEvent::WinnerLoaded {
            generation: 1,
            result: Ok(DrawWinner {
                id: Some(2),
                name: None,
                phone: None,
                email: None,
            }),
        },
        &h.ui_tx,
    )
    .await;

    let tick = wait_for(&mut h.core_rx, |e| matches!(e, CoreEvent::RevealTick { .. })).await;
    app::handle_core_event(&mut h.state, tick, &h.ui_tx).await;

    app::handle_user_command(&mut h.state, UserCommand::CancelReveal, &h.ui_tx).await;
    assert_eq!(h.state.reveal.phase(), RevealPhase::Cancelled);
    drain_ui(&mut h.ui_rx);

    // Any tick still queued from the aborted ticker is stale and ignored.
    app::handle_core_event(&mut h.state, CoreEvent::RevealTick { generation: 1 }, &h.ui_tx).await;
    assert_eq!(h.state.reveal.phase(), RevealPhase::Cancelled);
    assert!(h.ui_rx.try_recv().is_err());
}

// ===========================================================================
// Optimistic paid toggles
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn failed_toggle_rolls_the_flag_back() {
    let mut h = harness();
    h.state.selected_committee = Some(1);
    let key = ToggleKey {
        draw_id: 7,
        user_id: 9,
    };

    // Open the payment view and answer the fetch with one unpaid row.
    app::handle_user_command(
        &mut h.state,
        UserCommand::ShowPaidRows {
            committee_id: 1,
            draw_id: 7,
        },
        &h.ui_tx,
    )
    .await;
    app::handle_core_event(
        &mut h.state,
        CoreEvent::PaidRowsLoaded {
            generation: 1,
            draw_id: 7,
            result: Ok(vec![PaidRow {
                user_id: Some(9),
                name: Some("Ravi".to_string()),
                phone: None,
                draw_amount_paid: None,
                fine_amount_paid: None,
                is_draw_completed: false,
            }]),
        },
        &h.ui_tx,
    )
    .await;
    drain_ui(&mut h.ui_rx);

    // The toggle shows optimistically before the server answers.
    app::handle_user_command(
        &mut h.state,
        UserCommand::TogglePaid {
            committee_id: 1,
            key,
        },
        &h.ui_tx,
    )
    .await;
    match h.ui_rx.recv().await.unwrap() {
        UiUpdate::PaidFlag { value, .. } => assert!(value),
        other => panic!("expected PaidFlag, got {other:?}"),
    }

    // The write fails; the flag rolls back and the user is told.
    app::handle_core_event(
        &mut h.state,
        CoreEvent::ToggleResolved {
            key,
            result: Err(ApiError::Server {
                status: 500,
                message: "boom".to_string(),
            }),
        },
        &h.ui_tx,
    )
    .await;

    let updates = drain_ui(&mut h.ui_rx);
    assert!(updates
        .iter()
        .any(|u| matches!(u, UiUpdate::PaidFlag { value: false, .. })));
    assert!(updates
        .iter()
        .any(|u| matches!(u, UiUpdate::Notification(n) if n.title == "Could not update status")));
}

// ===========================================================================
// Draw timer
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn timer_counts_down_to_expiry() {
    let mut h = harness();

    app::handle_user_command(&mut h.state, UserCommand::StartTimer, &h.ui_tx).await;
    assert_eq!(h.state.timer.phase(), TimerPhase::Running);
    assert_eq!(h.state.timer.remaining(), 3);

    let mut guard = 0;
    while h.state.timer.phase() == TimerPhase::Running {
        let tick = wait_for(&mut h.core_rx, |e| matches!(e, CoreEvent::TimerTick { .. })).await;
        app::handle_core_event(&mut h.state, tick, &h.ui_tx).await;
        guard += 1;
        assert!(guard < 20, "timer never expired");
    }

    assert_eq!(h.state.timer.phase(), TimerPhase::Expired);
    assert_eq!(h.state.timer.remaining(), 0);

    let updates = drain_ui(&mut h.ui_rx);
    assert!(updates.iter().any(|u| matches!(
        u,
        UiUpdate::TimerFrame {
            phase: TimerPhase::Expired,
            remaining: 0,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn stopping_the_timer_silences_queued_ticks() {
    let mut h = harness();

    app::handle_user_command(&mut h.state, UserCommand::StartTimer, &h.ui_tx).await;
    let tick = wait_for(&mut h.core_rx, |e| matches!(e, CoreEvent::TimerTick { .. })).await;
    app::handle_core_event(&mut h.state, tick, &h.ui_tx).await;
    assert_eq!(h.state.timer.remaining(), 2);

    app::handle_user_command(&mut h.state, UserCommand::StopTimer, &h.ui_tx).await;
    assert_eq!(h.state.timer.phase(), TimerPhase::Stopped);
    drain_ui(&mut h.ui_rx);

    app::handle_core_event(&mut h.state, CoreEvent::TimerTick { generation: 1 }, &h.ui_tx).await;
    assert_eq!(h.state.timer.phase(), TimerPhase::Stopped);
    assert!(h.ui_rx.try_recv().is_err());
}
