// Message types flowing between the TUI, the orchestrator, and spawned
// tasks. Three channels: `UserCommand` (TUI input -> orchestrator),
// `CoreEvent` (spawned fetch/timer tasks -> orchestrator), and `UiUpdate`
// (orchestrator -> TUI render loop).

use crate::api::types::{Candidate, Committee, Draw, DrawWinner, PaidRow, Profile};
use crate::api::{ApiError, NewCommittee, NewMember};
use crate::committee::reveal::RevealPhase;
use crate::committee::timer::TimerPhase;
use crate::committee::{FieldKey, ToggleKey};

// ---------------------------------------------------------------------------
// User commands (TUI -> orchestrator)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Quit,
    Login { phone: String, password: String },
    Logout,
    ChangePassword { old: String, new: String },

    /// Reload the committee list.
    RefreshCommittees,
    /// Open one committee's detail view (fetches its draws).
    OpenCommittee { committee_id: i64 },
    CreateCommittee(NewCommittee),
    AddMember(NewMember),
    /// Open the member roster overlay for the selected committee.
    ShowMembers { committee_id: i64 },
    /// Open the per-member payment breakdown for one draw.
    ShowPaidRows { committee_id: i64, draw_id: i64 },

    /// A keystroke in an inline amount editor.
    EditAmount { key: FieldKey, raw: String },
    /// Commit the pending edit now (Enter or focus left the cell).
    FlushEdit { key: FieldKey },
    /// Abandon the pending edit (Escape).
    CancelEdit { key: FieldKey },

    TogglePaid { committee_id: i64, key: ToggleKey },

    /// Run the lottery for one draw of the selected committee.
    StartReveal { committee_id: i64, draw_id: i64 },
    ConfirmReveal,
    CancelReveal,

    StartTimer,
    StopTimer,
}

// ---------------------------------------------------------------------------
// Core events (spawned tasks -> orchestrator)
// ---------------------------------------------------------------------------

/// Results and timers reported back into the main event loop. Fetch results
/// and animation ticks carry the generation assigned when their task was
/// spawned; stale generations are discarded.
#[derive(Debug)]
pub enum CoreEvent {
    LoginResolved {
        result: Result<Profile, ApiError>,
    },
    LogoutResolved {
        result: Result<(), ApiError>,
    },
    PasswordChanged {
        result: Result<(), ApiError>,
    },

    CommitteesLoaded {
        generation: u64,
        result: Result<Vec<Committee>, ApiError>,
    },
    CommitteeCreated {
        result: Result<(), ApiError>,
    },
    MemberAdded {
        result: Result<(), ApiError>,
    },
    MembersLoaded {
        generation: u64,
        result: Result<Vec<Candidate>, ApiError>,
    },
    DrawsLoaded {
        generation: u64,
        committee_id: i64,
        result: Result<Vec<Draw>, ApiError>,
    },
    PaidRowsLoaded {
        generation: u64,
        draw_id: i64,
        result: Result<Vec<PaidRow>, ApiError>,
    },
    WinnerLoaded {
        generation: u64,
        result: Result<DrawWinner, ApiError>,
    },
    /// The confirmed winner's completion write finished.
    WinnerConfirmed {
        result: Result<(), ApiError>,
    },

    /// A debounce settle window elapsed for one editable field.
    CommitSettle { key: FieldKey, generation: u64 },
    /// A field write finished.
    CommitResolved {
        key: FieldKey,
        result: Result<f64, ApiError>,
    },
    /// A paid-flag write finished.
    ToggleResolved {
        key: ToggleKey,
        result: Result<(), ApiError>,
    },

    /// Reveal animation frame tick.
    RevealTick { generation: u64 },
    /// Countdown second tick.
    TimerTick { generation: u64 },
}

// ---------------------------------------------------------------------------
// UI updates (orchestrator -> TUI)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

/// A transient banner shown in the status bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Notification {
            kind: NotificationKind::Info,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn success(title: impl Into<String>, body: impl Into<String>) -> Self {
        Notification {
            kind: NotificationKind::Success,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Notification {
            kind: NotificationKind::Error,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// One frame of the reveal overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealFrame {
    pub phase: RevealPhase,
    pub roster: Vec<Candidate>,
    /// Highlight position within the tripled roster strip.
    pub strip_position: Option<usize>,
    pub winner: Option<Candidate>,
}

#[derive(Debug, Clone)]
pub enum UiUpdate {
    LoggedIn(Box<Profile>),
    LoggedOut,
    /// The backend rejected our token; the TUI drops to the login screen.
    SessionExpired,

    Committees(Vec<Committee>),
    Draws {
        committee_id: i64,
        draws: Vec<Draw>,
    },
    Members {
        committee_id: i64,
        members: Vec<Candidate>,
    },
    PaidRows {
        draw_id: i64,
        rows: Vec<PaidRow>,
    },

    /// A field write landed; the cell shows the committed value.
    AmountCommitted { key: FieldKey, amount: f64 },
    /// A field write failed; the cell reverts to this value.
    AmountReverted {
        key: FieldKey,
        value: Option<f64>,
    },
    /// Current display value of a paid flag (optimistic or rolled back).
    PaidFlag { key: ToggleKey, value: bool },

    RevealFrame(Box<RevealFrame>),
    TimerFrame {
        phase: TimerPhase,
        remaining: u32,
        total: u32,
    },

    Notification(Notification),
}
