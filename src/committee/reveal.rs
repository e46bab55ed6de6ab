// Lottery reveal state machine.
//
// Drives the winner-reveal animation for a draw: `Idle → Requesting →
// Animating → Settled → Confirmed | Cancelled`. The server picks the winner;
// this controller resolves that winner to a roster index, then animates a
// scrolling highlight that decelerates and lands exactly on the winner after
// a fixed duration. All randomness happens once, at index resolution; the
// animation itself is a pure function of elapsed time.
//
// Ticks come from a spawned interval task sending generation-tagged
// `CoreEvent::RevealTick`s; cancelling bumps the generation so a tick already
// sitting in the channel is discarded.

use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::types::{Candidate, DrawWinner};
use crate::protocol::CoreEvent;

/// Full loops over the roster before the highlight decelerates onto the
/// winner.
const EXTRA_LOOPS: usize = 5;

/// Tick cadence while animating.
const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Error, PartialEq)]
pub enum RevealError {
    #[error("cannot run a draw with no eligible members")]
    EmptyRoster,
    #[error("reveal already in progress")]
    AlreadyActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPhase {
    Idle,
    Requesting,
    Animating,
    Settled,
    Confirmed,
    Cancelled,
}

struct RevealSession {
    /// Roster snapshot, frozen for the whole session so indices stay stable.
    roster: Vec<Candidate>,
    winner: Option<DrawWinner>,
    resolved_index: usize,
    started_at: Option<Instant>,
}

pub struct DrawRevealController {
    phase: RevealPhase,
    session: Option<RevealSession>,
    duration: Duration,
    generation: u64,
    ticker: Option<JoinHandle<()>>,
    events: mpsc::Sender<CoreEvent>,
}

impl DrawRevealController {
    pub fn new(duration: Duration, events: mpsc::Sender<CoreEvent>) -> Self {
        DrawRevealController {
            phase: RevealPhase::Idle,
            session: None,
            duration,
            generation: 0,
            ticker: None,
            events,
        }
    }

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    /// Freeze the roster and enter Requesting. The caller then issues the
    /// winner fetch and feeds the result back via `winner_received` or
    /// `request_failed`.
    pub fn begin_request(&mut self, roster: Vec<Candidate>) -> Result<(), RevealError> {
        match self.phase {
            RevealPhase::Requesting | RevealPhase::Animating | RevealPhase::Settled => {
                return Err(RevealError::AlreadyActive);
            }
            _ => {}
        }
        if roster.is_empty() {
            return Err(RevealError::EmptyRoster);
        }
        self.session = Some(RevealSession {
            roster,
            winner: None,
            resolved_index: 0,
            started_at: None,
        });
        self.phase = RevealPhase::Requesting;
        Ok(())
    }

    /// The server chose a winner. Resolve it to a roster index and start the
    /// animation clock and tick task.
    pub fn winner_received(&mut self, winner: DrawWinner) {
        if self.phase != RevealPhase::Requesting {
            debug!(phase = ?self.phase, "winner arrived outside Requesting, dropped");
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        session.resolved_index = resolve_winner_index(&session.roster, &winner);
        session.winner = Some(winner);
        session.started_at = Some(Instant::now());
        self.phase = RevealPhase::Animating;

        self.generation += 1;
        let generation = self.generation;
        let events = self.events.clone();
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            interval.tick().await; // completes immediately
            loop {
                interval.tick().await;
                if events
                    .send(CoreEvent::RevealTick { generation })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }));
    }

    /// The winner fetch failed: destroy the session, back to Idle. The
    /// caller surfaces the error; there is no automatic retry.
    pub fn request_failed(&mut self) {
        if self.phase == RevealPhase::Requesting {
            self.session = None;
            self.phase = RevealPhase::Idle;
        }
    }

    /// Advance the animation. Returns `true` if the view should redraw.
    /// Settles (and stops the ticker) once the full duration has elapsed.
    pub fn tick(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.phase != RevealPhase::Animating {
            return false;
        }
        let elapsed = self
            .session
            .as_ref()
            .and_then(|s| s.started_at)
            .map(|t| t.elapsed())
            .unwrap_or_default();
        if elapsed >= self.duration {
            self.phase = RevealPhase::Settled;
            self.stop_ticker();
        }
        true
    }

    /// Position of the highlight within the tripled roster strip, or `None`
    /// outside Animating/Settled/Confirmed.
    pub fn strip_position(&self) -> Option<usize> {
        let session = self.session.as_ref()?;
        let len = session.roster.len();
        match self.phase {
            RevealPhase::Animating => {
                let started = session.started_at?;
                let steps = eased_steps(
                    started.elapsed(),
                    self.duration,
                    EXTRA_LOOPS * len + session.resolved_index,
                );
                Some(steps % (len * 3))
            }
            RevealPhase::Settled | RevealPhase::Confirmed => {
                let total = EXTRA_LOOPS * len + session.resolved_index;
                Some(total % (len * 3))
            }
            _ => None,
        }
    }

    /// The candidate currently under the highlight.
    pub fn highlighted(&self) -> Option<&Candidate> {
        let session = self.session.as_ref()?;
        let position = self.strip_position()?;
        session.roster.get(position % session.roster.len())
    }

    /// The reveal roster, for rendering the strip.
    pub fn roster(&self) -> Option<&[Candidate]> {
        self.session.as_ref().map(|s| s.roster.as_slice())
    }

    /// The settled winner, available from Settled onward.
    pub fn winner(&self) -> Option<&Candidate> {
        if !matches!(self.phase, RevealPhase::Settled | RevealPhase::Confirmed) {
            return None;
        }
        let session = self.session.as_ref()?;
        session.roster.get(session.resolved_index)
    }

    /// Accept the settled winner. Returns the candidate exactly once so the
    /// caller issues exactly one completion write.
    pub fn confirm(&mut self) -> Option<Candidate> {
        if self.phase != RevealPhase::Settled {
            return None;
        }
        self.phase = RevealPhase::Confirmed;
        let session = self.session.as_ref()?;
        session.roster.get(session.resolved_index).cloned()
    }

    /// Abandon the session at any point. Stops the ticker and invalidates
    /// pending ticks; nothing is committed.
    pub fn cancel(&mut self) {
        self.stop_ticker();
        self.generation += 1;
        self.session = None;
        self.phase = RevealPhase::Cancelled;
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for DrawRevealController {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

/// Match the server's winner to a roster index: by id, then by phone. A
/// winner that matches neither (roster drifted between fetch and draw) gets
/// a uniformly random in-bounds index so the reveal still lands somewhere
/// real.
fn resolve_winner_index(roster: &[Candidate], winner: &DrawWinner) -> usize {
    if let Some(id) = winner.id {
        if let Some(i) = roster.iter().position(|c| c.id == Some(id)) {
            return i;
        }
    }
    if let Some(phone) = winner.phone.as_deref() {
        if let Some(i) = roster
            .iter()
            .position(|c| c.phone.as_deref() == Some(phone))
        {
            return i;
        }
    }
    warn!(winner_id = ?winner.id, "winner not in roster snapshot, falling back to random index");
    rand::rng().random_range(0..roster.len())
}

/// Cubic ease-out over `total_steps`: fast start, monotonic deceleration,
/// lands exactly on `total_steps` at `duration`.
fn eased_steps(elapsed: Duration, duration: Duration, total_steps: usize) -> usize {
    if duration.is_zero() || elapsed >= duration {
        return total_steps;
    }
    let u = elapsed.as_secs_f64() / duration.as_secs_f64();
    let eased = 1.0 - (1.0 - u).powi(3);
    ((eased * total_steps as f64) as usize).min(total_steps)
}
