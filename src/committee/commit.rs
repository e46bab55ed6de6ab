// Debounced field-commit controller.
//
// Manages pending edits to scalar amount fields (draw amount, per-member
// paid amount). Edits coalesce inside a settle window; blur/Enter flushes
// immediately; Escape cancels. At most one commit per field is ever in
// flight: an edit arriving mid-commit is buffered and fired right after the
// in-flight commit resolves, never concurrently and never dropped.
//
// The controller is synchronous state plus one spawned sleep task per field;
// the orchestrator receives `CoreEvent::CommitSettle` when a settle window
// elapses and `CoreEvent::CommitResolved` when the network write finishes,
// and feeds both back in here. Settle tasks are generation-tagged so an
// aborted-but-already-queued tick is ignored.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::ApiError;
use crate::protocol::CoreEvent;

// ---------------------------------------------------------------------------
// Keys and requests
// ---------------------------------------------------------------------------

/// Identifies one editable entity+attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    /// The payout amount of one draw.
    DrawAmount { committee_id: i64, draw_id: i64 },
    /// The amount one member has paid toward one draw.
    MemberPaid {
        committee_id: i64,
        draw_id: i64,
        user_id: i64,
    },
}

/// A validated commit the orchestrator should send to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
    pub key: FieldKey,
    pub amount: f64,
}

/// The write seam, mockable in tests.
#[async_trait]
pub trait CommitSink: Send + Sync {
    /// Persist the amount; returns the committed value on success.
    async fn commit(&self, request: &CommitRequest) -> Result<f64, ApiError>;
}

/// Outcome of a resolved commit, for the orchestrator to act on.
#[derive(Debug, PartialEq)]
pub enum CommitResolution {
    Committed {
        amount: f64,
        /// A buffered edit that passed the commit policy and should be sent
        /// next (already marked in-flight).
        followup: Option<CommitRequest>,
    },
    Failed {
        error: ApiError,
        /// Value the field should visually revert to.
        revert_to: Option<f64>,
        followup: Option<CommitRequest>,
    },
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

struct PendingEdit {
    /// Latest user-typed value, possibly not yet valid.
    raw: Option<String>,
    /// Last value known to be persisted; commits that wouldn't change it are
    /// skipped silently.
    last_committed: Option<f64>,
    /// Handle of the running settle timer, if any.
    settle_timer: Option<JoinHandle<()>>,
    /// Tag for the current settle timer; stale ticks are ignored.
    generation: u64,
    in_flight: bool,
    /// Edit buffered while a commit was in flight.
    queued: Option<String>,
}

impl PendingEdit {
    fn new(last_committed: Option<f64>) -> Self {
        PendingEdit {
            raw: None,
            last_committed,
            settle_timer: None,
            generation: 0,
            in_flight: false,
            queued: None,
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.settle_timer.take() {
            timer.abort();
        }
        self.generation += 1;
    }
}

pub struct DebouncedCommitController {
    settle: Duration,
    fields: HashMap<FieldKey, PendingEdit>,
    events: mpsc::Sender<CoreEvent>,
}

impl DebouncedCommitController {
    pub fn new(settle: Duration, events: mpsc::Sender<CoreEvent>) -> Self {
        DebouncedCommitController {
            settle,
            fields: HashMap::new(),
            events,
        }
    }

    /// Seed (or reseed after a refresh) the persisted value for a field.
    /// Reseeding drops any stale pending edit but leaves an in-flight commit
    /// to resolve normally.
    pub fn register(&mut self, key: FieldKey, current: Option<f64>) {
        match self.fields.get_mut(&key) {
            Some(field) => {
                field.last_committed = current;
                if !field.in_flight {
                    field.cancel_timer();
                    field.raw = None;
                }
            }
            None => {
                self.fields.insert(key, PendingEdit::new(current));
            }
        }
    }

    /// Record a keystroke and restart the settle timer.
    pub fn edit(&mut self, key: FieldKey, raw: String) {
        let settle = self.settle;
        let events = self.events.clone();
        let field = self
            .fields
            .entry(key)
            .or_insert_with(|| PendingEdit::new(None));

        field.raw = Some(raw);
        field.cancel_timer();
        let generation = field.generation;

        field.settle_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            let _ = events.send(CoreEvent::CommitSettle { key, generation }).await;
        }));
    }

    /// The settle window elapsed. Returns a commit to send, if the pending
    /// value passes the commit policy.
    pub fn settle_elapsed(&mut self, key: FieldKey, generation: u64) -> Option<CommitRequest> {
        let field = self.fields.get_mut(&key)?;
        if generation != field.generation {
            // A newer edit or a flush/cancel superseded this timer.
            return None;
        }
        field.settle_timer = None;
        Self::begin_commit(key, field)
    }

    /// Commit immediately (blur, Enter), skipping the rest of the window.
    pub fn flush(&mut self, key: FieldKey) -> Option<CommitRequest> {
        let field = self.fields.get_mut(&key)?;
        field.cancel_timer();
        Self::begin_commit(key, field)
    }

    /// Abandon the pending edit without committing (Escape).
    pub fn cancel(&mut self, key: FieldKey) {
        if let Some(field) = self.fields.get_mut(&key) {
            field.cancel_timer();
            field.raw = None;
            field.queued = None;
        }
    }

    /// The network write finished. On success the committed value becomes
    /// the new baseline; on failure the caller reverts the field display.
    /// Either way a buffered edit is re-validated and may yield a follow-up
    /// commit.
    pub fn commit_resolved(
        &mut self,
        key: FieldKey,
        result: Result<f64, ApiError>,
    ) -> Option<CommitResolution> {
        let field = self.fields.get_mut(&key)?;
        if !field.in_flight {
            debug!(?key, "commit resolution for a field with no in-flight commit");
            return None;
        }
        field.in_flight = false;

        match result {
            Ok(amount) => {
                field.last_committed = Some(amount);
                let followup = Self::take_queued(key, field);
                Some(CommitResolution::Committed { amount, followup })
            }
            Err(error) => {
                let revert_to = field.last_committed;
                field.raw = None;
                let followup = Self::take_queued(key, field);
                Some(CommitResolution::Failed {
                    error,
                    revert_to,
                    followup,
                })
            }
        }
    }

    /// Last persisted value for a field, if known.
    pub fn last_committed(&self, key: FieldKey) -> Option<f64> {
        self.fields.get(&key).and_then(|f| f.last_committed)
    }

    pub fn is_in_flight(&self, key: FieldKey) -> bool {
        self.fields.get(&key).map(|f| f.in_flight).unwrap_or(false)
    }

    // -- internals ----------------------------------------------------------

    /// Apply the commit policy to the pending raw value. Invalid or
    /// unchanged values are dropped silently (local validation failure,
    /// never surfaced). While a commit is in flight the value is buffered
    /// instead.
    fn begin_commit(key: FieldKey, field: &mut PendingEdit) -> Option<CommitRequest> {
        let raw = field.raw.take()?;

        if field.in_flight {
            field.queued = Some(raw);
            return None;
        }

        let amount = parse_amount(&raw)?;
        if Some(amount) == field.last_committed {
            return None;
        }

        field.in_flight = true;
        Some(CommitRequest { key, amount })
    }

    fn take_queued(key: FieldKey, field: &mut PendingEdit) -> Option<CommitRequest> {
        let raw = field.queued.take()?;
        let amount = parse_amount(&raw)?;
        if Some(amount) == field.last_committed {
            return None;
        }
        field.in_flight = true;
        Some(CommitRequest { key, amount })
    }
}

/// Commit policy's value check: a finite, strictly positive number.
fn parse_amount(raw: &str) -> Option<f64> {
    let amount: f64 = raw.trim().parse().ok()?;
    (amount.is_finite() && amount > 0.0).then_some(amount)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: FieldKey = FieldKey::DrawAmount {
        committee_id: 1,
        draw_id: 10,
    };

    fn controller() -> (DebouncedCommitController, mpsc::Receiver<CoreEvent>) {
        let (tx, rx) = mpsc::channel(16);
        (
            DebouncedCommitController::new(Duration::from_secs(2), tx),
            rx,
        )
    }

    /// Drive the settle timer to completion and feed the tick back in.
    async fn settle(
        ctrl: &mut DebouncedCommitController,
        rx: &mut mpsc::Receiver<CoreEvent>,
    ) -> Option<CommitRequest> {
        tokio::time::advance(Duration::from_millis(2001)).await;
        match rx.recv().await {
            Some(CoreEvent::CommitSettle { key, generation }) => {
                ctrl.settle_elapsed(key, generation)
            }
            other => panic!("expected CommitSettle, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_coalesce_to_one_commit_with_last_value() {
        let (mut ctrl, mut rx) = controller();
        ctrl.register(KEY, Some(100.0));

        ctrl.edit(KEY, "5".into());
        tokio::time::advance(Duration::from_millis(500)).await;
        ctrl.edit(KEY, "12".into());
        tokio::time::advance(Duration::from_millis(500)).await;
        ctrl.edit(KEY, "7".into());

        let request = settle(&mut ctrl, &mut rx).await.expect("one commit");
        assert_eq!(request, CommitRequest { key: KEY, amount: 7.0 });

        // The superseded timers fired nothing further.
        tokio::time::advance(Duration::from_secs(10)).await;
        while let Ok(event) = rx.try_recv() {
            if let CoreEvent::CommitSettle { key, generation } = event {
                assert!(ctrl.settle_elapsed(key, generation).is_none());
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn flush_commits_immediately() {
        let (mut ctrl, _rx) = controller();
        ctrl.register(KEY, Some(100.0));

        ctrl.edit(KEY, "150".into());
        let request = ctrl.flush(KEY).expect("immediate commit");
        assert_eq!(request.amount, 150.0);
        assert!(ctrl.is_in_flight(KEY));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending_edit() {
        let (mut ctrl, mut rx) = controller();
        ctrl.register(KEY, Some(100.0));

        ctrl.edit(KEY, "999".into());
        ctrl.cancel(KEY);

        tokio::time::advance(Duration::from_secs(5)).await;
        // Any stale tick must be a no-op.
        while let Ok(event) = rx.try_recv() {
            if let CoreEvent::CommitSettle { key, generation } = event {
                assert!(ctrl.settle_elapsed(key, generation).is_none());
            }
        }
        assert!(ctrl.flush(KEY).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_and_unchanged_values_are_skipped_silently() {
        let (mut ctrl, mut rx) = controller();
        ctrl.register(KEY, Some(100.0));

        ctrl.edit(KEY, "abc".into());
        assert!(settle(&mut ctrl, &mut rx).await.is_none());

        ctrl.edit(KEY, "-5".into());
        assert!(settle(&mut ctrl, &mut rx).await.is_none());

        ctrl.edit(KEY, "0".into());
        assert!(settle(&mut ctrl, &mut rx).await.is_none());

        // Same as last committed: no-op.
        ctrl.edit(KEY, "100".into());
        assert!(settle(&mut ctrl, &mut rx).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn edit_during_in_flight_commit_is_buffered_not_concurrent() {
        let (mut ctrl, _rx) = controller();
        ctrl.register(KEY, Some(100.0));

        ctrl.edit(KEY, "150".into());
        let first = ctrl.flush(KEY).expect("first commit");
        assert_eq!(first.amount, 150.0);

        // Second edit while the first is in flight: flush buffers it.
        ctrl.edit(KEY, "200".into());
        assert!(ctrl.flush(KEY).is_none(), "no concurrent commit");

        // First commit succeeds; buffered edit fires as the follow-up.
        let resolution = ctrl.commit_resolved(KEY, Ok(150.0)).unwrap();
        match resolution {
            CommitResolution::Committed { amount, followup } => {
                assert_eq!(amount, 150.0);
                let followup = followup.expect("buffered edit committed next");
                assert_eq!(followup.amount, 200.0);
            }
            other => panic!("expected Committed, got {other:?}"),
        }
        assert!(ctrl.is_in_flight(KEY));
        assert_eq!(ctrl.last_committed(KEY), Some(150.0));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_commit_reports_revert_value() {
        let (mut ctrl, _rx) = controller();
        ctrl.register(KEY, Some(100.0));

        ctrl.edit(KEY, "175".into());
        ctrl.flush(KEY).expect("commit sent");

        let error = ApiError::Server {
            status: 500,
            message: "update failed".into(),
        };
        let resolution = ctrl.commit_resolved(KEY, Err(error.clone())).unwrap();
        match resolution {
            CommitResolution::Failed {
                error: e,
                revert_to,
                followup,
            } => {
                assert_eq!(e, error);
                assert_eq!(revert_to, Some(100.0));
                assert!(followup.is_none());
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(ctrl.last_committed(KEY), Some(100.0));
        assert!(!ctrl.is_in_flight(KEY));
    }

    #[tokio::test(start_paused = true)]
    async fn buffered_edit_matching_new_baseline_is_dropped() {
        let (mut ctrl, _rx) = controller();
        ctrl.register(KEY, Some(100.0));

        ctrl.edit(KEY, "150".into());
        ctrl.flush(KEY).unwrap();
        ctrl.edit(KEY, "150".into());
        assert!(ctrl.flush(KEY).is_none());

        // The buffered "150" equals the newly committed baseline: no follow-up.
        let resolution = ctrl.commit_resolved(KEY, Ok(150.0)).unwrap();
        assert_eq!(
            resolution,
            CommitResolution::Committed {
                amount: 150.0,
                followup: None
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fields_are_independent() {
        let other = FieldKey::MemberPaid {
            committee_id: 1,
            draw_id: 10,
            user_id: 3,
        };
        let (mut ctrl, _rx) = controller();
        ctrl.register(KEY, Some(100.0));
        ctrl.register(other, Some(50.0));

        ctrl.edit(KEY, "150".into());
        ctrl.edit(other, "75".into());

        let a = ctrl.flush(KEY).unwrap();
        let b = ctrl.flush(other).unwrap();
        assert_eq!(a.amount, 150.0);
        assert_eq!(b.amount, 75.0);
        assert!(ctrl.is_in_flight(KEY));
        assert!(ctrl.is_in_flight(other));
    }
}
