// Optimistic toggle controller for per-member "paid this draw" flags.
//
// Activation flips the local flag immediately and marks the pair in flight;
// further activations for the same pair are ignored until the backend
// responds. Success keeps the optimistic value without a refetch; failure
// rolls the flag back to its pre-toggle value.

use std::collections::HashMap;

use tracing::debug;

use crate::api::ApiError;

/// One member's flag within one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToggleKey {
    pub draw_id: i64,
    pub user_id: i64,
}

struct ToggleState {
    value: bool,
    /// Pre-toggle value to roll back to on failure. Present only while a
    /// request is in flight.
    rollback: Option<bool>,
}

/// Request the orchestrator should send to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToggleRequest {
    pub key: ToggleKey,
    pub desired: bool,
}

#[derive(Default)]
pub struct OptimisticToggleController {
    flags: HashMap<ToggleKey, ToggleState>,
}

impl OptimisticToggleController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or refresh a flag from server data. An in-flight toggle keeps its
    /// optimistic value; the server snapshot may predate the toggle.
    pub fn sync(&mut self, key: ToggleKey, value: bool) {
        match self.flags.get_mut(&key) {
            Some(state) if state.rollback.is_some() => {}
            Some(state) => state.value = value,
            None => {
                self.flags.insert(key, ToggleState { value, rollback: None });
            }
        }
    }

    /// Flip a flag optimistically. Returns the request to send, or `None`
    /// when the pair already has a request in flight or is unknown.
    pub fn toggle(&mut self, key: ToggleKey) -> Option<ToggleRequest> {
        let state = self.flags.get_mut(&key)?;
        if state.rollback.is_some() {
            debug!(?key, "toggle ignored, request already in flight");
            return None;
        }
        state.rollback = Some(state.value);
        state.value = !state.value;
        Some(ToggleRequest {
            key,
            desired: state.value,
        })
    }

    /// The backend responded. On failure returns the error so the caller can
    /// surface it; the flag has already been rolled back.
    pub fn resolved(&mut self, key: ToggleKey, result: Result<(), ApiError>) -> Option<ApiError> {
        let state = self.flags.get_mut(&key)?;
        let rollback = state.rollback.take()?;
        match result {
            Ok(()) => None,
            Err(error) => {
                state.value = rollback;
                Some(error)
            }
        }
    }

    /// Current display value for a flag.
    pub fn value(&self, key: ToggleKey) -> Option<bool> {
        self.flags.get(&key).map(|s| s.value)
    }

    pub fn is_in_flight(&self, key: ToggleKey) -> bool {
        self.flags
            .get(&key)
            .map(|s| s.rollback.is_some())
            .unwrap_or(false)
    }
}
