//! Per-request relay state machine.
//!
//! # State Transitions
//! ```text
//! Received → Validated → Relaying → Succeeded
//!                            │    → Failed
//!                            └──→ Retrying → Relaying   (at most once)
//! Received → Failed                                      (validation)
//! ```
//!
//! `Succeeded` and `Failed` are terminal.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Received,
    Validated,
    Relaying,
    Retrying,
    Succeeded,
    Failed,
}

impl RelayState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RelayState::Succeeded | RelayState::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal relay transition {from:?} → {to:?}")]
pub struct InvalidTransition {
    pub from: RelayState,
    pub to: RelayState,
}

/// Tracks one request through the relay states.
#[derive(Debug, Clone)]
pub struct RelayLifecycle {
    state: RelayState,
    retries: u32,
}

impl RelayLifecycle {
    pub fn new() -> Self {
        Self {
            state: RelayState::Received,
            retries: 0,
        }
    }

    /// A lifecycle for a request that already passed validation.
    pub fn validated() -> Self {
        Self {
            state: RelayState::Validated,
            retries: 0,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Move to `next`, refusing anything outside the diagram above. A second
    /// pass through `Retrying` is refused.
    pub fn advance(&mut self, next: RelayState) -> Result<(), InvalidTransition> {
        use RelayState::*;

        let allowed = match (self.state, next) {
            (Received, Validated) | (Received, Failed) => true,
            (Validated, Relaying) => true,
            (Relaying, Succeeded) | (Relaying, Failed) => true,
            (Relaying, Retrying) => self.retries == 0,
            (Retrying, Relaying) => true,
            _ => false,
        };

        if !allowed {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        if next == Retrying {
            self.retries += 1;
        }
        self.state = next;
        Ok(())
    }

    /// [`advance`](Self::advance), logging instead of returning a refusal.
    pub fn transition(&mut self, next: RelayState, request_id: &str) {
        match self.advance(next) {
            Ok(()) => tracing::trace!(request_id = %request_id, state = ?next, "Relay state"),
            Err(e) => tracing::error!(request_id = %request_id, error = %e, "Relay state machine violated"),
        }
    }
}

impl Default for RelayLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
