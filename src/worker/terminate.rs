//! Forced termination of running workers.
//!
//! Each worker owns a [`TerminationSlot`] tracking the identity of its
//! execution unit. The slot is armed with the task's abort handle when the
//! worker starts and retired when it exits, so a termination request can
//! never land on a reused identity: injecting into a retired slot fails with
//! [`TerminateError::TargetNotFound`] instead of silently succeeding.
//!
//! The abort only takes effect at the target's next await point. A task
//! stuck in blocking, non-async code is not interrupted until it yields
//! again; this is a documented limitation of forced termination.

use std::sync::Mutex;

use thiserror::Error;
use tokio::task::AbortHandle;

#[derive(Debug, Error)]
pub enum TerminateError {
    /// The worker already exited; its identity is no longer valid.
    #[error("worker '{name}' is not running")]
    TargetNotFound { name: String },

    /// A termination signal was already injected into this worker.
    #[error("termination already injected into worker '{name}'")]
    AlreadyTerminated { name: String },

    /// The injection mechanism itself misbehaved.
    #[error("termination mechanism failed for worker '{name}': {reason}")]
    Mechanism { name: String, reason: String },
}

#[derive(Debug)]
enum SlotState {
    Unarmed,
    Armed { abort: AbortHandle, injected: bool },
    Retired,
}

/// Lifecycle of a worker's execution-unit identity.
#[derive(Debug)]
pub struct TerminationSlot {
    state: Mutex<SlotState>,
}

impl TerminationSlot {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Unarmed),
        }
    }

    /// Register the abort handle of the freshly spawned execution unit.
    pub(crate) fn arm(&self, abort: AbortHandle) {
        if let Ok(mut state) = self.state.lock() {
            *state = SlotState::Armed {
                abort,
                injected: false,
            };
        }
    }

    /// Invalidate the identity once the worker has exited.
    pub(crate) fn retire(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = SlotState::Retired;
        }
    }

    pub(crate) fn is_retired(&self) -> bool {
        match self.state.lock() {
            Ok(state) => matches!(*state, SlotState::Retired),
            Err(_) => false,
        }
    }

    /// Inject the termination signal, exactly once per worker lifetime.
    ///
    /// Fails loudly on a second injection and on any injection after the
    /// worker exited, rather than corrupting an unrelated execution unit.
    pub fn inject(&self, name: &str) -> Result<(), TerminateError> {
        let mut state = self.state.lock().map_err(|_| TerminateError::Mechanism {
            name: name.to_string(),
            reason: "lifecycle state poisoned".to_string(),
        })?;

        match &mut *state {
            SlotState::Unarmed => Err(TerminateError::Mechanism {
                name: name.to_string(),
                reason: "execution unit never registered".to_string(),
            }),
            SlotState::Armed { injected: true, .. } => Err(TerminateError::AlreadyTerminated {
                name: name.to_string(),
            }),
            SlotState::Armed { abort, injected } => {
                abort.abort();
                *injected = true;
                Ok(())
            }
            SlotState::Retired => Err(TerminateError::TargetNotFound {
                name: name.to_string(),
            }),
        }
    }
}
