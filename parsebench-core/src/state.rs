// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Worker session state machine with typed state transitions.
//!
//! Implements the session lifecycle: Stopped → Starting → Ready ⇄ Busy → Stopped.
//! Invalid transitions result in StateTransitionError.

use serde::{Deserialize, Serialize};

use crate::error::StateTransitionError;

/// Worker session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No worker process. The next call must start one.
    Stopped,

    /// Worker spawned, waiting for the readiness line.
    Starting,

    /// Worker passed the handshake and is idle.
    Ready,

    /// A request is in flight.
    Busy,
}

impl SessionState {
    /// Get the state name for error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Starting => "Starting",
            Self::Ready => "Ready",
            Self::Busy => "Busy",
        }
    }

    /// Check if transition to the target state is valid.
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        matches!(
            (self, target),
            (Self::Stopped, Self::Starting)
                | (Self::Starting, Self::Ready)
                | (Self::Starting, Self::Stopped)
                | (Self::Ready, Self::Busy)
                | (Self::Ready, Self::Stopped)
                | (Self::Busy, Self::Ready)
                | (Self::Busy, Self::Stopped)
        )
    }

    /// A worker handle exists in exactly these states.
    pub fn has_worker(&self) -> bool {
        matches!(self, Self::Ready | Self::Busy)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// State machine for one worker session.
#[derive(Debug)]
pub struct SessionStateMachine {
    current_state: SessionState,
    transition_count: u64,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: SessionState::Stopped,
            transition_count: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.current_state
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: SessionState) -> Result<(), StateTransitionError> {
        if !self.current_state.can_transition_to(target) {
            return Err(StateTransitionError::InvalidTransition {
                from: self.current_state.name(),
                to: target.name(),
            });
        }

        tracing::trace!(
            from = self.current_state.name(),
            to = target.name(),
            "Session state transition"
        );

        self.current_state = target;
        self.transition_count += 1;

        Ok(())
    }

    /// Move to `Stopped` from any state. A no-op when already stopped.
    pub fn force_stopped(&mut self) {
        if self.current_state != SessionState::Stopped {
            tracing::trace!(from = self.current_state.name(), "Session forced to Stopped");
            self.current_state = SessionState::Stopped;
                self.transition_count += 1;
        }
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
