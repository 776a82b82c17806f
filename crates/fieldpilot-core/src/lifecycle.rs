//! Two-state operation lifecycle.
//!
//! | State     | Event | Action          | Next state |
//! |-----------|-------|-----------------|------------|
//! | Stopped   | start | start sequence  | Operating (if the start succeeds) |
//! | Stopped   | stop  | none            | Stopped |
//! | Stopped   | step  | none            | Stopped |
//! | Operating | start | reject          | Operating |
//! | Operating | stop  | stop sequence   | Stopped |
//! | Operating | step  | simulation step | Operating, or Stopped if the step ends the operation |
//!
//! [`OperationState::on`] only decides the action; the control unit performs
//! it and records the resulting state.

use serde::{Deserialize, Serialize};

/// Whether an operation is in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    /// No operation running.
    #[default]
    Stopped,
    /// An operation is running.
    Operating,
}

/// Requests that drive the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Start an operation.
    Start,
    /// Stop the current operation.
    Stop,
    /// Advance the simulation by one step.
    Step,
}

/// What the control unit must do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    /// Run the start sequence.
    BeginOperation,
    /// Run the stop sequence.
    EndOperation,
    /// Run one simulation step.
    Advance,
    /// Refuse the request and warn.
    Reject,
    /// Nothing to do.
    Ignore,
}

impl OperationState {
    /// The action for `event` in this state.
    pub const fn on(self, event: LifecycleEvent) -> LifecycleAction {
        match (self, event) {
            (Self::Stopped, LifecycleEvent::Start) => LifecycleAction::BeginOperation,
            (Self::Stopped, LifecycleEvent::Stop | LifecycleEvent::Step) => LifecycleAction::Ignore,
            (Self::Operating, LifecycleEvent::Start) => LifecycleAction::Reject,
            (Self::Operating, LifecycleEvent::Stop) => LifecycleAction::EndOperation,
            (Self::Operating, LifecycleEvent::Step) => LifecycleAction::Advance,
        }
    }

    /// Lower-case display name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Operating => "operating",
        }
    }
}

impl core::fmt::Display for OperationState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
