//! Control unit, implement control, and configuration for FieldPilot.
//!
//! This crate owns the guidance loop: a [`ControlUnit`] combines a position
//! estimator, the perception router, the implement controller, and cached
//! auxiliary sensors, and advances one step per call to
//! [`ControlUnit::simulate_one_step`].
//!
//! # Modules
//!
//! - [`command`] -- Textual operator commands and the [`CommandChain`].
//! - [`config`] -- Configuration loading from `fieldpilot-config.yaml` into
//!   strongly-typed structs.
//! - [`control`] -- The [`ControlUnit`] orchestrator and its step sequence.
//! - [`factory`] -- [`build_control_unit`] from configuration.
//! - [`implement`] -- [`ImplementController`] and per-implement parameters.
//! - [`lifecycle`] -- The Stopped/Operating state machine.
//! - [`report`] -- [`StepReport`] and [`StepOutcome`] for each step.

pub mod command;
pub mod config;
pub mod control;
pub mod factory;
pub mod implement;
pub mod lifecycle;
pub mod report;

pub use command::{CommandChain, CommandError, CommandHandler, CommandOutcome, StatusSnapshot};
pub use config::{ConfigError, FieldPilotConfig};
pub use control::{ControlParams, ControlUnit, StartError};
pub use factory::build_control_unit;
pub use implement::{ImplementController, ImplementError};
pub use lifecycle::OperationState;
pub use report::{AbortReason, StepOutcome, StepReport};
