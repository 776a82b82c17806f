//! Textual operator commands.
//!
//! A command line is split into a verb and whitespace-separated arguments
//! and offered to each [`CommandHandler`] of a [`CommandChain`] in order.
//! The first handler that recognises the verb answers; a line nobody
//! recognises is ignored.
//!
//! | Command | Effect |
//! |---------|--------|
//! | `start <lat> <lon> [implement]` | [`ControlUnit::start_operation`] |
//! | `stop` | [`ControlUnit::stop_operation`] |
//! | `status` | logs and returns a [`StatusSnapshot`] |
//! | `implement <depth\|rate\|intensity> <value>` | the matching implement setter |

use core::num::ParseFloatError;

use fieldpilot_perception::RouterVariant;
use fieldpilot_types::{Coordinates, FieldBoundaries, ImplementType, OperationId};
use serde::Serialize;
use tracing::{debug, info};

use crate::control::{ControlUnit, StartError};
use crate::implement::ImplementError;
use crate::lifecycle::OperationState;

/// Errors raised while executing a recognised command.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// A required argument was not supplied.
    #[error("{command}: missing argument <{argument}>")]
    MissingArgument {
        /// Command verb.
        command: &'static str,
        /// Name of the missing argument.
        argument: &'static str,
    },

    /// An argument is not a number.
    #[error("invalid {argument} {value:?}: {source}")]
    InvalidNumber {
        /// Name of the argument.
        argument: &'static str,
        /// The text supplied.
        value: String,
        /// The underlying parse error.
        #[source]
        source: ParseFloatError,
    },

    /// An argument parsed as NaN or infinity.
    #[error("{argument} must be a finite number, got {value:?}")]
    NonFiniteNumber {
        /// Name of the argument.
        argument: &'static str,
        /// The text supplied.
        value: String,
    },

    /// The implement name is not one of none, plough, seeder, sprayer.
    #[error("unknown implement {name:?}")]
    UnknownImplement {
        /// The name supplied.
        name: String,
    },

    /// The implement parameter is not one of depth, rate, intensity.
    #[error("unknown implement parameter {name:?}")]
    UnknownParameter {
        /// The name supplied.
        name: String,
    },

    /// The control unit refused to start.
    #[error(transparent)]
    Start(#[from] StartError),

    /// The implement controller refused the value.
    #[error(transparent)]
    Implement(#[from] ImplementError),
}

/// Point-in-time view of a control unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// Lifecycle state.
    pub state: OperationState,
    /// Running operation, if any.
    pub operation_id: Option<OperationId>,
    /// Current position estimate.
    pub position: Coordinates,
    /// Waypoint being approached.
    pub target: Option<Coordinates>,
    /// Waypoints left, including the target.
    pub remaining_waypoints: usize,
    /// Steps simulated so far.
    pub steps: u64,
    /// Position estimator name.
    pub estimator: &'static str,
    /// Perception detector currently queried.
    pub perception: RouterVariant,
    /// Attached implement.
    pub implement: ImplementType,
    /// Whether the implement is working.
    pub implement_active: bool,
}

impl StatusSnapshot {
    /// Capture the state of `unit`.
    pub fn capture(unit: &mut ControlUnit) -> Self {
        Self {
            state: unit.state(),
            operation_id: unit.operation_id(),
            position: unit.current_position(),
            target: unit.current_target(),
            remaining_waypoints: unit.remaining_waypoints(),
            steps: unit.steps_executed(),
            estimator: unit.estimator_name(),
            perception: unit.perception().active_variant(),
            implement: unit.implement().attached(),
            implement_active: unit.implement().is_active(),
        }
    }
}

/// What a command did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CommandOutcome {
    /// An operation was started.
    Started {
        /// Its identifier.
        operation_id: OperationId,
    },
    /// `stop` ran; `stopped` is false when nothing was running.
    Stopped {
        /// Whether an operation was actually stopped.
        stopped: bool,
    },
    /// `status` ran.
    Status(StatusSnapshot),
    /// An implement parameter was set.
    ImplementUpdated {
        /// Implement the parameter belongs to.
        implement: ImplementType,
        /// Value requested.
        value: f64,
    },
    /// No handler recognised the command, or the line was blank.
    Ignored,
}

/// A command line split into verb and arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLine<'a> {
    verb: &'a str,
    rest: &'a str,
}

impl<'a> CommandLine<'a> {
    /// Split `line`; `None` for a blank line.
    pub fn parse(line: &'a str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let (verb, rest) = trimmed.split_once(char::is_whitespace).unwrap_or((trimmed, ""));
        Some(Self { verb, rest })
    }

    /// The first word.
    pub const fn verb(&self) -> &'a str {
        self.verb
    }

    /// The remaining words.
    pub fn args(&self) -> impl Iterator<Item = &'a str> {
        self.rest.split_whitespace()
    }
}

/// One link of the command chain.
pub trait CommandHandler: Send {
    /// Handle `command`, or return `None` to pass it down the chain.
    fn handle(
        &self,
        unit: &mut ControlUnit,
        command: &CommandLine<'_>,
    ) -> Option<Result<CommandOutcome, CommandError>>;
}

/// Ordered list of handlers.
#[derive(Default)]
pub struct CommandChain {
    handlers: Vec<Box<dyn CommandHandler>>,
}

impl CommandChain {
    /// An empty chain that ignores everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// The `start`, `stop`, `status`, and `implement` handlers.
    ///
    /// `start` plans within `boundaries` when given.
    pub fn standard(boundaries: Option<FieldBoundaries>) -> Self {
        Self::new()
            .with_handler(StartHandler::new(boundaries))
            .with_handler(StopHandler)
            .with_handler(StatusHandler)
            .with_handler(ImplementHandler)
    }

    /// Append a handler to the end of the chain.
    #[must_use]
    pub fn with_handler(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Run `line` through the chain.
    ///
    /// # Errors
    ///
    /// Returns the error of the handler that recognised the command.
    pub fn dispatch(
        &self,
        unit: &mut ControlUnit,
        line: &str,
    ) -> Result<CommandOutcome, CommandError> {
        let Some(command) = CommandLine::parse(line) else {
            return Ok(CommandOutcome::Ignored);
        };
        for handler in &self.handlers {
            if let Some(result) = handler.handle(unit, &command) {
                return result;
            }
        }
        debug!(command = command.verb(), "unrecognised command ignored");
        Ok(CommandOutcome::Ignored)
    }
}

impl core::fmt::Debug for CommandChain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandChain")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `start <lat> <lon> [implement]`.
#[derive(Debug, Clone, Default)]
pub struct StartHandler {
    boundaries: Option<FieldBoundaries>,
}

impl StartHandler {
    /// Plan within `boundaries` when given.
    pub const fn new(boundaries: Option<FieldBoundaries>) -> Self {
        Self { boundaries }
    }

    fn start(
        &self,
        unit: &mut ControlUnit,
        command: &CommandLine<'_>,
    ) -> Result<CommandOutcome, CommandError> {
        let mut args = command.args();
        let latitude = number("start", "lat", args.next())?;
        let longitude = number("start", "lon", args.next())?;
        let implement = match args.next() {
            None => ImplementType::None,
            Some(name) => ImplementType::parse(name).ok_or_else(|| {
                CommandError::UnknownImplement {
                    name: name.to_owned(),
                }
            })?,
        };
        let operation_id = unit.start_operation(
            Coordinates::new(latitude, longitude),
            self.boundaries.as_ref(),
            implement,
        )?;
        Ok(CommandOutcome::Started { operation_id })
    }
}

impl CommandHandler for StartHandler {
    fn handle(
        &self,
        unit: &mut ControlUnit,
        command: &CommandLine<'_>,
    ) -> Option<Result<CommandOutcome, CommandError>> {
        (command.verb() == "start").then(|| self.start(unit, command))
    }
}

/// `stop`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopHandler;

impl CommandHandler for StopHandler {
    fn handle(
        &self,
        unit: &mut ControlUnit,
        command: &CommandLine<'_>,
    ) -> Option<Result<CommandOutcome, CommandError>> {
        (command.verb() == "stop").then(|| {
            Ok(CommandOutcome::Stopped {
                stopped: unit.stop_operation(),
            })
        })
    }
}

/// `status`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusHandler;

impl CommandHandler for StatusHandler {
    fn handle(
        &self,
        unit: &mut ControlUnit,
        command: &CommandLine<'_>,
    ) -> Option<Result<CommandOutcome, CommandError>> {
        if command.verb() != "status" {
            return None;
        }
        let snapshot = StatusSnapshot::capture(unit);
        info!(
            state = %snapshot.state,
            operation_id = ?snapshot.operation_id,
            position = %snapshot.position,
            target = ?snapshot.target,
            remaining_waypoints = snapshot.remaining_waypoints,
            steps = snapshot.steps,
            estimator = snapshot.estimator,
            perception = snapshot.perception.as_str(),
            implement = %snapshot.implement,
            implement_active = snapshot.implement_active,
            "status"
        );
        Some(Ok(CommandOutcome::Status(snapshot)))
    }
}

/// `implement <depth|rate|intensity> <value>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImplementHandler;

impl ImplementHandler {
    fn set(
        unit: &mut ControlUnit,
        command: &CommandLine<'_>,
    ) -> Result<CommandOutcome, CommandError> {
        let mut args = command.args();
        let parameter = args.next().ok_or(CommandError::MissingArgument {
            command: "implement",
            argument: "parameter",
        })?;
        let value = number("implement", "value", args.next())?;
        let implement = unit.implement_mut();
        let kind = match parameter {
            "depth" => {
                implement.set_plough_depth(value)?;
                ImplementType::Plough
            }
            "rate" => {
                implement.set_seed_rate(value)?;
                ImplementType::Seeder
            }
            "intensity" => {
                implement.set_sprayer_intensity(value)?;
                ImplementType::Sprayer
            }
            other => {
                return Err(CommandError::UnknownParameter {
                    name: other.to_owned(),
                });
            }
        };
        Ok(CommandOutcome::ImplementUpdated {
            implement: kind,
            value,
        })
    }
}

impl CommandHandler for ImplementHandler {
    fn handle(
        &self,
        unit: &mut ControlUnit,
        command: &CommandLine<'_>,
    ) -> Option<Result<CommandOutcome, CommandError>> {
        (command.verb() == "implement").then(|| Self::set(unit, command))
    }
}

fn number(
    command: &'static str,
    argument: &'static str,
    raw: Option<&str>,
) -> Result<f64, CommandError> {
    let raw = raw.ok_or(CommandError::MissingArgument { command, argument })?;
    let value: f64 = raw.parse().map_err(|source| CommandError::InvalidNumber {
        argument,
        value: raw.to_owned(),
        source,
    })?;
    if !value.is_finite() {
        return Err(CommandError::NonFiniteNumber {
            argument,
            value: raw.to_owned(),
        });
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use fieldpilot_navigation::{GnssEstimator, GnssParams};
    use fieldpilot_perception::{PerceptionRouter, RouterParams, ScriptedPerception};
    use fieldpilot_sensors::{FixedSource, TimedCache};
    use fieldpilot_types::SoilReading;

    use super::*;
    use crate::control::ControlParams;

    fn unit() -> ControlUnit {
        let params = GnssParams {
            noise_deg: 0.0,
            start_failure_probability: 0.0,
            ..GnssParams::default()
        };
        let estimator = Box::new(GnssEstimator::new(Coordinates::new(10.0, 20.0), params, 5));
        let router = PerceptionRouter::new(
            Box::new(ScriptedPerception::new("quiet")),
            None,
            &RouterParams::default(),
        );
        let forward = Arc::new(TimedCache::new("forward", Duration::ZERO, || {
            FixedSource::new(30.0)
        }));
        let soil = Arc::new(TimedCache::new("soil", Duration::ZERO, || {
            FixedSource::new(SoilReading {
                moisture_pct: 25.0,
                temperature_c: 14.0,
            })
        }));
        ControlUnit::new(ControlParams::default(), estimator, router, forward, soil)
    }

    #[test]
    fn parse_splits_verb_and_args() {
        let line = CommandLine::parse("  start 1.5   2.5 plough \n").unwrap();
        assert_eq!(line.verb(), "start");
        assert_eq!(line.args().collect::<Vec<_>>(), ["1.5", "2.5", "plough"]);
        assert!(CommandLine::parse("   ").is_none());
        assert_eq!(CommandLine::parse("stop").unwrap().args().count(), 0);
    }

    #[test]
    fn start_and_stop_round_trip() {
        let chain = CommandChain::standard(None);
        let mut unit = unit();

        let outcome = chain.dispatch(&mut unit, "start 10.001 20.001 seeder").unwrap();
        assert!(matches!(outcome, CommandOutcome::Started { .. }));
        assert!(unit.is_operating());
        assert_eq!(unit.implement().attached(), ImplementType::Seeder);

        let outcome = chain.dispatch(&mut unit, "stop").unwrap();
        assert_eq!(outcome, CommandOutcome::Stopped { stopped: true });
        let outcome = chain.dispatch(&mut unit, "stop").unwrap();
        assert_eq!(outcome, CommandOutcome::Stopped { stopped: false });
    }

    #[test]
    fn second_start_is_rejected() {
        let chain = CommandChain::standard(None);
        let mut unit = unit();
        chain.dispatch(&mut unit, "start 10.001 20.0").unwrap();
        let route = unit.current_route().clone();

        let err = chain.dispatch(&mut unit, "start 11.0 21.0").unwrap_err();
        assert_eq!(err, CommandError::Start(StartError::AlreadyOperating));
        assert_eq!(unit.current_route(), &route);
    }

    #[test]
    fn start_argument_errors() {
        let chain = CommandChain::standard(None);
        let mut unit = unit();
        assert!(matches!(
            chain.dispatch(&mut unit, "start 10.0"),
            Err(CommandError::MissingArgument { argument: "lon", .. })
        ));
        assert!(matches!(
            chain.dispatch(&mut unit, "start north 20.0"),
            Err(CommandError::InvalidNumber { argument: "lat", .. })
        ));
        assert!(matches!(
            chain.dispatch(&mut unit, "start 10.0 20.0 harrow"),
            Err(CommandError::UnknownImplement { .. })
        ));
        assert!(!unit.is_operating());
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let chain = CommandChain::standard(None);
        let mut unit = unit();

        assert!(matches!(
            chain.dispatch(&mut unit, "start NaN 20.0"),
            Err(CommandError::NonFiniteNumber { argument: "lat", .. })
        ));
        assert!(matches!(
            chain.dispatch(&mut unit, "start 10.0 -inf"),
            Err(CommandError::NonFiniteNumber { argument: "lon", .. })
        ));
        assert!(!unit.is_operating());
        assert!(unit.current_route().is_empty());

        unit.implement_mut().attach(ImplementType::Plough).unwrap();
        assert!(matches!(
            chain.dispatch(&mut unit, "implement depth inf"),
            Err(CommandError::NonFiniteNumber { argument: "value", .. })
        ));
    }

    #[test]
    fn status_reports_state() {
        let chain = CommandChain::standard(None);
        let mut unit = unit();
        let CommandOutcome::Status(idle) = chain.dispatch(&mut unit, "status").unwrap() else {
            panic!("expected status");
        };
        assert_eq!(idle.state, OperationState::Stopped);
        assert_eq!(idle.remaining_waypoints, 0);
        assert_eq!(idle.estimator, "gnss");
        assert_eq!(idle.perception, RouterVariant::Primary);

        chain.dispatch(&mut unit, "start 10.001 20.0 sprayer").unwrap();
        let CommandOutcome::Status(running) = chain.dispatch(&mut unit, "status").unwrap() else {
            panic!("expected status");
        };
        assert_eq!(running.state, OperationState::Operating);
        assert_eq!(running.remaining_waypoints, 5);
        assert!(running.implement_active);
        assert!(running.operation_id.is_some());
    }

    #[test]
    fn implement_parameters_route_to_setters() {
        let chain = CommandChain::standard(None);
        let mut unit = unit();
        unit.implement_mut().attach(ImplementType::Sprayer).unwrap();

        let outcome = chain.dispatch(&mut unit, "implement intensity 150").unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::ImplementUpdated {
                implement: ImplementType::Sprayer,
                value: 150.0,
            }
        );
        assert_eq!(unit.implement().sprayer_intensity(), 100.0);

        assert!(matches!(
            chain.dispatch(&mut unit, "implement depth 20"),
            Err(CommandError::Implement(ImplementError::WrongImplement { .. }))
        ));
        assert!(matches!(
            chain.dispatch(&mut unit, "implement speed 3"),
            Err(CommandError::UnknownParameter { .. })
        ));
        assert!(matches!(
            chain.dispatch(&mut unit, "implement"),
            Err(CommandError::MissingArgument { argument: "parameter", .. })
        ));
    }

    #[test]
    fn unknown_and_blank_lines_are_ignored() {
        let chain = CommandChain::standard(None);
        let mut unit = unit();
        assert_eq!(chain.dispatch(&mut unit, "reverse").unwrap(), CommandOutcome::Ignored);
        assert_eq!(chain.dispatch(&mut unit, "").unwrap(), CommandOutcome::Ignored);
        assert_eq!(
            CommandChain::new().dispatch(&mut unit, "stop").unwrap(),
            CommandOutcome::Ignored
        );
    }

    #[test]
    fn custom_handler_runs_before_fallthrough() {
        struct Halt;
        impl CommandHandler for Halt {
            fn handle(
                &self,
                unit: &mut ControlUnit,
                command: &CommandLine<'_>,
            ) -> Option<Result<CommandOutcome, CommandError>> {
                (command.verb() == "halt").then(|| {
                    Ok(CommandOutcome::Stopped {
                        stopped: unit.stop_operation(),
                    })
                })
            }
        }

        let chain = CommandChain::standard(None).with_handler(Halt);
        let mut unit = unit();
        chain.dispatch(&mut unit, "start 10.001 20.0").unwrap();
        assert_eq!(
            chain.dispatch(&mut unit, "halt").unwrap(),
            CommandOutcome::Stopped { stopped: true }
        );
    }
}
