//! Fixed-cadence step loop with operator command intake.
//!
//! The loop owns the control unit exclusively. Operator command lines
//! arrive over an mpsc channel and are dispatched between steps, so a
//! step always runs to completion before a command observes the unit.
//!
//! The run ends when `max_steps` is reached, or when the command channel
//! has closed and no operation is running.

use std::time::Duration;

use fieldpilot_core::{CommandChain, CommandOutcome, ControlUnit, OperationState, StepOutcome};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Why the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// The configured step limit was reached.
    MaxStepsReached,
    /// Operator input closed with no operation running.
    InputClosed,
}

/// Loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    /// Real-time delay between steps.
    pub step_interval: Duration,
    /// Step limit; 0 means unlimited.
    pub max_steps: u64,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Why the loop stopped.
    pub end_reason: RunEndReason,
    /// Steps executed by this run.
    pub steps: u64,
    /// Operations that reached their final waypoint.
    pub operations_completed: u64,
    /// Operations that were aborted.
    pub operations_aborted: u64,
    /// Lifecycle state when the loop stopped.
    pub final_state: OperationState,
}

/// Step `unit` on a fixed cadence, dispatching commands between steps.
pub async fn run(
    unit: &mut ControlUnit,
    chain: &CommandChain,
    commands: &mut mpsc::Receiver<String>,
    params: RunParams,
) -> RunSummary {
    let mut ticker = tokio::time::interval(params.step_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut steps: u64 = 0;
    let mut completed: u64 = 0;
    let mut aborted: u64 = 0;
    let mut input_open = true;

    info!(
        step_interval_ms = params.step_interval.as_millis(),
        max_steps = params.max_steps,
        "step loop starting"
    );

    let end_reason = loop {
        if !input_open && !unit.is_operating() {
            break RunEndReason::InputClosed;
        }
        if params.max_steps > 0 && steps >= params.max_steps {
            break RunEndReason::MaxStepsReached;
        }

        tokio::select! {
            line = commands.recv(), if input_open => match line {
                Some(line) => execute(unit, chain, &line),
                None => {
                    info!(operating = unit.is_operating(), "operator input closed");
                    input_open = false;
                }
            },
            _ = ticker.tick() => {
                let report = unit.simulate_one_step();
                steps = steps.saturating_add(1);
                match report.outcome {
                    StepOutcome::Completed => completed = completed.saturating_add(1),
                    StepOutcome::Aborted(_) => aborted = aborted.saturating_add(1),
                    _ => {}
                }
                debug!(
                    step = report.step,
                    outcome = ?report.outcome,
                    position = ?report.position,
                    target = ?report.target,
                    obstacles = report.obstacles_detected,
                    forward_distance_m = ?report.forward_distance_m,
                    "step"
                );
            }
        }
    };

    RunSummary {
        end_reason,
        steps,
        operations_completed: completed,
        operations_aborted: aborted,
        final_state: unit.state(),
    }
}

fn execute(unit: &mut ControlUnit, chain: &CommandChain, line: &str) {
    match chain.dispatch(unit, line) {
        Ok(CommandOutcome::Ignored) => {}
        Ok(outcome) => debug!(command = line.trim(), ?outcome, "command executed"),
        Err(e) => warn!(command = line.trim(), error = %e, "command failed"),
    }
}

/// Log the end of a run.
pub fn log_run_end(summary: &RunSummary) {
    info!(
        reason = ?summary.end_reason,
        steps = summary.steps,
        operations_completed = summary.operations_completed,
        operations_aborted = summary.operations_aborted,
        final_state = %summary.final_state,
        "run ended"
    );
    if summary.steps == 0 {
        warn!("run ended with no steps executed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fieldpilot_core::{FieldPilotConfig, build_control_unit};

    use super::*;

    /// A unit that never sees obstacles, never fails to start, and never
    /// reads a critical forward distance.
    fn calm_unit() -> ControlUnit {
        let mut config = FieldPilotConfig::default();
        config.gnss.start_failure_probability = 0.0;
        config.gnss.replan_failure_probability = 0.0;
        config.perception.camera.obstacle_probability = 0.0;
        config.perception.camera.frame_dropout_probability = 0.0;
        config.sensors.forward_min_m = 5.0;
        build_control_unit(&config).unwrap()
    }

    fn fast(max_steps: u64) -> RunParams {
        RunParams {
            step_interval: Duration::from_millis(1),
            max_steps,
        }
    }

    #[tokio::test]
    async fn bounded_by_max_steps() {
        let mut unit = calm_unit();
        let chain = CommandChain::standard(None);
        let (_tx, mut rx) = mpsc::channel(8);

        let summary = run(&mut unit, &chain, &mut rx, fast(5)).await;

        assert_eq!(summary.end_reason, RunEndReason::MaxStepsReached);
        assert_eq!(summary.steps, 5);
        assert_eq!(summary.final_state, OperationState::Stopped);
    }

    #[tokio::test]
    async fn closed_input_ends_idle_run() {
        let mut unit = calm_unit();
        let chain = CommandChain::standard(None);
        let (tx, mut rx) = mpsc::channel::<String>(8);
        drop(tx);

        let summary = run(&mut unit, &chain, &mut rx, fast(0)).await;

        assert_eq!(summary.end_reason, RunEndReason::InputClosed);
        assert_eq!(summary.operations_completed, 0);
    }

    #[tokio::test]
    async fn commanded_operation_runs_to_completion() {
        let mut unit = calm_unit();
        let chain = CommandChain::standard(None);
        let (tx, mut rx) = mpsc::channel(8);
        tx.send("start 52.0002 5.0002 sprayer".to_owned()).await.unwrap();
        tx.send("status".to_owned()).await.unwrap();
        tx.send("warp 9".to_owned()).await.unwrap();
        drop(tx);

        let summary = run(&mut unit, &chain, &mut rx, fast(0)).await;

        assert_eq!(summary.end_reason, RunEndReason::InputClosed);
        assert_eq!(summary.operations_completed, 1);
        assert_eq!(summary.operations_aborted, 0);
        assert_eq!(summary.final_state, OperationState::Stopped);
        assert!(summary.steps > 0);
    }

    #[tokio::test]
    async fn stop_command_ends_operation() {
        let mut unit = calm_unit();
        let chain = CommandChain::standard(None);
        let (tx, mut rx) = mpsc::channel(8);
        tx.send("start 53.0 6.0".to_owned()).await.unwrap();
        tx.send("stop".to_owned()).await.unwrap();
        drop(tx);

        let summary = run(&mut unit, &chain, &mut rx, fast(50)).await;

        assert_eq!(summary.final_state, OperationState::Stopped);
        assert_eq!(summary.operations_completed, 0);
    }
}
