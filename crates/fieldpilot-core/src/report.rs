//! Per-step observability records.

use chrono::{DateTime, Utc};
use fieldpilot_types::{Coordinates, OperationId, SoilReading};
use serde::Serialize;

/// Why an operation was terminated early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// The route was empty or the target index ran past it.
    NoRoute,
    /// The estimator could not replan around detected obstacles.
    ReplanFailed,
    /// The forward range finder reported an imminent collision.
    CriticalProximity,
}

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum StepOutcome {
    /// No operation was running.
    Idle,
    /// Moved towards the current target.
    Advanced,
    /// Arrived at an intermediate waypoint and selected the next one.
    WaypointReached,
    /// Obstacles forced a new route.
    Replanned,
    /// Arrived at the final waypoint; the operation is complete.
    Completed,
    /// The operation was stopped.
    Aborted(AbortReason),
}

impl StepOutcome {
    /// Whether this step ended the operation.
    pub const fn ends_operation(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted(_))
    }
}

/// Summary of one call to
/// [`ControlUnit::simulate_one_step`](crate::ControlUnit::simulate_one_step).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    /// Monotonic step counter of the control unit.
    pub step: u64,
    /// Operation the step belonged to, if one was running.
    pub operation_id: Option<OperationId>,
    /// Position estimate read at the start of the step.
    pub position: Option<Coordinates>,
    /// Target waypoint when the step finished.
    pub target: Option<Coordinates>,
    /// What happened.
    pub outcome: StepOutcome,
    /// Obstacles reported by perception.
    pub obstacles_detected: usize,
    /// Field features reported by perception.
    pub features_detected: usize,
    /// Forward range reading, if the sensor delivered one.
    pub forward_distance_m: Option<f64>,
    /// Soil reading, if the probe delivered one.
    pub soil: Option<SoilReading>,
    /// Wall-clock time the report was produced.
    pub recorded_at: DateTime<Utc>,
}

impl StepReport {
    pub(crate) fn new(step: u64, operation_id: Option<OperationId>) -> Self {
        Self {
            step,
            operation_id,
            position: None,
            target: None,
            outcome: StepOutcome::Idle,
            obstacles_detected: 0,
            features_detected: 0,
            forward_distance_m: None,
            soil: None,
            recorded_at: Utc::now(),
        }
    }
}
