//! The control unit: lifecycle, route following, and the per-step loop.
//!
//! A [`ControlUnit`] owns one position estimator, the perception router,
//! the implement controller, and the auxiliary sensor caches. It is driven
//! externally: the caller invokes [`simulate_one_step`](ControlUnit::simulate_one_step)
//! on a fixed cadence and each call runs to completion.
//!
//! # Step sequence
//!
//! 1. Read the position estimate.
//! 2. Without a route, abort.
//! 3. Within the arrival tolerance of the target, select the next waypoint,
//!    or complete the operation at the last one.
//! 4. Otherwise move one fixed step towards the target and feed the new
//!    position back to the estimator.
//! 5. Ask perception for obstacles at the position read in 1. If any, replan
//!    the remaining route; a failed replan aborts.
//! 6. Read forward distance and soil state through their caches.
//! 7. A forward reading inside the critical distance aborts.
//!
//! Errors from collaborators never escape a step. They are logged and turned
//! into empty results or an abort recorded in the [`StepReport`].

use std::sync::Arc;

use fieldpilot_navigation::{DEFAULT_PRECISION_POINTS, PlanningError, PositionEstimator};
use fieldpilot_perception::{PerceptionRouter, PerceptionSystem};
use fieldpilot_sensors::TimedCache;
use fieldpilot_types::{
    Coordinates, FieldBoundaries, FieldFeatureData, ImplementType, OperationId, Route, SoilReading,
};
use tracing::{debug, info, warn};

use crate::implement::{ImplementController, ImplementError};
use crate::lifecycle::{LifecycleAction, LifecycleEvent, OperationState};
use crate::report::{AbortReason, StepOutcome, StepReport};

/// Errors returned by [`ControlUnit::start_operation`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StartError {
    /// An operation is already running.
    #[error("an operation is already running")]
    AlreadyOperating,

    /// The target has a NaN or infinite axis.
    #[error("target {target} is not a finite position")]
    InvalidTarget {
        /// The rejected target.
        target: Coordinates,
    },

    /// The estimator could not start or plan a route.
    #[error("route planning failed: {source}")]
    Planning {
        /// The underlying planning error.
        #[from]
        source: PlanningError,
    },

    /// The requested implement could not be attached or activated.
    #[error("implement setup failed: {source}")]
    Implement {
        /// The underlying implement error.
        #[from]
        source: ImplementError,
    },

    /// The planned route had no waypoints.
    #[error("planned route is empty")]
    EmptyRoute,
}

/// Tunables for route following.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlParams {
    /// Distance at which a waypoint counts as reached, degrees (default: 5e-5).
    pub arrival_tolerance_deg: f64,
    /// Distance moved per step, degrees (default: 2e-5).
    pub step_deg: f64,
    /// Forward readings strictly between zero and this abort, metres (default: 1.0).
    pub critical_distance_m: f64,
    /// Intermediate waypoints in a new route (default: 3).
    pub precision_points: usize,
    /// Also query field features every step (default: false).
    pub survey_features: bool,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            arrival_tolerance_deg: 5e-5,
            step_deg: 2e-5,
            critical_distance_m: 1.0,
            precision_points: DEFAULT_PRECISION_POINTS,
            survey_features: false,
        }
    }
}

/// Orchestrates one vehicle's guidance loop.
pub struct ControlUnit {
    params: ControlParams,
    estimator: Box<dyn PositionEstimator>,
    perception: PerceptionRouter,
    implement: ImplementController,
    forward_distance: Arc<TimedCache<f64>>,
    soil: Arc<TimedCache<SoilReading>>,
    state: OperationState,
    route: Route,
    target_index: usize,
    operation_id: Option<OperationId>,
    steps: u64,
}

impl ControlUnit {
    /// Assemble a stopped control unit from its collaborators.
    pub fn new(
        params: ControlParams,
        estimator: Box<dyn PositionEstimator>,
        perception: PerceptionRouter,
        forward_distance: Arc<TimedCache<f64>>,
        soil: Arc<TimedCache<SoilReading>>,
    ) -> Self {
        Self {
            params,
            estimator,
            perception,
            implement: ImplementController::new(),
            forward_distance,
            soil,
            state: OperationState::Stopped,
            route: Route::default(),
            target_index: 0,
            operation_id: None,
            steps: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Plan a route to `target` and begin operating.
    ///
    /// On success the implement (unless [`ImplementType::None`]) is attached
    /// and working, and the first route waypoint is the current target.
    pub fn start_operation(
        &mut self,
        target: Coordinates,
        boundaries: Option<&FieldBoundaries>,
        implement: ImplementType,
    ) -> Result<OperationId, StartError> {
        if !target.is_finite() {
            warn!(%target, "start rejected: target is not finite");
            return Err(StartError::InvalidTarget { target });
        }
        match self.state.on(LifecycleEvent::Start) {
            LifecycleAction::BeginOperation => {}
            _ => {
                warn!(
                    operation_id = ?self.operation_id,
                    %target,
                    "start rejected: already operating"
                );
                return Err(StartError::AlreadyOperating);
            }
        }

        let route = match self
            .estimator
            .start_route(target, boundaries, self.params.precision_points)
        {
            Ok(route) => route,
            Err(e) => {
                self.estimator.stop();
                warn!(estimator = self.estimator.name(), error = %e, "operation not started");
                return Err(e.into());
            }
        };

        let prepared = match implement {
            ImplementType::None => Ok(()),
            kind => self.prepare_implement(kind),
        };
        if let Err(e) = prepared {
            self.estimator.stop();
            return Err(e.into());
        }

        let operation_id = OperationId::new();
        self.state = OperationState::Operating;
        self.route = route;
        self.target_index = 0;
        self.operation_id = Some(operation_id);
        self.perception.clear_cache();

        let Some(first) = self.route.first() else {
            self.end_operation("empty route");
            return Err(StartError::EmptyRoute);
        };
        info!(
            %operation_id,
            estimator = self.estimator.name(),
            %target,
            first_target = %first,
            waypoints = self.route.len(),
            implement = %implement,
            "operation started"
        );
        Ok(operation_id)
    }

    /// Stop the running operation. Returns whether anything was stopped.
    pub fn stop_operation(&mut self) -> bool {
        match self.state.on(LifecycleEvent::Stop) {
            LifecycleAction::EndOperation => {
                self.end_operation("operator request");
                true
            }
            _ => false,
        }
    }

    fn prepare_implement(&mut self, implement: ImplementType) -> Result<(), ImplementError> {
        self.implement.attach(implement)?;
        self.implement.activate()
    }

    fn end_operation(&mut self, reason: &'static str) {
        self.state = OperationState::Stopped;
        self.estimator.stop();
        self.implement.deactivate();
        self.route.clear();
        self.target_index = 0;
        let operation_id = self.operation_id.take();
        info!(operation_id = ?operation_id, reason, steps = self.steps, "operation stopped");
    }

    // -----------------------------------------------------------------------
    // Step loop
    // -----------------------------------------------------------------------

    /// Advance the simulation by one step.
    ///
    /// Never fails: collaborator errors become empty results or an abort,
    /// both visible in the returned report.
    pub fn simulate_one_step(&mut self) -> StepReport {
        self.steps = self.steps.saturating_add(1);
        let mut report = StepReport::new(self.steps, self.operation_id);
        if self.state.on(LifecycleEvent::Step) != LifecycleAction::Advance {
            return report;
        }

        // 1-2. Position and route.
        let position = self.estimator.position();
        report.position = Some(position);
        let Some(target) = self.current_target() else {
            return self.abort(report, AbortReason::NoRoute);
        };

        // 3-4. Arrival or movement.
        if position.distance_to(target) < self.params.arrival_tolerance_deg {
            let next = self.target_index.saturating_add(1);
            if next >= self.route.len() {
                report.target = Some(target);
                report.outcome = StepOutcome::Completed;
                info!(operation_id = ?self.operation_id, %position, "final waypoint reached");
                self.end_operation("completed");
                return report;
            }
            self.target_index = next;
            debug!(waypoint = next, %position, "waypoint reached");
            report.outcome = StepOutcome::WaypointReached;
        } else {
            let moved = position.step_toward(target, self.params.step_deg);
            self.estimator.update_simulated_position(moved);
            report.outcome = StepOutcome::Advanced;
        }

        // 5. Obstacles and replanning.
        let obstacles = self.perception.detect_obstacles(position).unwrap_or_else(|e| {
            warn!(error = %e, "obstacle detection failed");
            Vec::new()
        });
        report.obstacles_detected = obstacles.len();
        if !obstacles.is_empty() {
            let remaining = self.route.remaining_from(self.target_index);
            match self.estimator.adjust_route(&remaining, &obstacles) {
                Ok(adjusted) => {
                    debug!(
                        obstacles = obstacles.len(),
                        waypoints = adjusted.len(),
                        "route replanned"
                    );
                    self.route = adjusted;
                    self.target_index = 0;
                    report.outcome = StepOutcome::Replanned;
                }
                Err(e) => {
                    warn!(error = %e, obstacles = obstacles.len(), "replanning failed");
                    return self.abort(report, AbortReason::ReplanFailed);
                }
            }
        }

        if self.params.survey_features {
            report.features_detected = self.features_at(position).len();
        }

        // 6. Auxiliary sensors, observability only.
        report.forward_distance_m = self
            .forward_distance
            .get()
            .inspect_err(|e| warn!(error = %e, "forward distance unavailable"))
            .ok();
        report.soil = self
            .soil
            .get()
            .inspect_err(|e| warn!(error = %e, "soil reading unavailable"))
            .ok();
        report.target = self.current_target();

        // 7. Collision guard.
        let critical = self.params.critical_distance_m;
        if let Some(distance) = report
            .forward_distance_m
            .filter(|&distance| distance > 0.0 && distance < critical)
        {
            warn!(distance_m = distance, "imminent collision");
            return self.abort(report, AbortReason::CriticalProximity);
        }

        report
    }

    fn abort(&mut self, mut report: StepReport, reason: AbortReason) -> StepReport {
        warn!(operation_id = ?self.operation_id, ?reason, "operation aborted");
        report.outcome = StepOutcome::Aborted(reason);
        self.end_operation("aborted");
        report
    }

    fn features_at(&mut self, position: Coordinates) -> Vec<FieldFeatureData> {
        self.perception
            .analyze_field_features(position)
            .unwrap_or_else(|e| {
                warn!(error = %e, "field feature analysis failed");
                Vec::new()
            })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Survey field features at the current position estimate.
    pub fn survey_field_features(&mut self) -> Vec<FieldFeatureData> {
        let position = self.estimator.position();
        self.features_at(position)
    }

    /// Whether an operation is running.
    pub fn is_operating(&self) -> bool {
        self.state == OperationState::Operating
    }

    /// The lifecycle state.
    pub const fn state(&self) -> OperationState {
        self.state
    }

    /// The current position estimate.
    pub fn current_position(&mut self) -> Coordinates {
        self.estimator.position()
    }

    /// The route being followed. Empty while stopped.
    pub const fn current_route(&self) -> &Route {
        &self.route
    }

    /// The waypoint currently being approached.
    pub fn current_target(&self) -> Option<Coordinates> {
        self.route.get(self.target_index)
    }

    /// Waypoints left, including the current target.
    pub fn remaining_waypoints(&self) -> usize {
        self.route.len().saturating_sub(self.target_index)
    }

    /// Identifier of the running operation.
    pub const fn operation_id(&self) -> Option<OperationId> {
        self.operation_id
    }

    /// Steps simulated so far, including idle ones.
    pub const fn steps_executed(&self) -> u64 {
        self.steps
    }

    /// Name of the position estimator.
    pub fn estimator_name(&self) -> &'static str {
        self.estimator.name()
    }

    /// The implement controller.
    pub const fn implement(&self) -> &ImplementController {
        &self.implement
    }

    /// Mutable access to the implement controller.
    pub const fn implement_mut(&mut self) -> &mut ImplementController {
        &mut self.implement
    }

    /// The perception router.
    pub const fn perception(&self) -> &PerceptionRouter {
        &self.perception
    }

    /// Mutable access to the perception router (manual variant switching).
    pub const fn perception_mut(&mut self) -> &mut PerceptionRouter {
        &mut self.perception
    }

    /// Shared handle to the forward distance cache.
    pub fn forward_distance_cache(&self) -> Arc<TimedCache<f64>> {
        Arc::clone(&self.forward_distance)
    }

    /// Shared handle to the soil reading cache.
    pub fn soil_cache(&self) -> Arc<TimedCache<SoilReading>> {
        Arc::clone(&self.soil)
    }
}

impl core::fmt::Debug for ControlUnit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlUnit")
            .field("state", &self.state)
            .field("estimator", &self.estimator.name())
            .field("perception", &self.perception)
            .field("implement", &self.implement)
            .field("route", &self.route)
            .field("target_index", &self.target_index)
            .field("operation_id", &self.operation_id)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}
