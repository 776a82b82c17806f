//! The position estimator capability shared by all localisation strategies.

use fieldpilot_types::{Coordinates, FieldBoundaries, ObstacleData, Route};

use crate::error::PlanningError;

/// Intermediate waypoints generated between start and target by default.
pub const DEFAULT_PRECISION_POINTS: usize = 3;

/// A localisation strategy that can also plan and replan routes.
///
/// The control unit holds one estimator behind `Box<dyn PositionEstimator>`
/// and never depends on which variant it is.
pub trait PositionEstimator: Send {
    /// Short name used in logs and errors (e.g. `"gnss"`).
    fn name(&self) -> &'static str;

    /// Current position estimate.
    ///
    /// Takes `&mut self` because estimates may draw noise from the
    /// estimator's random source.
    fn position(&mut self) -> Coordinates;

    /// Plan a straight route from the current estimate to `target`.
    ///
    /// The route has `precision_points + 2` waypoints: the current estimate,
    /// `precision_points` evenly spaced intermediate points, and `target`.
    /// `boundaries` is accepted but not enforced.
    ///
    /// # Errors
    ///
    /// Returns [`PlanningError::EstimatorInactive`] if the estimator is not
    /// active.
    fn calculate_route(
        &mut self,
        target: Coordinates,
        boundaries: Option<&FieldBoundaries>,
        precision_points: usize,
    ) -> Result<Route, PlanningError>;

    /// Produce a replacement for `current` that accounts for `obstacles`.
    ///
    /// With no obstacles the route is returned unchanged. A successful
    /// adjustment always has the same number of waypoints as `current`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanningError::EstimatorInactive`] if inactive,
    /// [`PlanningError::EmptyRoute`] if `current` is empty, or
    /// [`PlanningError::ReplanFailed`] if the replan fails.
    fn adjust_route(
        &mut self,
        current: &Route,
        obstacles: &[ObstacleData],
    ) -> Result<Route, PlanningError>;

    /// Try to activate the estimator. Returns whether it is now active.
    fn start(&mut self) -> bool;

    /// Activate and immediately plan a route to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanningError::ActivationFailed`] if activation failed, or
    /// any error from [`calculate_route`](Self::calculate_route).
    fn start_route(
        &mut self,
        target: Coordinates,
        boundaries: Option<&FieldBoundaries>,
        precision_points: usize,
    ) -> Result<Route, PlanningError> {
        if !self.start() {
            return Err(PlanningError::ActivationFailed {
                estimator: self.name(),
            });
        }
        self.calculate_route(target, boundaries, precision_points)
    }

    /// Deactivate the estimator. Idempotent.
    fn stop(&mut self);

    /// Whether the estimator is currently active.
    fn is_active(&self) -> bool;

    /// Overwrite the simulated true position (and recalibrate, where that applies).
    fn update_simulated_position(&mut self, position: Coordinates);
}
