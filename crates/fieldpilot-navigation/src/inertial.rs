//! Inertial (dead-reckoning) position estimator.
//!
//! The estimate drifts away from the last calibrated position at a fixed
//! rate per second of elapsed time, in a random direction on each axis.
//! Until the first calibration via
//! [`update_simulated_position`](PositionEstimator::update_simulated_position)
//! the estimator is unreliable: it reports its stale initial position and
//! refuses to start, so no route can be planned from it.

use std::time::Instant;

use fieldpilot_types::{Coordinates, FieldBoundaries, ObstacleData, Route};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::error::PlanningError;
use crate::estimator::PositionEstimator;
use crate::planner::{self, ReplanParams};

/// Tunables for [`InertialEstimator`].
#[derive(Debug, Clone, PartialEq)]
pub struct InertialParams {
    /// Drift per elapsed second since calibration, degrees (default: 1e-6).
    pub drift_rate_deg_per_s: f64,
    /// Replanning behaviour.
    pub replan: ReplanParams,
}

impl Default for InertialParams {
    fn default() -> Self {
        Self {
            drift_rate_deg_per_s: 1e-6,
            replan: ReplanParams::default(),
        }
    }
}

/// Inertial [`PositionEstimator`].
#[derive(Debug, Clone)]
pub struct InertialEstimator {
    params: InertialParams,
    last_fix: Coordinates,
    calibrated_at: Option<Instant>,
    active: bool,
    rng: SmallRng,
}

impl InertialEstimator {
    /// Estimator name used in logs and errors.
    pub const NAME: &'static str = "inertial";

    /// Create an uncalibrated estimator holding `initial` as its stale position.
    pub fn new(initial: Coordinates, params: InertialParams, seed: u64) -> Self {
        Self::with_rng(initial, params, SmallRng::seed_from_u64(seed))
    }

    /// Create an uncalibrated estimator using the given random source.
    pub const fn with_rng(initial: Coordinates, params: InertialParams, rng: SmallRng) -> Self {
        Self {
            params,
            last_fix: initial,
            calibrated_at: None,
            active: false,
            rng,
        }
    }

    /// Whether a calibration has ever been received.
    pub const fn is_calibrated(&self) -> bool {
        self.calibrated_at.is_some()
    }

    /// Estimate at an explicit instant; drift grows with `now - calibrated_at`.
    fn estimate_at(&mut self, now: Instant) -> Coordinates {
        let Some(calibrated_at) = self.calibrated_at else {
            return self.last_fix;
        };
        let elapsed = now.saturating_duration_since(calibrated_at).as_secs_f64();
        let drift = elapsed * self.params.drift_rate_deg_per_s.abs();
        let lat_sign = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
        let lon_sign = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
        self.last_fix.translated(lat_sign * drift, lon_sign * drift)
    }
}

impl PositionEstimator for InertialEstimator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn position(&mut self) -> Coordinates {
        self.estimate_at(Instant::now())
    }

    fn calculate_route(
        &mut self,
        target: Coordinates,
        boundaries: Option<&FieldBoundaries>,
        precision_points: usize,
    ) -> Result<Route, PlanningError> {
        if !self.active {
            warn!(
                estimator = Self::NAME,
                calibrated = self.is_calibrated(),
                "route requested while inactive"
            );
            return Err(PlanningError::EstimatorInactive {
                estimator: Self::NAME,
            });
        }
        let start = self.position();
        let route = planner::interpolate_route(start, target, precision_points);
        debug!(
            estimator = Self::NAME,
            %start,
            %target,
            waypoints = route.len(),
            bounded = boundaries.is_some(),
            "route calculated"
        );
        Ok(route)
    }

    fn adjust_route(
        &mut self,
        current: &Route,
        obstacles: &[ObstacleData],
    ) -> Result<Route, PlanningError> {
        if !self.active {
            return Err(PlanningError::EstimatorInactive {
                estimator: Self::NAME,
            });
        }
        planner::adjust_route(Self::NAME, current, obstacles, &self.params.replan, &mut self.rng)
    }

    fn start(&mut self) -> bool {
        if !self.is_calibrated() {
            warn!(estimator = Self::NAME, "cannot start before first calibration");
            self.active = false;
            return false;
        }
        self.active = true;
        info!(estimator = Self::NAME, position = %self.last_fix, "estimator started");
        true
    }

    fn stop(&mut self) {
        if self.active {
            info!(estimator = Self::NAME, "estimator stopped");
        }
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn update_simulated_position(&mut self, position: Coordinates) {
        self.last_fix = position;
        self.calibrated_at = Some(Instant::now());
        self.active = true;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn uncalibrated_estimator_reports_stale_position() {
        let initial = Coordinates::new(3.0, 4.0);
        let mut estimator = InertialEstimator::new(initial, InertialParams::default(), 1);
        assert_eq!(estimator.position(), initial);
        assert!(!estimator.is_calibrated());
    }

    #[test]
    fn uncalibrated_estimator_cannot_start_or_plan() {
        let mut estimator =
            InertialEstimator::new(Coordinates::default(), InertialParams::default(), 1);
        assert!(!estimator.start());
        assert!(!estimator.is_active());
        assert_eq!(
            estimator.calculate_route(Coordinates::new(1.0, 1.0), None, 3),
            Err(PlanningError::EstimatorInactive {
                estimator: "inertial"
            })
        );
        assert_eq!(
            estimator.start_route(Coordinates::new(1.0, 1.0), None, 3),
            Err(PlanningError::ActivationFailed {
                estimator: "inertial"
            })
        );
    }

    #[test]
    fn calibration_activates() {
        let mut estimator =
            InertialEstimator::new(Coordinates::default(), InertialParams::default(), 1);
        estimator.update_simulated_position(Coordinates::new(1.0, 2.0));
        assert!(estimator.is_active());
        assert!(estimator.start());
        let route = estimator.calculate_route(Coordinates::new(1.001, 2.001), None, 3).unwrap();
        assert_eq!(route.len(), 5);
        assert!(route.first().unwrap().is_within(Coordinates::new(1.0, 2.0), 1e-6));
    }

    #[test]
    fn drift_grows_with_elapsed_time() {
        let fix = Coordinates::new(10.0, 10.0);
        let mut estimator = InertialEstimator::new(fix, InertialParams::default(), 5);
        estimator.update_simulated_position(fix);
        let calibrated_at = estimator.calibrated_at.unwrap();

        let after_ten = estimator.estimate_at(calibrated_at + Duration::from_secs(10));
        assert!(((after_ten.latitude - fix.latitude).abs() - 1e-5).abs() < 1e-12);
        assert!(((after_ten.longitude - fix.longitude).abs() - 1e-5).abs() < 1e-12);

        let at_calibration = estimator.estimate_at(calibrated_at);
        assert_eq!(at_calibration, fix);
    }

    #[test]
    fn recalibration_resets_drift() {
        let mut estimator =
            InertialEstimator::new(Coordinates::default(), InertialParams::default(), 5);
        estimator.update_simulated_position(Coordinates::new(1.0, 1.0));
        estimator.update_simulated_position(Coordinates::new(2.0, 2.0));
        let calibrated_at = estimator.calibrated_at.unwrap();
        assert_eq!(estimator.estimate_at(calibrated_at), Coordinates::new(2.0, 2.0));
    }

    #[test]
    fn stop_after_calibration_blocks_planning() {
        let mut estimator =
            InertialEstimator::new(Coordinates::default(), InertialParams::default(), 1);
        estimator.update_simulated_position(Coordinates::new(1.0, 1.0));
        estimator.stop();
        assert!(estimator.calculate_route(Coordinates::new(2.0, 2.0), None, 3).is_err());
        assert!(estimator.start());
    }
}
