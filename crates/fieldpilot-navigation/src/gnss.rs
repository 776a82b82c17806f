//! Satellite-based position estimator.
//!
//! Holds a "true" simulated position and reports it with small symmetric
//! noise on each axis. Activation can fail at random, modelling a receiver
//! that does not obtain a fix.

use fieldpilot_types::{Coordinates, FieldBoundaries, ObstacleData, Route, clamp_probability};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::error::PlanningError;
use crate::estimator::PositionEstimator;
use crate::planner::{self, ReplanParams};

/// Tunables for [`GnssEstimator`].
#[derive(Debug, Clone, PartialEq)]
pub struct GnssParams {
    /// Maximum per-axis noise added to each estimate, degrees (default: 5e-6).
    pub noise_deg: f64,
    /// Probability that [`PositionEstimator::start`] fails (default: 0.05).
    pub start_failure_probability: f64,
    /// Replanning behaviour.
    pub replan: ReplanParams,
}

impl Default for GnssParams {
    fn default() -> Self {
        Self {
            noise_deg: 5e-6,
            start_failure_probability: 0.05,
            replan: ReplanParams::default(),
        }
    }
}

/// Satellite-based [`PositionEstimator`].
#[derive(Debug, Clone)]
pub struct GnssEstimator {
    params: GnssParams,
    true_position: Coordinates,
    active: bool,
    rng: SmallRng,
}

impl GnssEstimator {
    /// Estimator name used in logs and errors.
    pub const NAME: &'static str = "gnss";

    /// Create an inactive estimator at `initial` with a seeded random source.
    pub fn new(initial: Coordinates, params: GnssParams, seed: u64) -> Self {
        Self::with_rng(initial, params, SmallRng::seed_from_u64(seed))
    }

    /// Create an inactive estimator using the given random source.
    pub const fn with_rng(initial: Coordinates, params: GnssParams, rng: SmallRng) -> Self {
        Self {
            params,
            true_position: initial,
            active: false,
            rng,
        }
    }

    /// The noiseless simulated position.
    pub const fn true_position(&self) -> Coordinates {
        self.true_position
    }

    fn noise(&mut self) -> f64 {
        let magnitude = self.params.noise_deg.abs();
        if magnitude > 0.0 {
            self.rng.random_range(-magnitude..=magnitude)
        } else {
            0.0
        }
    }
}

impl PositionEstimator for GnssEstimator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn position(&mut self) -> Coordinates {
        let (d_lat, d_lon) = (self.noise(), self.noise());
        self.true_position.translated(d_lat, d_lon)
    }

    fn calculate_route(
        &mut self,
        target: Coordinates,
        boundaries: Option<&FieldBoundaries>,
        precision_points: usize,
    ) -> Result<Route, PlanningError> {
        if !self.active {
            warn!(estimator = Self::NAME, "route requested while inactive");
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
        if self
            .rng
            .random_bool(clamp_probability(self.params.start_failure_probability))
        {
            warn!(estimator = Self::NAME, "no satellite fix, start failed");
            self.active = false;
            return false;
        }
        self.active = true;
        info!(estimator = Self::NAME, position = %self.true_position, "estimator started");
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
        self.true_position = position;
    }
}
