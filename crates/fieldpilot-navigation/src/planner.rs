//! Route interpolation and obstacle-driven route adjustment.
//!
//! Planning is deliberately approximate. The initial route is a straight
//! line sampled at evenly spaced fractions. A replan does not model obstacle
//! geometry: it jitters every waypoint, more strongly and pushed away from
//! the nearest obstacle when any obstacle looks like a rock.
//!
//! | Obstacle kind | Per-waypoint displacement |
//! |---------------|---------------------------|
//! | rock-like     | outward from nearest rock, 2e-5 to 5e-5 deg, plus +/-1e-5 jitter |
//! | other         | symmetric +/-1e-5 deg on each axis |

use core::f64::consts::TAU;

use fieldpilot_types::{Coordinates, ObstacleData, Route, clamp_probability};
use rand::Rng;
use tracing::{debug, warn};

use crate::error::PlanningError;

/// Symmetric per-axis jitter for generic obstacles, degrees.
const GENERIC_JITTER_DEG: f64 = 1e-5;

/// Minimum outward push away from a rock, degrees.
const ROCK_PUSH_MIN_DEG: f64 = 2e-5;

/// Maximum outward push away from a rock, degrees.
const ROCK_PUSH_MAX_DEG: f64 = 5e-5;

/// Tunables for obstacle replanning.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplanParams {
    /// Probability that a replan with obstacles fails outright (default: 0.05).
    pub failure_probability: f64,
}

impl Default for ReplanParams {
    fn default() -> Self {
        Self {
            failure_probability: 0.05,
        }
    }
}

/// Build a straight route from `start` to `target`.
///
/// Returns `precision_points + 2` waypoints. Intermediate point `i` (for
/// `i` in `1..=precision_points`) sits at fraction `i / (precision_points + 1)`
/// along the segment. The endpoints are copied exactly.
#[allow(clippy::cast_precision_loss)]
pub fn interpolate_route(
    start: Coordinates,
    target: Coordinates,
    precision_points: usize,
) -> Route {
    let segments = precision_points.saturating_add(1);
    let mut waypoints = Vec::with_capacity(segments.saturating_add(1));
    waypoints.push(start);
    waypoints.extend(
        (1..=precision_points).map(|i| start.lerp(target, i as f64 / segments as f64)),
    );
    waypoints.push(target);
    Route::new(waypoints)
}

/// Shared adjustment logic for every estimator (after its activity check).
///
/// # Errors
///
/// [`PlanningError::EmptyRoute`] for an empty `current`, or
/// [`PlanningError::ReplanFailed`] when the failure roll hits.
pub fn adjust_route(
    estimator: &'static str,
    current: &Route,
    obstacles: &[ObstacleData],
    params: &ReplanParams,
    rng: &mut impl Rng,
) -> Result<Route, PlanningError> {
    if current.is_empty() {
        return Err(PlanningError::EmptyRoute);
    }
    if obstacles.is_empty() {
        return Ok(current.clone());
    }

    if rng.random_bool(clamp_probability(params.failure_probability)) {
        warn!(
            estimator,
            obstacles = obstacles.len(),
            "replanning around obstacles failed"
        );
        return Err(PlanningError::ReplanFailed { estimator });
    }

    let rocks: Vec<Coordinates> = obstacles
        .iter()
        .filter(|obstacle| obstacle.is_rock_like())
        .map(|obstacle| obstacle.position)
        .collect();

    let adjusted: Route = if rocks.is_empty() {
        current
            .iter()
            .map(|waypoint| {
                waypoint.translated(
                    symmetric(rng, GENERIC_JITTER_DEG),
                    symmetric(rng, GENERIC_JITTER_DEG),
                )
            })
            .collect()
    } else {
        current
            .iter()
            .map(|waypoint| push_away_from_rocks(*waypoint, &rocks, rng))
            .collect()
    };

    debug!(
        estimator,
        waypoints = adjusted.len(),
        obstacles = obstacles.len(),
        rock_like = rocks.len(),
        "route adjusted around obstacles"
    );
    Ok(adjusted)
}

/// Displace `waypoint` away from the nearest rock, with a little jitter.
fn push_away_from_rocks(
    waypoint: Coordinates,
    rocks: &[Coordinates],
    rng: &mut impl Rng,
) -> Coordinates {
    let nearest = rocks.iter().copied().min_by(|a, b| {
        waypoint
            .distance_to(*a)
            .total_cmp(&waypoint.distance_to(*b))
    });

    let bearing = match nearest {
        Some(rock) if waypoint.distance_to(rock) > f64::EPSILON => {
            (waypoint.longitude - rock.longitude).atan2(waypoint.latitude - rock.latitude)
        }
        _ => rng.random_range(0.0..TAU),
    };
    let push = rng.random_range(ROCK_PUSH_MIN_DEG..ROCK_PUSH_MAX_DEG);

    waypoint.translated(
        push.mul_add(bearing.cos(), symmetric(rng, GENERIC_JITTER_DEG)),
        push.mul_add(bearing.sin(), symmetric(rng, GENERIC_JITTER_DEG)),
    )
}

/// Uniform draw from `[-magnitude, magnitude]`.
fn symmetric(rng: &mut impl Rng, magnitude: f64) -> f64 {
    rng.random_range(-magnitude..=magnitude)
}
