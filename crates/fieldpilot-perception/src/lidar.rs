//! Ranging (LiDAR) perception.
//!
//! Returns carry a distance and bearing but no classification, so obstacle
//! descriptions are generic and never rock-like. There is no field-feature
//! capability.

use core::f64::consts::TAU;

use fieldpilot_types::{Coordinates, FieldFeatureData, ObstacleData, clamp_probability};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::error::PerceptionError;
use crate::system::PerceptionSystem;

/// Tunables for [`LidarPerception`].
#[derive(Debug, Clone, PartialEq)]
pub struct LidarParams {
    /// Chance that a query reports an obstacle (default: 1 in 4).
    pub obstacle_probability: f64,
    /// Distance band for returns, metres (default: 1 to 16).
    pub range_m: (f64, f64),
    /// Chance that a scan faults outright (default: 0).
    pub fault_probability: f64,
}

impl Default for LidarParams {
    fn default() -> Self {
        Self {
            obstacle_probability: 0.25,
            range_m: (1.0, 16.0),
            fault_probability: 0.0,
        }
    }
}

/// Ranging [`PerceptionSystem`].
#[derive(Debug, Clone)]
pub struct LidarPerception {
    params: LidarParams,
    active: bool,
    rng: SmallRng,
}

impl LidarPerception {
    /// Detector name used in logs and errors.
    pub const NAME: &'static str = "lidar";

    /// Create an inactive LiDAR detector.
    pub fn new(params: LidarParams, seed: u64) -> Self {
        Self {
            params,
            active: false,
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl PerceptionSystem for LidarPerception {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn activate(&mut self) {
        self.active = true;
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn detect_obstacles(
        &mut self,
        position: Coordinates,
    ) -> Result<Vec<ObstacleData>, PerceptionError> {
        if !self.active {
            return Ok(Vec::new());
        }
        if self.rng.random_bool(clamp_probability(self.params.fault_probability)) {
            warn!(system = Self::NAME, "scan fault");
            return Err(PerceptionError::Fault {
                system: Self::NAME,
                reason: "scan returned no points".to_owned(),
            });
        }
        if !self.rng.random_bool(clamp_probability(self.params.obstacle_probability)) {
            return Ok(Vec::new());
        }

        let bearing = self.rng.random_range(0.0..TAU);
        let (min, max) = self.params.range_m;
        let distance = if max > min {
            self.rng.random_range(min..max)
        } else {
            min
        };
        let obstacle = ObstacleData::new(
            position.offset_polar(bearing, distance),
            format!("lidar return at {distance:.1} m"),
        );
        debug!(system = Self::NAME, at = %obstacle.position, "obstacle detected");
        Ok(vec![obstacle])
    }

    fn analyze_field_features(
        &mut self,
        _position: Coordinates,
    ) -> Result<Vec<FieldFeatureData>, PerceptionError> {
        Ok(Vec::new())
    }
}
