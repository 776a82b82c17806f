//! Camera-based perception.
//!
//! Each query first pulls a frame from the camera source; without a frame
//! there is nothing to analyse and the query fails. Detection itself is a
//! randomised stand-in for a vision model. "Forward" is north, since the
//! vehicle heading is not modelled.

use core::f64::consts::FRAC_PI_2;

use fieldpilot_sensors::SensorSource;
use fieldpilot_types::{
    CameraFrame, Coordinates, FieldFeatureData, FieldFeatureType, ObstacleData, clamp_probability,
};
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::PerceptionError;
use crate::system::PerceptionSystem;

/// What the vision model may call an obstacle.
const OBSTACLE_LABELS: [&str; 5] = ["rock", "large stone", "tree stump", "fence post", "animal"];

/// Tunables for [`CameraPerception`].
#[derive(Debug, Clone, PartialEq)]
pub struct CameraParams {
    /// Chance that a query reports an obstacle (default: 1 in 5).
    pub obstacle_probability: f64,
    /// Chance that a query reports field features (default: 1 in 3).
    pub feature_probability: f64,
    /// Most features reported by one query (default: 3).
    pub max_features: u32,
    /// Forward distance band for obstacles, metres (default: 1 to 6).
    pub obstacle_forward_m: (f64, f64),
    /// Maximum sideways offset of an obstacle, metres (default: 1.5).
    pub obstacle_lateral_m: f64,
    /// Distance band for features, metres (default: 1 to 6).
    pub feature_distance_m: (f64, f64),
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            obstacle_probability: 0.2,
            feature_probability: 1.0 / 3.0,
            max_features: 3,
            obstacle_forward_m: (1.0, 6.0),
            obstacle_lateral_m: 1.5,
            feature_distance_m: (1.0, 6.0),
        }
    }
}

/// Frame-driven [`PerceptionSystem`].
pub struct CameraPerception {
    params: CameraParams,
    frames: Box<dyn SensorSource<CameraFrame>>,
    active: bool,
    rng: SmallRng,
}

impl CameraPerception {
    /// Detector name used in logs and errors.
    pub const NAME: &'static str = "camera";

    /// Create an inactive camera detector reading frames from `frames`.
    pub fn new(
        frames: impl SensorSource<CameraFrame> + 'static,
        params: CameraParams,
        seed: u64,
    ) -> Self {
        Self {
            params,
            frames: Box::new(frames),
            active: false,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn capture(&mut self) -> Result<CameraFrame, PerceptionError> {
        self.frames
            .read()
            .map_err(|source| PerceptionError::SourceUnavailable {
                system: Self::NAME,
                source,
            })
    }

    fn roll(&mut self, probability: f64) -> bool {
        self.rng.random_bool(clamp_probability(probability))
    }

    fn draw(&mut self, (min, max): (f64, f64)) -> f64 {
        if max > min {
            self.rng.random_range(min..max)
        } else {
            min
        }
    }
}

impl core::fmt::Debug for CameraPerception {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CameraPerception")
            .field("params", &self.params)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl PerceptionSystem for CameraPerception {
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
        let frame = self.capture()?;
        if !self.roll(self.params.obstacle_probability) {
            return Ok(Vec::new());
        }

        let forward = self.draw(self.params.obstacle_forward_m);
        let lateral_max = self.params.obstacle_lateral_m.abs();
        let lateral = self.draw((-lateral_max, lateral_max));
        let label = OBSTACLE_LABELS.choose(&mut self.rng).copied().unwrap_or("object");
        let obstacle = ObstacleData::new(position.offset_meters(forward, lateral), label);
        debug!(
            system = Self::NAME,
            frame = frame.sequence,
            description = %obstacle.description,
            at = %obstacle.position,
            "obstacle detected"
        );
        Ok(vec![obstacle])
    }

    fn analyze_field_features(
        &mut self,
        position: Coordinates,
    ) -> Result<Vec<FieldFeatureData>, PerceptionError> {
        if !self.active {
            return Ok(Vec::new());
        }
        let frame = self.capture()?;
        if !self.roll(self.params.feature_probability) {
            return Ok(Vec::new());
        }

        let count = self.rng.random_range(1..=self.params.max_features.max(1));
        let features: Vec<FieldFeatureData> = (0..count)
            .map(|_| {
                let bearing = self.rng.random_range(-FRAC_PI_2..=FRAC_PI_2);
                let distance = self.draw(self.params.feature_distance_m);
                let feature_type = FieldFeatureType::DETECTABLE
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or_default();
                FieldFeatureData {
                    position: position.offset_polar(bearing, distance),
                    feature_type,
                    details: format!("{} seen in frame {}", describe(feature_type), frame.sequence),
                }
            })
            .collect();
        debug!(system = Self::NAME, count = features.len(), "field features found");
        Ok(features)
    }
}

const fn describe(feature: FieldFeatureType) -> &'static str {
    match feature {
        FieldFeatureType::Unknown => "unclassified patch",
        FieldFeatureType::DangerousWeed => "weed cluster",
        FieldFeatureType::WaterLogging => "standing water",
        FieldFeatureType::PestInfestation => "pest damage",
    }
}
