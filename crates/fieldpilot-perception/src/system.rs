//! The perception capability shared by all detectors.

use fieldpilot_types::{Coordinates, FieldFeatureData, ObstacleData};
use serde::{Deserialize, Serialize};

use crate::error::PerceptionError;

/// A detector that reports obstacles and field features around a position.
///
/// Detection is gated by an active flag: an inactive detector returns empty
/// results without touching its inputs.
pub trait PerceptionSystem: Send {
    /// Short name used in logs and errors (e.g. `"camera"`).
    fn name(&self) -> &'static str;

    /// Enable detection.
    fn activate(&mut self);

    /// Disable detection. Idempotent.
    fn deactivate(&mut self);

    /// Whether detection is enabled.
    fn is_active(&self) -> bool;

    /// Obstacles near `position`.
    fn detect_obstacles(
        &mut self,
        position: Coordinates,
    ) -> Result<Vec<ObstacleData>, PerceptionError>;

    /// Agronomic features near `position`.
    fn analyze_field_features(
        &mut self,
        position: Coordinates,
    ) -> Result<Vec<FieldFeatureData>, PerceptionError>;
}

/// Selects a perception variant in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerceptionKind {
    /// [`CameraPerception`](crate::CameraPerception).
    Camera,
    /// [`LidarPerception`](crate::LidarPerception).
    Lidar,
}

impl PerceptionKind {
    /// Lower-case display name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Lidar => "lidar",
        }
    }
}

impl core::fmt::Display for PerceptionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
