//! Configuration loading and typed config structures for FieldPilot.
//!
//! The canonical configuration lives in `fieldpilot-config.yaml` at the
//! project root. Every section and field has a default, so an empty file (or
//! no file at all) yields a working simulated vehicle.

use std::path::Path;
use std::time::Duration;

use fieldpilot_navigation::{GnssParams, InertialParams, ReplanParams};
use fieldpilot_perception::{CameraParams, LidarParams, PerceptionKind, RouterParams};
use fieldpilot_types::{Coordinates, FieldBoundaries, ImplementType};
use serde::Deserialize;
use tracing::warn;

use crate::control::ControlParams;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of its allowed range.
    #[error("invalid config: {reason}")]
    Invalid {
        /// Which value is wrong and why.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Which position estimator drives the vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    /// Satellite fix.
    #[default]
    Gnss,
    /// Dead reckoning.
    Inertial,
}

/// Top-level FieldPilot configuration.
///
/// Mirrors the structure of `fieldpilot-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FieldPilotConfig {
    /// Vehicle start position, motion, and estimator choice.
    #[serde(default)]
    pub vehicle: VehicleConfig,

    /// Satellite estimator tunables.
    #[serde(default)]
    pub gnss: GnssConfig,

    /// Inertial estimator tunables.
    #[serde(default)]
    pub inertial: InertialConfig,

    /// Perception variants, routing, and caching.
    #[serde(default)]
    pub perception: PerceptionConfig,

    /// Auxiliary sensors and the collision guard.
    #[serde(default)]
    pub sensors: SensorsConfig,

    /// Operation started automatically by the engine.
    #[serde(default)]
    pub mission: MissionConfig,

    /// Engine loop settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FieldPilotConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `FIELDPILOT_SEED` overrides `engine.seed`
    /// - `FIELDPILOT_LOG_LEVEL` overrides `logging.level`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, applying environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("FIELDPILOT_SEED") {
            match raw.trim().parse() {
                Ok(seed) => self.engine.seed = seed,
                Err(e) => warn!(value = %raw, error = %e, "ignoring invalid FIELDPILOT_SEED"),
            }
        }
        if let Some(level) = lookup("FIELDPILOT_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Check value ranges that the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("vehicle.step_deg", self.vehicle.step_deg)?;
        positive("vehicle.arrival_tolerance_deg", self.vehicle.arrival_tolerance_deg)?;
        positive(
            "perception.position_tolerance_deg",
            self.perception.position_tolerance_deg,
        )?;
        non_negative("gnss.noise_deg", self.gnss.noise_deg)?;
        non_negative("inertial.drift_rate_deg_per_s", self.inertial.drift_rate_deg_per_s)?;
        non_negative("sensors.critical_distance_m", self.sensors.critical_distance_m)?;

        for (name, value) in [
            ("gnss.start_failure_probability", self.gnss.start_failure_probability),
            ("gnss.replan_failure_probability", self.gnss.replan_failure_probability),
            ("inertial.replan_failure_probability", self.inertial.replan_failure_probability),
            ("perception.camera.obstacle_probability", self.perception.camera.obstacle_probability),
            ("perception.camera.feature_probability", self.perception.camera.feature_probability),
            (
                "perception.camera.frame_dropout_probability",
                self.perception.camera.frame_dropout_probability,
            ),
            ("perception.lidar.obstacle_probability", self.perception.lidar.obstacle_probability),
            ("perception.lidar.fault_probability", self.perception.lidar.fault_probability),
        ] {
            probability(name, value)?;
        }

        if self.perception.backup == Some(self.perception.primary) {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "perception.backup must differ from perception.primary ({})",
                    self.perception.primary
                ),
            });
        }
        if self.sensors.forward_max_m < self.sensors.forward_min_m {
            return Err(ConfigError::Invalid {
                reason: "sensors.forward_max_m is below sensors.forward_min_m".to_owned(),
            });
        }
        Ok(())
    }

    /// Route-following parameters for the control unit.
    pub fn control_params(&self) -> ControlParams {
        ControlParams {
            arrival_tolerance_deg: self.vehicle.arrival_tolerance_deg,
            step_deg: self.vehicle.step_deg,
            critical_distance_m: self.sensors.critical_distance_m,
            precision_points: self.vehicle.precision_points,
            survey_features: self.perception.survey_features,
        }
    }
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            reason: format!("{name} must be positive, got {value}"),
        })
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            reason: format!("{name} must be zero or more, got {value}"),
        })
    }
}

fn probability(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            reason: format!("{name} must be within [0, 1], got {value}"),
        })
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Vehicle configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VehicleConfig {
    /// Simulated true position at power-on.
    #[serde(default = "default_start")]
    pub start: Coordinates,

    /// Position estimator to use.
    #[serde(default)]
    pub estimator: EstimatorKind,

    /// Give the inertial estimator its first fix at `start`.
    #[serde(default = "default_true")]
    pub calibrate_inertial: bool,

    /// Distance moved per step, degrees.
    #[serde(default = "default_step_deg")]
    pub step_deg: f64,

    /// Distance at which a waypoint counts as reached, degrees.
    #[serde(default = "default_arrival_tolerance_deg")]
    pub arrival_tolerance_deg: f64,

    /// Intermediate waypoints in a new route.
    #[serde(default = "default_precision_points")]
    pub precision_points: usize,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            start: default_start(),
            estimator: EstimatorKind::default(),
            calibrate_inertial: default_true(),
            step_deg: default_step_deg(),
            arrival_tolerance_deg: default_arrival_tolerance_deg(),
            precision_points: default_precision_points(),
        }
    }
}

/// Satellite estimator configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GnssConfig {
    /// Maximum per-axis noise, degrees.
    #[serde(default = "default_gnss_noise_deg")]
    pub noise_deg: f64,

    /// Chance that the receiver fails to start.
    #[serde(default = "default_failure_probability")]
    pub start_failure_probability: f64,

    /// Chance that a replan around obstacles fails.
    #[serde(default = "default_failure_probability")]
    pub replan_failure_probability: f64,
}

impl GnssConfig {
    /// Estimator parameters.
    pub const fn params(&self) -> GnssParams {
        GnssParams {
            noise_deg: self.noise_deg,
            start_failure_probability: self.start_failure_probability,
            replan: ReplanParams {
                failure_probability: self.replan_failure_probability,
            },
        }
    }
}

impl Default for GnssConfig {
    fn default() -> Self {
        Self {
            noise_deg: default_gnss_noise_deg(),
            start_failure_probability: default_failure_probability(),
            replan_failure_probability: default_failure_probability(),
        }
    }
}

/// Inertial estimator configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InertialConfig {
    /// Drift per second since calibration, degrees.
    #[serde(default = "default_drift_rate_deg_per_s")]
    pub drift_rate_deg_per_s: f64,

    /// Chance that a replan around obstacles fails.
    #[serde(default = "default_failure_probability")]
    pub replan_failure_probability: f64,
}

impl InertialConfig {
    /// Estimator parameters.
    pub const fn params(&self) -> InertialParams {
        InertialParams {
            drift_rate_deg_per_s: self.drift_rate_deg_per_s,
            replan: ReplanParams {
                failure_probability: self.replan_failure_probability,
            },
        }
    }
}

impl Default for InertialConfig {
    fn default() -> Self {
        Self {
            drift_rate_deg_per_s: default_drift_rate_deg_per_s(),
            replan_failure_probability: default_failure_probability(),
        }
    }
}

/// Perception configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PerceptionConfig {
    /// Detector queried first.
    #[serde(default = "default_primary_perception")]
    pub primary: PerceptionKind,

    /// Detector built on first failure of the primary; `null` disables failover.
    #[serde(default = "default_backup_perception")]
    pub backup: Option<PerceptionKind>,

    /// How long a cached detection result stays valid, milliseconds.
    #[serde(default = "default_perception_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// Per-axis distance within which a query reuses the cached result, degrees.
    #[serde(default = "default_position_tolerance_deg")]
    pub position_tolerance_deg: f64,

    /// Query field features on every step.
    #[serde(default)]
    pub survey_features: bool,

    /// Camera detector settings.
    #[serde(default)]
    pub camera: CameraConfig,

    /// LiDAR detector settings.
    #[serde(default)]
    pub lidar: LidarConfig,
}

impl PerceptionConfig {
    /// Router parameters.
    pub const fn router_params(&self) -> RouterParams {
        RouterParams {
            cache_ttl: Duration::from_millis(self.cache_ttl_ms),
            position_tolerance_deg: self.position_tolerance_deg,
        }
    }
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_perception(),
            backup: default_backup_perception(),
            cache_ttl_ms: default_perception_cache_ttl_ms(),
            position_tolerance_deg: default_position_tolerance_deg(),
            survey_features: false,
            camera: CameraConfig::default(),
            lidar: LidarConfig::default(),
        }
    }
}

/// Camera detector configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CameraConfig {
    /// Chance that a query reports an obstacle.
    #[serde(default = "default_camera_obstacle_probability")]
    pub obstacle_probability: f64,

    /// Chance that a query reports field features.
    #[serde(default = "default_camera_feature_probability")]
    pub feature_probability: f64,

    /// Chance that the camera delivers no frame.
    #[serde(default = "default_frame_dropout_probability")]
    pub frame_dropout_probability: f64,

    /// Frame width in pixels.
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,

    /// Frame height in pixels.
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
}

impl CameraConfig {
    /// Detector parameters.
    pub fn params(&self) -> CameraParams {
        CameraParams {
            obstacle_probability: self.obstacle_probability,
            feature_probability: self.feature_probability,
            ..CameraParams::default()
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            obstacle_probability: default_camera_obstacle_probability(),
            feature_probability: default_camera_feature_probability(),
            frame_dropout_probability: default_frame_dropout_probability(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
        }
    }
}

/// LiDAR detector configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LidarConfig {
    /// Chance that a query reports an obstacle.
    #[serde(default = "default_lidar_obstacle_probability")]
    pub obstacle_probability: f64,

    /// Closest return, metres.
    #[serde(default = "default_lidar_min_range_m")]
    pub min_range_m: f64,

    /// Farthest return, metres.
    #[serde(default = "default_lidar_max_range_m")]
    pub max_range_m: f64,

    /// Chance that a scan faults.
    #[serde(default)]
    pub fault_probability: f64,
}

impl LidarConfig {
    /// Detector parameters.
    pub const fn params(&self) -> LidarParams {
        LidarParams {
            obstacle_probability: self.obstacle_probability,
            range_m: (self.min_range_m, self.max_range_m),
            fault_probability: self.fault_probability,
        }
    }
}

impl Default for LidarConfig {
    fn default() -> Self {
        Self {
            obstacle_probability: default_lidar_obstacle_probability(),
            min_range_m: default_lidar_min_range_m(),
            max_range_m: default_lidar_max_range_m(),
            fault_probability: 0.0,
        }
    }
}

/// Auxiliary sensor configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorsConfig {
    /// Forward range finder cache TTL, milliseconds.
    #[serde(default = "default_forward_distance_ttl_ms")]
    pub forward_distance_ttl_ms: u64,

    /// Soil probe cache TTL, milliseconds.
    #[serde(default = "default_soil_ttl_ms")]
    pub soil_ttl_ms: u64,

    /// Forward readings strictly between zero and this abort the operation, metres.
    #[serde(default = "default_critical_distance_m")]
    pub critical_distance_m: f64,

    /// Closest simulated forward reading, metres.
    #[serde(default = "default_forward_min_m")]
    pub forward_min_m: f64,

    /// Farthest simulated forward reading, metres.
    #[serde(default = "default_forward_max_m")]
    pub forward_max_m: f64,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            forward_distance_ttl_ms: default_forward_distance_ttl_ms(),
            soil_ttl_ms: default_soil_ttl_ms(),
            critical_distance_m: default_critical_distance_m(),
            forward_min_m: default_forward_min_m(),
            forward_max_m: default_forward_max_m(),
        }
    }
}

/// Operation the engine starts on its own.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MissionConfig {
    /// Start the mission as soon as the engine is up.
    #[serde(default)]
    pub auto_start: bool,

    /// Where to go.
    #[serde(default = "default_target")]
    pub target: Coordinates,

    /// Implement to attach and activate.
    #[serde(default)]
    pub implement: ImplementType,

    /// Field polygon; empty means unconstrained.
    #[serde(default)]
    pub boundaries: Vec<Coordinates>,
}

impl MissionConfig {
    /// The field polygon, if one is configured.
    pub fn field_boundaries(&self) -> Option<FieldBoundaries> {
        if self.boundaries.is_empty() {
            None
        } else {
            Some(FieldBoundaries::new(self.boundaries.clone()))
        }
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            auto_start: false,
            target: default_target(),
            implement: ImplementType::None,
            boundaries: Vec::new(),
        }
    }
}

/// Engine loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Base random seed; each component derives its own from it.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds between steps.
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,

    /// Stop after this many steps; 0 runs until stdin closes.
    #[serde(default)]
    pub max_steps: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            step_interval_ms: default_step_interval_ms(),
            max_steps: 0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_start() -> Coordinates {
    Coordinates::new(52.0, 5.0)
}

const fn default_target() -> Coordinates {
    Coordinates::new(52.0005, 5.0005)
}

const fn default_true() -> bool {
    true
}

const fn default_step_deg() -> f64 {
    2e-5
}

const fn default_arrival_tolerance_deg() -> f64 {
    5e-5
}

const fn default_precision_points() -> usize {
    fieldpilot_navigation::DEFAULT_PRECISION_POINTS
}

const fn default_gnss_noise_deg() -> f64 {
    5e-6
}

const fn default_failure_probability() -> f64 {
    0.05
}

const fn default_drift_rate_deg_per_s() -> f64 {
    1e-6
}

const fn default_primary_perception() -> PerceptionKind {
    PerceptionKind::Camera
}

#[allow(clippy::unnecessary_wraps)]
const fn default_backup_perception() -> Option<PerceptionKind> {
    Some(PerceptionKind::Lidar)
}

const fn default_perception_cache_ttl_ms() -> u64 {
    500
}

const fn default_position_tolerance_deg() -> f64 {
    1e-5
}

const fn default_camera_obstacle_probability() -> f64 {
    0.2
}

const fn default_camera_feature_probability() -> f64 {
    1.0 / 3.0
}

const fn default_frame_dropout_probability() -> f64 {
    0.02
}

const fn default_frame_width() -> u32 {
    640
}

const fn default_frame_height() -> u32 {
    480
}

const fn default_lidar_obstacle_probability() -> f64 {
    0.25
}

const fn default_lidar_min_range_m() -> f64 {
    1.0
}

const fn default_lidar_max_range_m() -> f64 {
    16.0
}

const fn default_forward_distance_ttl_ms() -> u64 {
    200
}

const fn default_soil_ttl_ms() -> u64 {
    5_000
}

const fn default_critical_distance_m() -> f64 {
    1.0
}

const fn default_forward_min_m() -> f64 {
    0.5
}

const fn default_forward_max_m() -> f64 {
    30.0
}

const fn default_seed() -> u64 {
    42
}

const fn default_step_interval_ms() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_owned()
}
