//! Assembly of a [`ControlUnit`] from [`FieldPilotConfig`].
//!
//! Every stochastic component gets its own seed, derived from
//! `engine.seed` by a fixed offset, so one base seed reproduces a whole run
//! while components stay statistically independent.

use std::sync::Arc;
use std::time::Duration;

use fieldpilot_navigation::{GnssEstimator, InertialEstimator, PositionEstimator};
use fieldpilot_perception::{
    BackupFactory, CameraPerception, LidarPerception, PerceptionKind, PerceptionRouter,
    PerceptionSystem,
};
use fieldpilot_sensors::{SimulatedCamera, SimulatedRangeFinder, SimulatedSoilProbe, TimedCache};
use tracing::info;

use crate::config::{ConfigError, EstimatorKind, FieldPilotConfig, PerceptionConfig};
use crate::control::ControlUnit;

const ESTIMATOR_SEED: u64 = 1;
const CAMERA_FRAMES_SEED: u64 = 2;
const CAMERA_SEED: u64 = 3;
const LIDAR_SEED: u64 = 4;
const RANGE_FINDER_SEED: u64 = 5;
const SOIL_PROBE_SEED: u64 = 6;

/// Validate `config` and build a stopped control unit from it.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the configuration fails validation.
pub fn build_control_unit(config: &FieldPilotConfig) -> Result<ControlUnit, ConfigError> {
    config.validate()?;
    let seed = config.engine.seed;

    let estimator = build_estimator(config);

    let primary = build_perception(config.perception.primary, &config.perception, seed);
    let backup_factory = config.perception.backup.map(|kind| {
        let perception = config.perception.clone();
        let factory: BackupFactory = Box::new(move || build_perception(kind, &perception, seed));
        factory
    });
    let router = PerceptionRouter::new(
        primary,
        backup_factory,
        &config.perception.router_params(),
    );

    let sensors = &config.sensors;
    let (forward_min, forward_max) = (sensors.forward_min_m, sensors.forward_max_m);
    let forward_distance = Arc::new(TimedCache::new(
        "forward_distance",
        Duration::from_millis(sensors.forward_distance_ttl_ms),
        move || {
            SimulatedRangeFinder::new(
                seed.wrapping_add(RANGE_FINDER_SEED),
                forward_min,
                forward_max,
            )
        },
    ));
    let soil = Arc::new(TimedCache::new(
        "soil",
        Duration::from_millis(sensors.soil_ttl_ms),
        move || SimulatedSoilProbe::new(seed.wrapping_add(SOIL_PROBE_SEED)),
    ));

    info!(
        seed,
        estimator = estimator.name(),
        primary = %config.perception.primary,
        backup = ?config.perception.backup,
        "control unit assembled"
    );
    Ok(ControlUnit::new(
        config.control_params(),
        estimator,
        router,
        forward_distance,
        soil,
    ))
}

fn build_estimator(config: &FieldPilotConfig) -> Box<dyn PositionEstimator> {
    let seed = config.engine.seed.wrapping_add(ESTIMATOR_SEED);
    let start = config.vehicle.start;
    match config.vehicle.estimator {
        EstimatorKind::Gnss => Box::new(GnssEstimator::new(start, config.gnss.params(), seed)),
        EstimatorKind::Inertial => {
            let mut estimator = InertialEstimator::new(start, config.inertial.params(), seed);
            if config.vehicle.calibrate_inertial {
                estimator.update_simulated_position(start);
            }
            Box::new(estimator)
        }
    }
}

fn build_perception(
    kind: PerceptionKind,
    config: &PerceptionConfig,
    seed: u64,
) -> Box<dyn PerceptionSystem> {
    match kind {
        PerceptionKind::Camera => {
            let camera = &config.camera;
            let frames = SimulatedCamera::new(
                seed.wrapping_add(CAMERA_FRAMES_SEED),
                camera.frame_width,
                camera.frame_height,
                camera.frame_dropout_probability,
            );
            Box::new(CameraPerception::new(
                frames,
                camera.params(),
                seed.wrapping_add(CAMERA_SEED),
            ))
        }
        PerceptionKind::Lidar => Box::new(LidarPerception::new(
            config.lidar.params(),
            seed.wrapping_add(LIDAR_SEED),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fieldpilot_perception::RouterVariant;
    use fieldpilot_types::{Coordinates, ImplementType};

    use super::*;
    use crate::lifecycle::OperationState;

    #[test]
    fn default_config_builds_gnss_unit() {
        let unit = build_control_unit(&FieldPilotConfig::default()).unwrap();
        assert_eq!(unit.estimator_name(), "gnss");
        assert_eq!(unit.state(), OperationState::Stopped);
        assert_eq!(unit.perception().active_variant(), RouterVariant::Primary);
        assert!(!unit.perception().backup_initialized());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = FieldPilotConfig::default();
        config.vehicle.arrival_tolerance_deg = -1.0;
        assert!(matches!(
            build_control_unit(&config),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn calibrated_inertial_unit_can_start() {
        let mut config = FieldPilotConfig::default();
        config.vehicle.estimator = EstimatorKind::Inertial;
        let mut unit = build_control_unit(&config).unwrap();
        assert_eq!(unit.estimator_name(), "inertial");
        unit.start_operation(Coordinates::new(52.001, 5.001), None, ImplementType::None).unwrap();
        assert!(unit.is_operating());
    }

    #[test]
    fn uncalibrated_inertial_unit_cannot_start() {
        let mut config = FieldPilotConfig::default();
        config.vehicle.estimator = EstimatorKind::Inertial;
        config.vehicle.calibrate_inertial = false;
        let mut unit = build_control_unit(&config).unwrap();
        assert!(unit
            .start_operation(Coordinates::new(52.001, 5.001), None, ImplementType::None)
            .is_err());
        assert!(!unit.is_operating());
    }

    #[test]
    fn simulated_sensors_are_wired() {
        let unit = build_control_unit(&FieldPilotConfig::default()).unwrap();
        let forward = unit.forward_distance_cache().get().unwrap();
        assert!((0.5..=30.0).contains(&forward));
        assert!(unit.soil_cache().get().is_ok());
    }

    #[test]
    fn backup_is_built_on_demand() {
        let mut unit = build_control_unit(&FieldPilotConfig::default()).unwrap();
        assert!(unit.perception_mut().switch_to_backup());
        assert!(unit.perception().backup_initialized());
        assert_eq!(unit.perception().active_variant(), RouterVariant::Backup);
    }
}
