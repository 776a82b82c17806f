//! End-to-end tests for the FieldPilot guidance loop.
//!
//! Each test assembles a [`ControlUnit`] from real estimators and scripted
//! perception and sensor doubles, then drives it through the public API.

#![allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::indexing_slicing,
    clippy::missing_panics_doc,
    clippy::panic
)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fieldpilot_core::{
    AbortReason, CommandChain, CommandError, ControlParams, ControlUnit, FieldPilotConfig,
    OperationState, StartError, StepOutcome, build_control_unit,
};
use fieldpilot_navigation::{
    GnssEstimator, GnssParams, InertialEstimator, InertialParams, PlanningError,
    PositionEstimator, ReplanParams,
};
use fieldpilot_perception::{
    BackupFactory, PerceptionRouter, PerceptionSystem, RouterParams, RouterVariant,
    ScriptedPerception,
};
use fieldpilot_sensors::{FailingSource, FixedSource, SensorSource, TimedCache};
use fieldpilot_types::{
    Coordinates, FieldBoundaries, ImplementType, ObstacleData, Route, SoilReading,
};

/// Upper bound on steps for any run that is expected to complete.
const STEP_LIMIT: usize = 2_000;

// =============================================================================
// Helpers
// =============================================================================

fn reliable_gnss(start: Coordinates, seed: u64) -> GnssEstimator {
    let params = GnssParams {
        start_failure_probability: 0.0,
        replan: ReplanParams {
            failure_probability: 0.0,
        },
        ..GnssParams::default()
    };
    GnssEstimator::new(start, params, seed)
}

fn soil_cache() -> Arc<TimedCache<SoilReading>> {
    Arc::new(TimedCache::new("soil", Duration::ZERO, || {
        FixedSource::new(SoilReading {
            moisture_pct: 30.0,
            temperature_c: 15.0,
        })
    }))
}

fn forward_cache<S>(source: S) -> Arc<TimedCache<f64>>
where
    S: SensorSource<f64> + 'static,
{
    Arc::new(TimedCache::new("forward_distance", Duration::ZERO, move || source))
}

fn assemble(
    estimator: impl PositionEstimator + 'static,
    router: PerceptionRouter,
    forward: Arc<TimedCache<f64>>,
) -> ControlUnit {
    ControlUnit::new(
        ControlParams::default(),
        Box::new(estimator),
        router,
        forward,
        soil_cache(),
    )
}

fn quiet_router() -> PerceptionRouter {
    PerceptionRouter::new(
        Box::new(ScriptedPerception::new("quiet")),
        None,
        &RouterParams::default(),
    )
}

/// Delegates to a GNSS estimator and counts lifecycle calls.
struct SpyEstimator {
    inner: GnssEstimator,
    stops: Arc<AtomicUsize>,
    routes: Arc<AtomicUsize>,
}

impl SpyEstimator {
    fn new(start: Coordinates) -> Self {
        Self {
            inner: reliable_gnss(start, 11),
            stops: Arc::new(AtomicUsize::new(0)),
            routes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl PositionEstimator for SpyEstimator {
    fn name(&self) -> &'static str {
        "spy"
    }

    fn position(&mut self) -> Coordinates {
        self.inner.position()
    }

    fn calculate_route(
        &mut self,
        target: Coordinates,
        boundaries: Option<&FieldBoundaries>,
        precision_points: usize,
    ) -> Result<Route, PlanningError> {
        self.routes.fetch_add(1, Ordering::Relaxed);
        self.inner.calculate_route(target, boundaries, precision_points)
    }

    fn adjust_route(
        &mut self,
        current: &Route,
        obstacles: &[ObstacleData],
    ) -> Result<Route, PlanningError> {
        self.inner.adjust_route(current, obstacles)
    }

    fn start(&mut self) -> bool {
        self.inner.start()
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::Relaxed);
        self.inner.stop();
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn update_simulated_position(&mut self, position: Coordinates) {
        self.inner.update_simulated_position(position);
    }
}

/// Step until the operation ends or the limit is hit; returns the final report outcome.
fn run_to_end(unit: &mut ControlUnit) -> (StepOutcome, Option<Coordinates>) {
    for _ in 0..STEP_LIMIT {
        let report = unit.simulate_one_step();
        if report.outcome.ends_operation() {
            return (report.outcome, report.position);
        }
    }
    panic!("operation did not end within {STEP_LIMIT} steps");
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn scenario_a_start_with_plough() {
    let target = Coordinates::new(10.0, 20.0);
    let mut unit = assemble(
        reliable_gnss(Coordinates::new(9.999, 19.999), 7),
        quiet_router(),
        forward_cache(FixedSource::new(25.0)),
    );

    unit.start_operation(target, None, ImplementType::Plough).unwrap();

    assert!(unit.is_operating());
    assert!(unit.current_route().len() >= 2);
    assert_eq!(unit.current_target(), unit.current_route().first());
    assert_eq!(unit.current_route().last(), Some(target));
    assert_eq!(unit.implement().attached(), ImplementType::Plough);
    assert!(unit.implement().is_active());
}

#[test]
fn scenario_b_steps_converge_on_final_waypoint() {
    let target = Coordinates::new(10.0, 20.0);
    let mut unit = assemble(
        reliable_gnss(Coordinates::new(9.999, 19.9995), 8),
        quiet_router(),
        forward_cache(FixedSource::new(25.0)),
    );
    unit.start_operation(target, None, ImplementType::Seeder).unwrap();
    let final_waypoint = unit.current_route().last().unwrap();

    let (outcome, position) = run_to_end(&mut unit);

    assert_eq!(outcome, StepOutcome::Completed);
    assert!(position.unwrap().distance_to(final_waypoint) < 0.000_05);
    assert!(!unit.is_operating());
    assert!(!unit.implement().is_active());
    assert!(unit.current_route().is_empty());
}

#[test]
fn scenario_c_critical_forward_distance_stops_immediately() {
    let mut unit = assemble(
        reliable_gnss(Coordinates::new(10.0, 20.0), 9),
        quiet_router(),
        forward_cache(FixedSource::new(0.5)),
    );
    unit.start_operation(Coordinates::new(10.01, 20.01), None, ImplementType::Sprayer).unwrap();

    let report = unit.simulate_one_step();

    assert_eq!(
        report.outcome,
        StepOutcome::Aborted(AbortReason::CriticalProximity)
    );
    assert_eq!(report.forward_distance_m, Some(0.5));
    assert!(!unit.is_operating());
    assert!(!unit.implement().is_active());
}

#[test]
fn scenario_d_uncalibrated_inertial_never_operates() {
    let estimator = InertialEstimator::new(
        Coordinates::new(10.0, 20.0),
        InertialParams::default(),
        10,
    );
    let mut unit = assemble(estimator, quiet_router(), forward_cache(FixedSource::new(25.0)));

    let result = unit.start_operation(Coordinates::new(10.01, 20.01), None, ImplementType::None);

    assert!(matches!(result, Err(StartError::Planning { .. })));
    assert_eq!(unit.state(), OperationState::Stopped);
    assert!(unit.current_route().is_empty());
    assert_eq!(unit.simulate_one_step().outcome, StepOutcome::Idle);
}

// =============================================================================
// Lifecycle properties
// =============================================================================

#[test]
fn stop_while_stopped_touches_nothing() {
    let spy = SpyEstimator::new(Coordinates::new(0.0, 0.0));
    let stops = Arc::clone(&spy.stops);
    let mut unit = assemble(spy, quiet_router(), forward_cache(FixedSource::new(25.0)));

    assert!(!unit.stop_operation());
    assert!(!unit.stop_operation());

    assert_eq!(stops.load(Ordering::Relaxed), 0);
    assert_eq!(unit.state(), OperationState::Stopped);
    assert!(!unit.implement().is_active());
}

#[test]
fn second_start_leaves_first_route_untouched() {
    let spy = SpyEstimator::new(Coordinates::new(0.0, 0.0));
    let routes = Arc::clone(&spy.routes);
    let mut unit = assemble(spy, quiet_router(), forward_cache(FixedSource::new(25.0)));

    let first_id = unit
        .start_operation(Coordinates::new(0.001, 0.0), None, ImplementType::Plough)
        .unwrap();
    let first_route = unit.current_route().clone();

    let second = unit.start_operation(Coordinates::new(0.5, 0.5), None, ImplementType::Sprayer);

    assert_eq!(second, Err(StartError::AlreadyOperating));
    assert_eq!(unit.current_route(), &first_route);
    assert_eq!(unit.operation_id(), Some(first_id));
    assert_eq!(unit.implement().attached(), ImplementType::Plough);
    assert_eq!(routes.load(Ordering::Relaxed), 1);
}

#[test]
fn stop_runs_the_stop_sequence_once() {
    let spy = SpyEstimator::new(Coordinates::new(0.0, 0.0));
    let stops = Arc::clone(&spy.stops);
    let mut unit = assemble(spy, quiet_router(), forward_cache(FixedSource::new(25.0)));

    unit.start_operation(Coordinates::new(0.001, 0.0), None, ImplementType::Seeder).unwrap();
    assert!(unit.stop_operation());
    assert!(!unit.stop_operation());

    assert_eq!(stops.load(Ordering::Relaxed), 1);
    assert!(unit.operation_id().is_none());
}

#[test]
fn restart_after_completion_mints_new_operation() {
    let mut unit = assemble(
        reliable_gnss(Coordinates::new(0.0, 0.0), 12),
        quiet_router(),
        forward_cache(FixedSource::new(25.0)),
    );
    let first = unit
        .start_operation(Coordinates::new(0.0002, 0.0), None, ImplementType::None)
        .unwrap();
    assert_eq!(run_to_end(&mut unit).0, StepOutcome::Completed);

    let second = unit
        .start_operation(Coordinates::new(0.0, 0.0), None, ImplementType::None)
        .unwrap();
    assert_ne!(first, second);
    assert!(unit.is_operating());
}

#[test]
fn non_finite_target_never_starts_an_operation() {
    let mut config = FieldPilotConfig::default();
    config.gnss.start_failure_probability = 0.0;
    config.gnss.replan_failure_probability = 0.0;
    let mut unit = build_control_unit(&config).unwrap();
    let chain = CommandChain::standard(None);

    let err = chain.dispatch(&mut unit, "start NaN 5.0").unwrap_err();
    assert!(matches!(err, CommandError::NonFiniteNumber { argument: "lat", .. }));

    let direct = unit.start_operation(Coordinates::new(f64::NAN, 5.0), None, ImplementType::None);
    assert!(matches!(direct, Err(StartError::InvalidTarget { .. })));

    assert_eq!(unit.state(), OperationState::Stopped);
    for _ in 0..10 {
        assert_eq!(unit.simulate_one_step().outcome, StepOutcome::Idle);
    }
    assert!(unit.current_position().is_finite());
}

// =============================================================================
// Degraded collaborators
// =============================================================================

#[test]
fn failed_sensor_reads_do_not_stop_the_operation() {
    let mut unit = assemble(
        reliable_gnss(Coordinates::new(0.0, 0.0), 13),
        quiet_router(),
        forward_cache(FailingSource::new("forward_distance")),
    );
    unit.start_operation(Coordinates::new(0.001, 0.0), None, ImplementType::None).unwrap();

    for _ in 0..5 {
        let report = unit.simulate_one_step();
        assert!(report.forward_distance_m.is_none());
        assert!(report.soil.is_some());
    }
    assert!(unit.is_operating());
}

#[test]
fn perception_fails_over_to_backup_and_replans() {
    let primary = ScriptedPerception::new("primary").failing();
    let backup = ScriptedPerception::new("backup").with_obstacles(vec![ObstacleData::new(
        Coordinates::new(0.0005, 0.0),
        "boulder",
    )]);
    let counter = backup.query_counter();
    let factory: BackupFactory = Box::new(move || Box::new(backup) as Box<dyn PerceptionSystem>);
    let router = PerceptionRouter::new(Box::new(primary), Some(factory), &RouterParams::default());
    let mut unit = assemble(
        reliable_gnss(Coordinates::new(0.0, 0.0), 14),
        router,
        forward_cache(FixedSource::new(25.0)),
    );
    unit.start_operation(Coordinates::new(0.001, 0.0), None, ImplementType::None).unwrap();

    let report = unit.simulate_one_step();

    assert_eq!(report.outcome, StepOutcome::Replanned);
    assert_eq!(report.obstacles_detected, 1);
    assert_eq!(unit.perception().active_variant(), RouterVariant::Backup);
    assert_eq!(counter.load(Ordering::Relaxed), 1);
    assert!(unit.is_operating());
}

#[test]
fn failing_replan_aborts_the_operation() {
    let params = GnssParams {
        start_failure_probability: 0.0,
        replan: ReplanParams {
            failure_probability: 1.0,
        },
        ..GnssParams::default()
    };
    let router = PerceptionRouter::new(
        Box::new(
            ScriptedPerception::new("rocky")
                .with_obstacles(vec![ObstacleData::new(Coordinates::new(0.0005, 0.0), "rock")]),
        ),
        None,
        &RouterParams::default(),
    );
    let mut unit = assemble(
        GnssEstimator::new(Coordinates::new(0.0, 0.0), params, 15),
        router,
        forward_cache(FixedSource::new(25.0)),
    );
    unit.start_operation(Coordinates::new(0.001, 0.0), None, ImplementType::Plough).unwrap();

    let (outcome, _) = run_to_end(&mut unit);

    assert_eq!(outcome, StepOutcome::Aborted(AbortReason::ReplanFailed));
    assert!(!unit.implement().is_active());
}
