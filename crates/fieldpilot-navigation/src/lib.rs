//! Position estimation and route planning for the FieldPilot guidance loop.
//!
//! Two interchangeable estimators implement [`PositionEstimator`]:
//!
//! - [`GnssEstimator`] -- satellite fix with small symmetric noise around
//!   the true simulated position, and a small chance of failing to start.
//! - [`InertialEstimator`] -- dead reckoning that drifts with time since the
//!   last calibration and refuses to run until calibrated once.
//!
//! Both share the planning logic in [`planner`]: straight-line interpolation
//! for the initial route and randomised perturbation when obstacles force a
//! replan.
//!
//! # Modules
//!
//! - [`error`] -- [`PlanningError`].
//! - [`estimator`] -- The [`PositionEstimator`] trait.
//! - [`gnss`] -- [`GnssEstimator`] and [`GnssParams`].
//! - [`inertial`] -- [`InertialEstimator`] and [`InertialParams`].
//! - [`planner`] -- Route interpolation and obstacle-driven adjustment.

pub mod error;
pub mod estimator;
pub mod gnss;
pub mod inertial;
pub mod planner;

pub use error::PlanningError;
pub use estimator::{DEFAULT_PRECISION_POINTS, PositionEstimator};
pub use gnss::{GnssEstimator, GnssParams};
pub use inertial::{InertialEstimator, InertialParams};
pub use planner::{ReplanParams, interpolate_route};
