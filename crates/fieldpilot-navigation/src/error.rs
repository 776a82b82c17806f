//! Error types for route planning.
//!
//! Every variant is a planning failure: the caller gets no route. The
//! control unit treats any of them as a reason to stop (or not start) the
//! operation rather than propagating further.

/// Errors returned when a route cannot be produced or adjusted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanningError {
    /// The estimator is not active (never started, stopped, or uncalibrated).
    #[error("{estimator} estimator is not active")]
    EstimatorInactive {
        /// Name of the estimator.
        estimator: &'static str,
    },

    /// The estimator refused to start.
    #[error("{estimator} estimator failed to start")]
    ActivationFailed {
        /// Name of the estimator.
        estimator: &'static str,
    },

    /// There is no route left to adjust.
    #[error("no current route to adjust")]
    EmptyRoute,

    /// Replanning around obstacles failed.
    #[error("{estimator} estimator failed to replan around obstacles")]
    ReplanFailed {
        /// Name of the estimator.
        estimator: &'static str,
    },
}
