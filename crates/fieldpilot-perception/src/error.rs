//! Error types for perception queries.

use fieldpilot_sensors::SensorError;

/// Errors raised by a single perception variant.
///
/// The [`PerceptionRouter`](crate::PerceptionRouter) absorbs these: a
/// failure triggers one retry on the other variant, then an empty result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PerceptionError {
    /// The sensor feeding the detector delivered nothing.
    #[error("{system} perception has no input")]
    SourceUnavailable {
        /// Name of the perception variant.
        system: &'static str,
        /// The underlying sensor failure.
        #[source]
        source: SensorError,
    },

    /// The detector itself malfunctioned.
    #[error("{system} perception fault: {reason}")]
    Fault {
        /// Name of the perception variant.
        system: &'static str,
        /// What went wrong.
        reason: String,
    },
}
