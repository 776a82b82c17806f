//! Error types for sensor reads.

/// Errors raised by sensor sources and the sensor cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    /// The underlying device produced no value.
    #[error("sensor {sensor} unavailable: {reason}")]
    SourceUnavailable {
        /// Name of the sensor that failed.
        sensor: String,
        /// Why no value was produced.
        reason: String,
    },
}

impl SensorError {
    /// Shorthand for [`SensorError::SourceUnavailable`].
    pub fn unavailable(sensor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            sensor: sensor.into(),
            reason: reason.into(),
        }
    }
}
