//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Wraps every failure mode of startup so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading, validation, or assembly failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: fieldpilot_core::ConfigError,
    },

    /// The command line could not be understood.
    #[error("usage: fieldpilot-engine [config.yaml] ({message})")]
    Usage {
        /// What was wrong with the arguments.
        message: String,
    },
}
