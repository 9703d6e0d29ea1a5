//! Error types for the greenhouse engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode during engine startup and shutdown.

/// Top-level error for the greenhouse engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: greenhouse_core::config::ConfigError,
    },

    /// The simulator rejected a command.
    #[error("simulator error: {source}")]
    Simulator {
        /// The underlying simulator error.
        #[from]
        source: greenhouse_core::SimulatorError,
    },

    /// A configured sensor was rejected.
    #[error("sensor error: {source}")]
    Sensor {
        /// The underlying sensor error.
        #[from]
        source: greenhouse_sensors::SensorError,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The blocking shutdown task did not complete.
    #[error("shutdown error: {message}")]
    Shutdown {
        /// Description of the failure.
        message: String,
    },
}
