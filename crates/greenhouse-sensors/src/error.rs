//! Error types for the `greenhouse-sensors` crate.

use greenhouse_core::sensor::SensorType;

/// Errors returned by the [`SensorManager`](crate::SensorManager).
///
/// None of these affect the simulator clock; they are reported to the
/// caller only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    /// The sensor descriptor is malformed.
    #[error("{reason}")]
    Validation {
        /// What is wrong with the sensor.
        reason: &'static str,
    },

    /// A sensor with this id is already registered.
    #[error("sensor {0} already registered")]
    Conflict(String),

    /// No sensor with this id is registered.
    #[error("sensor {0} not found")]
    NotFound(String),

    /// The section has no plants to aggregate over.
    #[error("no plants in section {0}")]
    EmptySection(String),

    /// Readings are only computed for soil-moisture sensors.
    #[error("sensor {sensor_id} of type {sensor_type} has no reading source")]
    Unsupported {
        /// The sensor queried.
        sensor_id: String,
        /// Its type.
        sensor_type: SensorType,
    },
}
