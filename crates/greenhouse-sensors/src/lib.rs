//! Sensor registry and on-demand readings for the greenhouse simulation.
//!
//! The [`SensorManager`] registers [`Sensor`]s and answers reading queries
//! by averaging live plant saturation obtained from an injected
//! [`PlantDataSource`]. It never owns or mutates plants.
//!
//! [`Sensor`]: greenhouse_core::sensor::Sensor
//! [`PlantDataSource`]: greenhouse_core::PlantDataSource

pub mod error;
pub mod manager;

pub use error::SensorError;
pub use manager::SensorManager;
