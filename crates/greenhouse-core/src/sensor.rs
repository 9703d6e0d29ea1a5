//! Sensor and reading value types.
//!
//! Sensors are plain descriptors: an id, what they measure, and which
//! section they sit in. Registration, validation, and reading computation
//! live in the `greenhouse-sensors` crate.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    /// Soil water content, `[0, 1]`.
    SoilMoisture,
    /// Ambient temperature in Celsius.
    Temperature,
    /// Light intensity.
    Light,
    /// Relative humidity, `[0, 1]`.
    Humidity,
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SoilMoisture => "soil_moisture",
            Self::Temperature => "temperature",
            Self::Light => "light",
            Self::Humidity => "humidity",
        };
        f.write_str(label)
    }
}

/// A sensor monitoring one section of the greenhouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    /// Unique sensor identifier.
    pub id: String,
    /// What the sensor measures.
    pub sensor_type: SensorType,
    /// Section the sensor reports on. Need not contain any plants.
    pub section_id: String,
}

impl Sensor {
    /// Convenience constructor for a soil-moisture sensor.
    pub fn soil_moisture(id: impl Into<String>, section_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sensor_type: SensorType::SoilMoisture,
            section_id: section_id.into(),
        }
    }
}

/// A value reported by a sensor at query time. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// The sensor that produced the reading.
    pub sensor_id: String,
    /// Wall-clock capture time (not a simulation tick).
    pub timestamp: DateTime<Utc>,
    /// The computed value.
    pub value: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn sensor_type_uses_snake_case_names() {
        let json = serde_json::to_string(&SensorType::SoilMoisture).unwrap();
        assert_eq!(json, "\"soil_moisture\"");
        let parsed: SensorType = serde_json::from_str("\"humidity\"").unwrap();
        assert_eq!(parsed, SensorType::Humidity);
        assert_eq!(SensorType::Light.to_string(), "light");
    }
}
