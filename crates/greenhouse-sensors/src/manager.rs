//! Sensor registration and on-demand soil-moisture readings.
//!
//! Readings are computed live on every query: the value is the arithmetic
//! mean of `soil_saturation` across every plant currently in the sensor's
//! section, dead plants included, and the timestamp is the call time.
//! Nothing is cached.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use chrono::Utc;
use greenhouse_core::PlantDataSource;
use greenhouse_core::plant::Plant;
use greenhouse_core::sensor::{Sensor, SensorReading, SensorType};
use tracing::{debug, info};

use crate::error::SensorError;

/// Sensors indexed by id and by section.
#[derive(Debug, Default)]
struct SensorRegistry {
    by_id: BTreeMap<String, Sensor>,
    /// Sensor ids per section, in registration order.
    by_section: BTreeMap<String, Vec<String>>,
}

/// Registers sensors and computes their readings.
pub struct SensorManager {
    source: Arc<dyn PlantDataSource>,
    registry: RwLock<SensorRegistry>,
}

impl std::fmt::Debug for SensorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorManager")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl SensorManager {
    /// Create a manager reading plant data from `source`.
    pub fn new(source: Arc<dyn PlantDataSource>) -> Self {
        Self {
            source,
            registry: RwLock::new(SensorRegistry::default()),
        }
    }

    fn registry(&self) -> RwLockReadGuard<'_, SensorRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a sensor.
    ///
    /// The section does not need to contain plants, now or later.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Validation`] if the id or section id is
    /// empty, or [`SensorError::Conflict`] if the id is already registered
    /// (the existing sensor is left untouched).
    pub fn add_sensor(&self, sensor: Sensor) -> Result<(), SensorError> {
        if sensor.id.is_empty() {
            return Err(SensorError::Validation {
                reason: "sensor ID cannot be empty",
            });
        }
        if sensor.section_id.is_empty() {
            return Err(SensorError::Validation {
                reason: "sensor section ID cannot be empty",
            });
        }

        let mut registry = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if registry.by_id.contains_key(&sensor.id) {
            return Err(SensorError::Conflict(sensor.id));
        }

        info!(
            sensor_id = sensor.id,
            sensor_type = %sensor.sensor_type,
            section_id = sensor.section_id,
            "Sensor registered"
        );
        registry
            .by_section
            .entry(sensor.section_id.clone())
            .or_default()
            .push(sensor.id.clone());
        registry.by_id.insert(sensor.id.clone(), sensor);
        Ok(())
    }

    /// Look up a registered sensor.
    pub fn sensor(&self, sensor_id: &str) -> Option<Sensor> {
        self.registry().by_id.get(sensor_id).cloned()
    }

    /// Number of registered sensors.
    pub fn sensor_count(&self) -> usize {
        self.registry().by_id.len()
    }

    /// Compute the current reading for one sensor.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::NotFound`] for an unknown id,
    /// [`SensorError::Unsupported`] for a sensor type with no reading
    /// source, or [`SensorError::EmptySection`] if the sensor's section has
    /// no plants.
    pub fn get_reading(&self, sensor_id: &str) -> Result<SensorReading, SensorError> {
        let sensor = self
            .sensor(sensor_id)
            .ok_or_else(|| SensorError::NotFound(sensor_id.to_owned()))?;
        if sensor.sensor_type != SensorType::SoilMoisture {
            return Err(SensorError::Unsupported {
                sensor_id: sensor.id,
                sensor_type: sensor.sensor_type,
            });
        }

        let value = self.get_average_saturation(&sensor.section_id)?;
        debug!(sensor_id, value, "Sensor read");
        Ok(SensorReading {
            sensor_id: sensor.id,
            timestamp: Utc::now(),
            value,
        })
    }

    /// Compute one reading per soil-moisture sensor registered in
    /// `section_id`, in registration order. Other sensor types are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::EmptySection`] if the section has no plants.
    pub fn get_section_readings(&self, section_id: &str) -> Result<Vec<SensorReading>, SensorError> {
        let value = self.get_average_saturation(section_id)?;
        let timestamp = Utc::now();

        let registry = self.registry();
        let readings = registry
            .by_section
            .get(section_id)
            .into_iter()
            .flatten()
            .filter_map(|id| registry.by_id.get(id))
            .filter(|sensor| sensor.sensor_type == SensorType::SoilMoisture)
            .map(|sensor| SensorReading {
                sensor_id: sensor.id.clone(),
                timestamp,
                value,
            })
            .collect();
        Ok(readings)
    }

    /// Mean soil saturation across every plant currently in `section_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::EmptySection`] if the section has no plants.
    pub fn get_average_saturation(&self, section_id: &str) -> Result<f64, SensorError> {
        let plants = self.source.plants_in_section(section_id);
        mean_saturation(&plants).ok_or_else(|| SensorError::EmptySection(section_id.to_owned()))
    }
}

/// Arithmetic mean of soil saturation, or `None` for no plants.
fn mean_saturation(plants: &[Plant]) -> Option<f64> {
    if plants.is_empty() {
        return None;
    }
    let total: f64 = plants.iter().map(Plant::soil_saturation).sum();
    let count = f64::from(u32::try_from(plants.len()).unwrap_or(u32::MAX));
    Some(total / count)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use greenhouse_core::plant::{GrowthRates, PlantType, SaturationBounds};

    use super::*;

    /// Fixed in-memory plant data keyed by section.
    #[derive(Default)]
    struct FixedPlants {
        by_section: BTreeMap<String, Vec<Plant>>,
    }

    impl FixedPlants {
        fn with_section(mut self, section_id: &str, saturations: &[f64]) -> Self {
            let plants = saturations
                .iter()
                .enumerate()
                .map(|(i, sat)| {
                    Plant::new(format!("{section_id}-{i}"), test_type(), section_id, *sat).unwrap()
                })
                .collect();
            self.by_section.insert(section_id.to_owned(), plants);
            self
        }
    }

    impl PlantDataSource for FixedPlants {
        fn plants_in_section(&self, section_id: &str) -> Vec<Plant> {
            self.by_section.get(section_id).cloned().unwrap_or_default()
        }

        fn all_plants(&self) -> Vec<Plant> {
            self.by_section.values().flatten().cloned().collect()
        }
    }

    fn test_type() -> Arc<PlantType> {
        Arc::new(
            PlantType::new(
                "TestPlant",
                SaturationBounds {
                    min_saturation: 0.3,
                    optimal_saturation: 0.7,
                    max_saturation: 0.9,
                },
                GrowthRates {
                    base_growth_rate: 0.01,
                    saturation_depletion: 0.02,
                    health_degradation_rate: 0.05,
                    health_enhancement_rate: 0.03,
                },
            )
            .unwrap(),
        )
    }

    fn manager(source: FixedPlants) -> SensorManager {
        SensorManager::new(Arc::new(source))
    }

    #[test]
    fn add_sensor_validates_ids() {
        let manager = manager(FixedPlants::default());
        assert!(manager.add_sensor(Sensor::soil_moisture("sensor-1", "section-A")).is_ok());

        let err = manager
            .add_sensor(Sensor::soil_moisture("", "section-A"))
            .unwrap_err();
        assert_eq!(err.to_string(), "sensor ID cannot be empty");

        let err = manager
            .add_sensor(Sensor::soil_moisture("sensor-2", ""))
            .unwrap_err();
        assert_eq!(err.to_string(), "sensor section ID cannot be empty");
        assert_eq!(manager.sensor_count(), 1);
    }

    #[test]
    fn duplicate_sensor_keeps_original() {
        let manager = manager(FixedPlants::default());
        manager
            .add_sensor(Sensor::soil_moisture("sensor-1", "section-A"))
            .unwrap();

        let duplicate = Sensor {
            id: String::from("sensor-1"),
            sensor_type: SensorType::Temperature,
            section_id: String::from("section-B"),
        };
        assert_eq!(
            manager.add_sensor(duplicate),
            Err(SensorError::Conflict(String::from("sensor-1")))
        );

        let original = manager.sensor("sensor-1").unwrap();
        assert_eq!(original.sensor_type, SensorType::SoilMoisture);
        assert_eq!(original.section_id, "section-A");
        assert_eq!(manager.sensor_count(), 1);
    }

    #[test]
    fn reading_is_the_section_mean() {
        let manager = manager(FixedPlants::default().with_section("section-A", &[0.6, 0.8, 0.7]));
        manager
            .add_sensor(Sensor::soil_moisture("sensor-1", "section-A"))
            .unwrap();

        let before = Utc::now();
        let reading = manager.get_reading("sensor-1").unwrap();
        assert_eq!(reading.sensor_id, "sensor-1");
        assert!((reading.value - 0.7).abs() < 1e-4);
        assert!(reading.timestamp >= before);
    }

    #[test]
    fn unknown_sensor_is_not_found() {
        let manager = manager(FixedPlants::default());
        assert_eq!(
            manager.get_reading("nonexistent-sensor"),
            Err(SensorError::NotFound(String::from("nonexistent-sensor")))
        );
    }

    #[test]
    fn empty_section_has_no_reading() {
        let manager = manager(FixedPlants::default().with_section("empty-section", &[]));
        manager
            .add_sensor(Sensor::soil_moisture("sensor-1", "empty-section"))
            .unwrap();
        assert_eq!(
            manager.get_reading("sensor-1"),
            Err(SensorError::EmptySection(String::from("empty-section")))
        );
    }

    #[test]
    fn non_moisture_sensor_is_unsupported() {
        let manager = manager(FixedPlants::default().with_section("section-A", &[0.5]));
        manager
            .add_sensor(Sensor {
                id: String::from("thermo-1"),
                sensor_type: SensorType::Temperature,
                section_id: String::from("section-A"),
            })
            .unwrap();
        assert!(matches!(
            manager.get_reading("thermo-1"),
            Err(SensorError::Unsupported { .. })
        ));
    }

    #[test]
    fn section_readings_cover_moisture_sensors() {
        let manager = manager(FixedPlants::default().with_section("section-A", &[0.2, 0.4]));
        for sensor in [
            Sensor::soil_moisture("s1", "section-A"),
            Sensor {
                id: String::from("light-1"),
                sensor_type: SensorType::Light,
                section_id: String::from("section-A"),
            },
            Sensor::soil_moisture("s2", "section-A"),
            Sensor::soil_moisture("s3", "section-B"),
        ] {
            manager.add_sensor(sensor).unwrap();
        }

        let readings = manager.get_section_readings("section-A").unwrap();
        let ids: Vec<&str> = readings.iter().map(|r| r.sensor_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
        assert!(readings.iter().all(|r| (r.value - 0.3).abs() < 1e-9));

        assert_eq!(
            manager.get_section_readings("section-B"),
            Err(SensorError::EmptySection(String::from("section-B")))
        );
    }

    #[test]
    fn average_saturation_requires_plants() {
        let manager = manager(FixedPlants::default().with_section("section-A", &[0.5, 1.0]));
        assert!((manager.get_average_saturation("section-A").unwrap() - 0.75).abs() < 1e-9);
        assert!(matches!(
            manager.get_average_saturation("section-Z"),
            Err(SensorError::EmptySection(_))
        ));
    }
}
