//! Seeds the greenhouse with the plants and sensors declared in config.
//!
//! Runs before the clock starts. A plant or sensor whose id is already
//! registered is logged and skipped; every other failure aborts startup.

use greenhouse_core::config::SimulationConfig;
use greenhouse_core::{Simulator, SimulatorError};
use greenhouse_sensors::{SensorError, SensorManager};
use tracing::{info, warn};

use crate::error::EngineError;

/// Counts of what was registered during seeding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Plants added to the simulator.
    pub plants: usize,
    /// Sensors registered with the manager.
    pub sensors: usize,
}

/// Register every configured plant and sensor.
///
/// # Errors
///
/// Returns [`EngineError`] if a plant type or plant in the config is
/// invalid, or a sensor fails validation.
pub fn seed_greenhouse(
    config: &SimulationConfig,
    simulator: &Simulator,
    sensors: &SensorManager,
) -> Result<SeedSummary, EngineError> {
    let mut summary = SeedSummary::default();

    for plant in config.build_plants()? {
        let plant_id = plant.id().to_owned();
        match simulator.add_plant(plant) {
            Ok(()) => summary.plants = summary.plants.saturating_add(1),
            Err(SimulatorError::DuplicatePlant(id)) => {
                warn!(plant_id = id, "Skipping plant with duplicate id");
            }
            Err(source) => {
                warn!(plant_id, error = %source, "Failed to add plant");
                return Err(source.into());
            }
        }
    }

    for sensor in &config.sensors {
        match sensors.add_sensor(sensor.clone()) {
            Ok(()) => summary.sensors = summary.sensors.saturating_add(1),
            Err(SensorError::Conflict(id)) => {
                warn!(sensor_id = id, "Skipping sensor with duplicate id");
            }
            Err(source) => return Err(source.into()),
        }
    }

    info!(
        plants = summary.plants,
        sensors = summary.sensors,
        "Greenhouse seeded"
    );
    Ok(summary)
}

/// Log one reading per registered sensor. Sensors without a reading are
/// reported at warn level and do not stop startup.
pub fn log_initial_readings(config: &SimulationConfig, sensors: &SensorManager) {
    for sensor in &config.sensors {
        match sensors.get_reading(&sensor.id) {
            Ok(reading) => info!(
                sensor_id = reading.sensor_id,
                section_id = sensor.section_id,
                value = reading.value,
                "Initial sensor reading"
            ),
            Err(e) => warn!(sensor_id = sensor.id, error = %e, "No initial sensor reading"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    const CONFIG: &str = r"
plant_types:
  - name: Tomato
    min_saturation: 0.3
    optimal_saturation: 0.6
    max_saturation: 0.8
    base_growth_rate: 0.05
    saturation_depletion: 0.04
    health_degradation_rate: 0.08
    health_enhancement_rate: 0.03
plants:
  - id: tomato-1
    plant_type: Tomato
    section_id: section-A
    initial_saturation: 0.5
  - id: tomato-1
    plant_type: Tomato
    section_id: section-B
    initial_saturation: 0.4
sensors:
  - id: sensor-1
    sensor_type: soil_moisture
    section_id: section-A
  - id: sensor-1
    sensor_type: soil_moisture
    section_id: section-B
";

    #[test]
    fn duplicates_are_skipped() {
        let config = SimulationConfig::parse(CONFIG).unwrap();
        let simulator = Arc::new(Simulator::new(Duration::from_secs(60)).unwrap());
        let sensors = SensorManager::new(simulator.clone());

        let summary = seed_greenhouse(&config, &simulator, &sensors).unwrap();
        assert_eq!(summary, SeedSummary { plants: 1, sensors: 1 });
        assert_eq!(simulator.get_plants()[0].section_id(), "section-A");
        assert_eq!(sensors.sensor("sensor-1").unwrap().section_id, "section-A");
    }

    #[test]
    fn unknown_plant_type_aborts_seeding() {
        let yaml = r"
plants:
  - id: rose-1
    plant_type: Rose
    section_id: section-A
    initial_saturation: 0.5
";
        let config = SimulationConfig::parse(yaml).unwrap();
        let simulator = Arc::new(Simulator::new(Duration::from_secs(60)).unwrap());
        let sensors = SensorManager::new(simulator.clone());

        assert!(matches!(
            seed_greenhouse(&config, &simulator, &sensors),
            Err(EngineError::Config { .. })
        ));
        assert!(simulator.get_plants().is_empty());
    }
}
