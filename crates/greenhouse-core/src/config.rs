//! Configuration loading and typed config structures for the greenhouse
//! simulation.
//!
//! The canonical configuration lives in `greenhouse-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure and provides a loader that reads and validates the file.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ModelError;
use crate::plant::{GrowthRates, Plant, PlantType, SaturationBounds};
use crate::sensor::Sensor;
use crate::watering::WateringSchedule;

/// Environment variable that overrides `clock.tick_interval_ms`.
pub const TICK_INTERVAL_ENV: &str = "GREENHOUSE_TICK_INTERVAL_MS";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not acceptable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },

    /// A plant type, plant, or watering schedule failed validation.
    #[error("invalid model in configuration: {source}")]
    Model {
        /// The underlying validation error.
        #[from]
        source: ModelError,
    },

    /// A plant references a plant type that is not declared.
    #[error("plant {plant_id} references unknown plant type {plant_type}")]
    UnknownPlantType {
        /// The plant with the dangling reference.
        plant_id: String,
        /// The missing type name.
        plant_type: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `greenhouse-config.yaml`. Every section has a
/// default so an empty document is valid.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Clock settings.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Declared plant species.
    #[serde(default)]
    pub plant_types: Vec<PlantTypeConfig>,

    /// Plants to add before the clock starts.
    #[serde(default)]
    pub plants: Vec<PlantConfig>,

    /// Sensors to register.
    #[serde(default)]
    pub sensors: Vec<Sensor>,

    /// Automated watering schedules.
    #[serde(default)]
    pub watering: Vec<WateringSchedule>,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `GREENHOUSE_TICK_INTERVAL_MS` overrides `clock.tick_interval_ms`
    /// when set to a valid integer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or a
    /// validation error from [`SimulationConfig::validate`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or a
    /// validation error from [`SimulationConfig::validate`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.clock.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero tick interval and
    /// [`ConfigError::Model`] for an invalid watering schedule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: String::from("clock.tick_interval_ms must be at least 1"),
            });
        }
        for schedule in &self.watering {
            schedule.validate()?;
        }
        Ok(())
    }

    /// Build validated plant types keyed by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Model`] if any type is invalid, or
    /// [`ConfigError::Invalid`] if two types share a name.
    pub fn build_plant_types(&self) -> Result<BTreeMap<String, Arc<PlantType>>, ConfigError> {
        let mut types = BTreeMap::new();
        for entry in &self.plant_types {
            let plant_type = Arc::new(entry.to_plant_type()?);
            if types.insert(entry.name.clone(), plant_type).is_some() {
                return Err(ConfigError::Invalid {
                    reason: format!("duplicate plant type name: {}", entry.name),
                });
            }
        }
        Ok(types)
    }

    /// Build the configured plants. Plants of the same type share one
    /// [`PlantType`] allocation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPlantType`] for a dangling type
    /// reference, or [`ConfigError::Model`] if a plant fails validation.
    pub fn build_plants(&self) -> Result<Vec<Plant>, ConfigError> {
        let types = self.build_plant_types()?;
        self.plants
            .iter()
            .map(|entry| -> Result<Plant, ConfigError> {
                let plant_type = types.get(&entry.plant_type).ok_or_else(|| {
                    ConfigError::UnknownPlantType {
                        plant_id: entry.id.clone(),
                        plant_type: entry.plant_type.clone(),
                    }
                })?;
                Ok(Plant::new(
                    entry.id.clone(),
                    Arc::clone(plant_type),
                    entry.section_id.clone(),
                    entry.initial_saturation,
                )?)
            })
            .collect()
    }
}

/// Clock configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClockConfig {
    /// Real-time milliseconds per tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl ClockConfig {
    /// Override the tick interval from the environment when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(TICK_INTERVAL_ENV)
            && let Ok(ms) = val.trim().parse::<u64>()
        {
            self.tick_interval_ms = ms;
        }
    }

    /// The tick interval as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// A plant species as written in YAML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlantTypeConfig {
    /// Species name, referenced by [`PlantConfig::plant_type`].
    pub name: String,
    /// Saturation at which growth is boosted.
    pub optimal_saturation: f64,
    /// Below this, health degrades.
    pub min_saturation: f64,
    /// Above this, health degrades.
    pub max_saturation: f64,
    /// Growth per tick before modifiers.
    pub base_growth_rate: f64,
    /// Saturation consumed per tick.
    pub saturation_depletion: f64,
    /// Health lost per tick out of range.
    pub health_degradation_rate: f64,
    /// Health gained per tick in range.
    pub health_enhancement_rate: f64,
}

impl PlantTypeConfig {
    /// Validate and convert into a [`PlantType`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if any field is invalid.
    pub fn to_plant_type(&self) -> Result<PlantType, ModelError> {
        PlantType::new(
            self.name.clone(),
            SaturationBounds {
                min_saturation: self.min_saturation,
                optimal_saturation: self.optimal_saturation,
                max_saturation: self.max_saturation,
            },
            GrowthRates {
                base_growth_rate: self.base_growth_rate,
                saturation_depletion: self.saturation_depletion,
                health_degradation_rate: self.health_degradation_rate,
                health_enhancement_rate: self.health_enhancement_rate,
            },
        )
    }
}

/// A plant as written in YAML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlantConfig {
    /// Unique plant id.
    pub id: String,
    /// Name of a declared plant type.
    pub plant_type: String,
    /// Section the plant is placed in.
    pub section_id: String,
    /// Starting soil saturation.
    pub initial_saturation: f64,
}

const fn default_tick_interval_ms() -> u64 {
    4000
}

fn default_log_level() -> String {
    String::from("info")
}
