//! Greenhouse engine binary.
//!
//! Wires together configuration, the simulator clock, sensors, and the
//! watering driver, then runs until interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `greenhouse-config.yaml` (or the path in
//!    `GREENHOUSE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Create the simulator from the clock config
//! 4. Seed plants and sensors
//! 5. Start the clock and log initial sensor readings
//! 6. Spawn the watering driver
//! 7. Wait for Ctrl-C, then stop the clock and wait for it to exit

mod error;
mod seeding;
mod watering;

use std::path::PathBuf;
use std::sync::Arc;

use greenhouse_core::Simulator;
use greenhouse_core::config::SimulationConfig;
use greenhouse_sensors::SensorManager;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Environment variable naming the config file.
const CONFIG_PATH_ENV: &str = "GREENHOUSE_CONFIG";

/// Config file used when [`CONFIG_PATH_ENV`] is unset.
const DEFAULT_CONFIG_PATH: &str = "greenhouse-config.yaml";

/// Application entry point for the greenhouse engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the shutdown fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so report afterwards.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging. RUST_LOG wins over the config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("greenhouse-engine starting");
    info!(
        source,
        tick_interval_ms = config.clock.tick_interval_ms,
        plant_types = config.plant_types.len(),
        plants = config.plants.len(),
        sensors = config.sensors.len(),
        watering_schedules = config.watering.len(),
        "Configuration loaded"
    );

    // 3. Create the simulator.
    let simulator = Arc::new(Simulator::new(config.clock.tick_interval())?);
    let sensors = Arc::new(SensorManager::new(simulator.clone()));

    // 4. Seed the greenhouse.
    seeding::seed_greenhouse(&config, &simulator, &sensors)?;

    // 5. Start the clock.
    simulator.start()?;
    seeding::log_initial_readings(&config, &sensors);

    // 6. Watering driver.
    let watering = watering::spawn_watering(
        Arc::clone(&simulator),
        Arc::clone(&sensors),
        config.watering.clone(),
    );

    // 7. Run until interrupted.
    tokio::signal::ctrl_c()
        .await
        .map_err(|source| EngineError::Signal { source })?;
    info!("Shutdown signal received, stopping simulator");

    if let Some(handle) = watering {
        handle.abort();
    }

    let clock = Arc::clone(&simulator);
    tokio::task::spawn_blocking(move || clock.stop())
        .await
        .map_err(|e| EngineError::Shutdown {
            message: e.to_string(),
        })?
        .map_err(EngineError::from)?;

    let plants = simulator.get_plants();
    info!(
        final_tick = simulator.get_current_tick(),
        plants_total = plants.len(),
        plants_alive = plants.iter().filter(|p| p.is_alive()).count(),
        "Shutdown complete"
    );
    for plant in &plants {
        info!("{plant}");
    }

    Ok(())
}

/// Load configuration from the configured path, or fall back to defaults
/// when the file does not exist.
///
/// Returns the config together with a description of where it came from.
fn load_config() -> Result<(SimulationConfig, String), EngineError> {
    let path = std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        let config = SimulationConfig::from_file(&path)?;
        Ok((config, path.display().to_string()))
    } else {
        let mut config = SimulationConfig::default();
        config.clock.apply_env_overrides();
        config.validate()?;
        Ok((config, String::from("defaults")))
    }
}
