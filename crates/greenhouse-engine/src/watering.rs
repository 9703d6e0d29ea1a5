//! Automated watering driver.
//!
//! Runs as a tokio task alongside the simulator clock. Once per tick
//! interval it looks at the current tick; the first time it sees a tick
//! number it evaluates every schedule against the section's average
//! saturation and applies whatever events they produce.

use std::sync::Arc;

use greenhouse_core::Simulator;
use greenhouse_core::watering::WateringSchedule;
use greenhouse_sensors::{SensorError, SensorManager};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Spawn the watering task. Returns `None` when no schedule is enabled.
pub fn spawn_watering(
    simulator: Arc<Simulator>,
    sensors: Arc<SensorManager>,
    schedules: Vec<WateringSchedule>,
) -> Option<JoinHandle<()>> {
    if !schedules.iter().any(|s| s.enabled) {
        info!("No watering schedules enabled");
        return None;
    }
    info!(schedules = schedules.len(), "Watering driver starting");

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(simulator.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_checked: Option<u64> = None;

        loop {
            interval.tick().await;
            let tick = simulator.get_current_tick();
            if last_checked == Some(tick) {
                continue;
            }
            last_checked = Some(tick);
            run_schedules(tick, &simulator, &sensors, &schedules);
        }
    }))
}

/// Evaluate every schedule at `tick` and apply the resulting events.
///
/// Returns the number of plants watered.
pub fn run_schedules(
    tick: u64,
    simulator: &Simulator,
    sensors: &SensorManager,
    schedules: &[WateringSchedule],
) -> usize {
    let mut watered = 0usize;
    for schedule in schedules.iter().filter(|s| s.is_due(tick)) {
        let average = match sensors.get_average_saturation(&schedule.section_id) {
            Ok(average) => average,
            Err(SensorError::EmptySection(section_id)) => {
                debug!(tick, section_id, "Watering skipped, section has no plants");
                continue;
            }
            Err(e) => {
                warn!(tick, section_id = schedule.section_id, error = %e, "Watering check failed");
                continue;
            }
        };

        if let Some(event) = schedule.evaluate(tick, average) {
            let count = simulator.apply_watering(&event);
            info!(
                tick,
                section_id = event.section_id,
                average_saturation = average,
                amount = event.amount,
                plants_watered = count,
                "Scheduled watering applied"
            );
            watered = watered.saturating_add(count);
        }
    }
    watered
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use greenhouse_core::Plant;
    use greenhouse_core::plant::{GrowthRates, PlantType, SaturationBounds};

    use super::*;

    fn lettuce() -> Arc<PlantType> {
        Arc::new(
            PlantType::new(
                "Lettuce",
                SaturationBounds {
                    min_saturation: 0.4,
                    optimal_saturation: 0.7,
                    max_saturation: 0.9,
                },
                GrowthRates {
                    base_growth_rate: 0.08,
                    saturation_depletion: 0.05,
                    health_degradation_rate: 0.06,
                    health_enhancement_rate: 0.04,
                },
            )
            .unwrap(),
        )
    }

    fn schedule(section_id: &str, check_interval: u64) -> WateringSchedule {
        WateringSchedule {
            section_id: section_id.to_owned(),
            target_saturation: 0.5,
            check_interval,
            water_amount: 0.2,
            enabled: true,
        }
    }

    fn setup(saturation: f64) -> (Arc<Simulator>, Arc<SensorManager>) {
        let simulator = Arc::new(Simulator::new(Duration::from_millis(20)).unwrap());
        simulator
            .add_plant(Plant::new("lettuce-1", lettuce(), "section-B", saturation).unwrap())
            .unwrap();
        let sensors = Arc::new(SensorManager::new(simulator.clone()));
        (simulator, sensors)
    }

    #[test]
    fn dry_section_is_watered_on_check_ticks() {
        let (simulator, sensors) = setup(0.3);
        let schedules = [schedule("section-B", 2), schedule("section-Z", 1)];

        assert_eq!(run_schedules(1, &simulator, &sensors, &schedules), 0);
        assert_eq!(run_schedules(2, &simulator, &sensors, &schedules), 1);
        assert!((simulator.get_plants()[0].soil_saturation() - 0.5).abs() < 1e-9);

        // Now at target, so the next check leaves it alone.
        assert_eq!(run_schedules(4, &simulator, &sensors, &schedules), 0);
    }

    #[tokio::test]
    async fn driver_waters_once_per_tick() {
        let (simulator, sensors) = setup(0.1);
        let mut schedule = schedule("section-B", 1);
        schedule.target_saturation = 1.0;

        // The clock never starts, so tick 0 is the only tick the driver sees.
        let handle = spawn_watering(Arc::clone(&simulator), sensors, vec![schedule]).unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.abort();

        assert!((simulator.get_plants()[0].soil_saturation() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn disabled_schedules_do_not_spawn() {
        let (simulator, sensors) = setup(0.1);
        let mut schedule = schedule("section-B", 1);
        schedule.enabled = false;
        assert!(spawn_watering(simulator, sensors, vec![schedule]).is_none());
    }
}
