//! The plant collection and the single-tick cycle over it.
//!
//! [`Greenhouse`] is the state the simulator guards with one exclusive
//! lock: the plants in insertion order, the set of every id ever added,
//! and the tick counter. [`run_tick`] advances every plant once and then
//! the counter, all under that lock, so readers see either the complete
//! pre-tick or the complete post-tick state.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::SimulatorError;
use crate::plant::{Plant, PlantTick};

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick number that was processed (0-indexed).
    pub tick: u64,
    /// Number of plants in the greenhouse during the tick.
    pub plants_total: usize,
    /// Number of plants alive at the end of the tick.
    pub plants_alive: usize,
    /// Ids of plants that died during this tick.
    pub deaths: Vec<String>,
}

/// All plants in the simulation plus the tick counter.
#[derive(Debug, Default)]
pub struct Greenhouse {
    /// Plants in insertion order.
    plants: Vec<Plant>,
    /// Every plant id added so far.
    plant_ids: BTreeSet<String>,
    /// Number of ticks processed so far; also the number of the next tick.
    tick: u64,
}

impl Greenhouse {
    /// Create an empty greenhouse at tick 0.
    pub const fn new() -> Self {
        Self {
            plants: Vec::new(),
            plant_ids: BTreeSet::new(),
            tick: 0,
        }
    }

    /// Add a plant. It takes part in every tick from the next one on.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::DuplicatePlant`] if a plant with the same
    /// id was added before.
    pub fn add_plant(&mut self, plant: Plant) -> Result<(), SimulatorError> {
        if !self.plant_ids.insert(plant.id().to_owned()) {
            return Err(SimulatorError::DuplicatePlant(plant.id().to_owned()));
        }
        self.plants.push(plant);
        Ok(())
    }

    /// All plants in insertion order.
    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    /// Clones of the plants in `section_id`, in insertion order.
    pub fn plants_in_section(&self, section_id: &str) -> Vec<Plant> {
        self.plants
            .iter()
            .filter(|p| p.section_id() == section_id)
            .cloned()
            .collect()
    }

    /// Number of ticks processed so far.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Water every living plant in `section_id`. Returns how many were
    /// watered.
    pub fn water_section(&mut self, section_id: &str, amount: f64) -> usize {
        self.plants
            .iter_mut()
            .filter(|p| p.section_id() == section_id)
            .map(|p| p.water(amount))
            .filter(|watered| *watered)
            .count()
    }
}

/// Execute one tick: advance every plant in insertion order, then the
/// tick counter.
pub fn run_tick(greenhouse: &mut Greenhouse) -> TickSummary {
    let tick = greenhouse.tick;
    let mut deaths = Vec::new();

    for plant in &mut greenhouse.plants {
        if plant.on_tick() == PlantTick::Died {
            info!(tick, plant_id = plant.id(), section_id = plant.section_id(), "Plant died");
            deaths.push(plant.id().to_owned());
        }
        debug!(tick, "{plant}");
    }

    greenhouse.tick = greenhouse.tick.saturating_add(1);

    TickSummary {
        tick,
        plants_total: greenhouse.plants.len(),
        plants_alive: greenhouse.plants.iter().filter(|p| p.is_alive()).count(),
        deaths,
    }
}
