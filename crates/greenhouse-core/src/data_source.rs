//! Read-only plant data capability consumed by the sensor layer.
//!
//! [`PlantDataSource`] decouples readers from the concrete owner of the
//! plant collection. The [`Simulator`] implements it directly so a sensor
//! manager can be built against a running simulator; tests substitute a
//! fixed in-memory fixture.

use crate::plant::Plant;
use crate::simulator::Simulator;

/// Source of plant snapshots, queried by section.
///
/// Implementations return owned snapshots; callers never gain the ability
/// to mutate the underlying plants.
pub trait PlantDataSource: Send + Sync {
    /// Plants currently in `section_id`. May be empty.
    fn plants_in_section(&self, section_id: &str) -> Vec<Plant>;

    /// Every plant currently known.
    fn all_plants(&self) -> Vec<Plant>;
}

impl PlantDataSource for Simulator {
    fn plants_in_section(&self, section_id: &str) -> Vec<Plant> {
        Self::plants_in_section(self, section_id)
    }

    fn all_plants(&self) -> Vec<Plant> {
        self.get_plants()
    }
}
