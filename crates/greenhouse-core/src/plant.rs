//! Plant types, plant instances, and the per-tick growth transition.
//!
//! A [`PlantType`] is an immutable parameter set shared by reference
//! (`Arc`) across every [`Plant`] of that species. A [`Plant`] is mutated
//! once per tick by [`Plant::on_tick`] while alive; once dead it is frozen
//! and further ticks leave it untouched.
//!
//! # Order of operations
//!
//! 1. Skip if the plant is dead
//! 2. Degrade health if saturation is outside `[min, max]`, else enhance it
//! 3. Mark the plant dead if health reached zero (stop here)
//! 4. Advance the growth stage based on health and proximity to optimal
//! 5. Deplete soil saturation
//!
//! Depletion runs last so that growth is decided against the saturation
//! the plant actually sat in during the tick.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Health below which a plant does not grow at all.
pub const GROWTH_HALT_HEALTH: f64 = 0.3;

/// Health below which growth is divided by [`GROWTH_SLOW_FACTOR`].
pub const GROWTH_SLOW_HEALTH: f64 = 0.5;

/// Divisor applied to the growth rate of a struggling plant.
pub const GROWTH_SLOW_FACTOR: f64 = 1.35;

/// Multiplier applied when saturation is close to optimal.
pub const GROWTH_OPTIMAL_FACTOR: f64 = 1.25;

/// Maximum distance from optimal saturation that still earns the bonus
/// (exclusive).
pub const OPTIMAL_PROXIMITY: f64 = 0.15;

/// Saturation thresholds for a plant type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaturationBounds {
    /// Below this, health degrades.
    pub min_saturation: f64,
    /// Saturation at which growth receives the proximity bonus.
    pub optimal_saturation: f64,
    /// Above this, health degrades.
    pub max_saturation: f64,
}

/// Per-tick rates for a plant type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthRates {
    /// Growth stage gained per tick before modifiers.
    pub base_growth_rate: f64,
    /// Soil saturation consumed per tick.
    pub saturation_depletion: f64,
    /// Health lost per tick while saturation is out of range.
    pub health_degradation_rate: f64,
    /// Health gained per tick while saturation is in range.
    pub health_enhancement_rate: f64,
}

/// Immutable growth parameters for one species of plant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantType {
    name: String,
    bounds: SaturationBounds,
    rates: GrowthRates,
}

impl PlantType {
    /// Create a validated plant type.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyField`] for an empty name,
    /// [`ModelError::OutOfRange`] if any saturation or rate lies outside
    /// `[0, 1]`, and [`ModelError::UnorderedBounds`] unless
    /// `min <= optimal <= max`.
    pub fn new(
        name: impl Into<String>,
        bounds: SaturationBounds,
        rates: GrowthRates,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModelError::EmptyField {
                field: "plant type name",
            });
        }

        check_unit("optimal saturation", bounds.optimal_saturation)?;
        check_unit("min saturation", bounds.min_saturation)?;
        check_unit("max saturation", bounds.max_saturation)?;
        check_unit("base growth rate", rates.base_growth_rate)?;
        check_unit("saturation depletion", rates.saturation_depletion)?;
        check_unit("health degradation rate", rates.health_degradation_rate)?;
        check_unit("health enhancement rate", rates.health_enhancement_rate)?;

        if bounds.min_saturation > bounds.optimal_saturation
            || bounds.optimal_saturation > bounds.max_saturation
        {
            return Err(ModelError::UnorderedBounds {
                min: bounds.min_saturation,
                optimal: bounds.optimal_saturation,
                max: bounds.max_saturation,
            });
        }

        Ok(Self {
            name,
            bounds,
            rates,
        })
    }

    /// Species name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Saturation thresholds.
    pub const fn bounds(&self) -> SaturationBounds {
        self.bounds
    }

    /// Per-tick rates.
    pub const fn rates(&self) -> GrowthRates {
        self.rates
    }

    /// Whether `saturation` lies outside the healthy `[min, max]` range.
    pub fn out_of_range(&self, saturation: f64) -> bool {
        saturation < self.bounds.min_saturation || saturation > self.bounds.max_saturation
    }
}

/// The mutable portion of a plant, used for restoring state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlantState {
    /// Soil moisture around the plant, `[0, 1]`.
    pub soil_saturation: f64,
    /// 0.0 is dead, 1.0 is perfect health.
    pub health: f64,
    /// 0.0 is a seed, 1.0 is mature.
    pub growth_stage: f64,
    /// Whether the plant is still alive.
    pub alive: bool,
}

/// What a single call to [`Plant::on_tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantTick {
    /// The plant was already dead; nothing changed.
    Dormant,
    /// The plant survived the tick and its state advanced.
    Survived,
    /// Health reached zero this tick and the plant died.
    Died,
}

/// A single plant in the greenhouse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plant {
    id: String,
    plant_type: Arc<PlantType>,
    section_id: String,
    soil_saturation: f64,
    health: f64,
    growth_stage: f64,
    alive: bool,
    created_at: DateTime<Utc>,
}

impl Plant {
    /// Create a new plant at full health and zero growth.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyField`] if `id` or `section_id` is
    /// empty, or [`ModelError::OutOfRange`] if `initial_saturation` is
    /// outside `[0, 1]`.
    pub fn new(
        id: impl Into<String>,
        plant_type: Arc<PlantType>,
        section_id: impl Into<String>,
        initial_saturation: f64,
    ) -> Result<Self, ModelError> {
        Self::from_parts(
            id,
            plant_type,
            section_id,
            PlantState {
                soil_saturation: initial_saturation,
                health: 1.0,
                growth_stage: 0.0,
                alive: true,
            },
            Utc::now(),
        )
    }

    /// Create a plant from explicit state (useful for testing and state
    /// restoration).
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if an id is empty or any state value lies
    /// outside `[0, 1]`.
    pub fn from_parts(
        id: impl Into<String>,
        plant_type: Arc<PlantType>,
        section_id: impl Into<String>,
        state: PlantState,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ModelError> {
        let id = id.into();
        let section_id = section_id.into();
        if id.is_empty() {
            return Err(ModelError::EmptyField { field: "id" });
        }
        if section_id.is_empty() {
            return Err(ModelError::EmptyField {
                field: "section id",
            });
        }
        check_unit("initial saturation", state.soil_saturation)?;
        check_unit("health", state.health)?;
        check_unit("growth stage", state.growth_stage)?;

        Ok(Self {
            id,
            plant_type,
            section_id,
            soil_saturation: state.soil_saturation,
            health: state.health,
            growth_stage: state.growth_stage,
            alive: state.alive,
            created_at,
        })
    }

    /// Advance the plant by one tick.
    ///
    /// Dead plants are left untouched. A plant whose health reaches zero
    /// dies immediately and its growth and saturation keep their pre-tick
    /// values.
    pub fn on_tick(&mut self) -> PlantTick {
        if !self.alive {
            return PlantTick::Dormant;
        }

        let rates = self.plant_type.rates();
        if self.plant_type.out_of_range(self.soil_saturation) {
            self.health = (self.health - rates.health_degradation_rate).max(0.0);
        } else {
            self.health = (self.health + rates.health_enhancement_rate).min(1.0);
        }

        if self.health <= 0.0 {
            self.alive = false;
            return PlantTick::Died;
        }

        self.grow();
        self.soil_saturation = (self.soil_saturation - rates.saturation_depletion).max(0.0);
        PlantTick::Survived
    }

    fn grow(&mut self) {
        if self.health < GROWTH_HALT_HEALTH {
            return;
        }

        let mut rate = self.plant_type.rates().base_growth_rate;
        if self.health < GROWTH_SLOW_HEALTH {
            rate /= GROWTH_SLOW_FACTOR;
        }
        let optimal = self.plant_type.bounds().optimal_saturation;
        if (self.soil_saturation - optimal).abs() < OPTIMAL_PROXIMITY {
            rate *= GROWTH_OPTIMAL_FACTOR;
        }
        self.growth_stage = (self.growth_stage + rate).min(1.0);
    }

    /// Add water to the soil, clamped at full saturation.
    ///
    /// Returns `false` (and changes nothing) if the plant is dead.
    pub fn water(&mut self, amount: f64) -> bool {
        if !self.alive {
            return false;
        }
        self.soil_saturation = (self.soil_saturation + amount.max(0.0)).min(1.0);
        true
    }

    /// Unique plant identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shared species parameters.
    pub const fn plant_type(&self) -> &Arc<PlantType> {
        &self.plant_type
    }

    /// Section this plant belongs to.
    pub fn section_id(&self) -> &str {
        &self.section_id
    }

    /// Current soil saturation.
    pub const fn soil_saturation(&self) -> f64 {
        self.soil_saturation
    }

    /// Current health.
    pub const fn health(&self) -> f64 {
        self.health
    }

    /// Current growth stage.
    pub const fn growth_stage(&self) -> f64 {
        self.growth_stage
    }

    /// Whether the plant is alive.
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// When the plant was created.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Snapshot of the mutable state.
    pub const fn state(&self) -> PlantState {
        PlantState {
            soil_saturation: self.soil_saturation,
            health: self.health,
            growth_stage: self.growth_stage,
            alive: self.alive,
        }
    }
}

impl fmt::Display for Plant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] Health:{:.2} Growth:{:.2} Sat:{:.2} Alive:{}",
            self.id, self.health, self.growth_stage, self.soil_saturation, self.alive
        )
    }
}

/// Reject values outside `[0, 1]`, including NaN.
pub(crate) fn check_unit(field: &'static str, value: f64) -> Result<(), ModelError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ModelError::OutOfRange { field, value })
    }
}
