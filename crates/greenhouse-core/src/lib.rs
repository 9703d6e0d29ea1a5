//! Plant model, tick cycle, and simulator clock for the greenhouse simulation.
//!
//! This crate owns the authoritative plant state and the background clock
//! that advances it one tick at a time.
//!
//! # Modules
//!
//! - [`plant`] -- [`PlantType`] parameters, [`Plant`] instances, and the
//!   deterministic per-tick growth transition.
//! - [`sensor`] -- Sensor and reading value types shared with the sensor
//!   layer and the config loader.
//! - [`tick`] -- The [`Greenhouse`] plant collection and the single-tick
//!   cycle over it.
//! - [`control`] -- Run-state token and the blocking pause/resume/stop
//!   handoffs between callers and the clock thread.
//! - [`simulator`] -- The [`Simulator`]: clock thread plus a
//!   concurrency-safe command surface.
//! - [`data_source`] -- [`PlantDataSource`], the read-only capability the
//!   sensor layer queries.
//! - [`watering`] -- Watering events and schedules.
//! - [`config`] -- Configuration loading from `greenhouse-config.yaml`.
//! - [`error`] -- Error types shared across the crate.
//!
//! [`PlantType`]: plant::PlantType
//! [`Plant`]: plant::Plant
//! [`Greenhouse`]: tick::Greenhouse
//! [`Simulator`]: simulator::Simulator
//! [`PlantDataSource`]: data_source::PlantDataSource

pub mod config;
pub mod control;
pub mod data_source;
pub mod error;
pub mod plant;
pub mod sensor;
pub mod simulator;
pub mod tick;
pub mod watering;

pub use data_source::PlantDataSource;
pub use error::{ControlError, ModelError, SimulatorError};
pub use plant::{Plant, PlantState, PlantTick, PlantType};
pub use simulator::Simulator;
