//! Error types for the `greenhouse-core` crate.
//!
//! Construction-time validation failures surface as [`ModelError`]; misuse
//! of the run-state protocol as [`ControlError`]; everything the
//! [`Simulator`](crate::simulator::Simulator) command surface can reject
//! as [`SimulatorError`].

use crate::control::RunState;

/// Errors raised while validating plant, plant type, or watering input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// A required string field was empty.
    #[error("{field} cannot be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A numeric field fell outside the closed unit interval.
    #[error("{field} must be between 0.0 and 1.0, got {value}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Saturation bounds are not ordered `min <= optimal <= max`.
    #[error("saturation bounds must satisfy min <= optimal <= max (min {min}, optimal {optimal}, max {max})")]
    UnorderedBounds {
        /// Lower bound of the healthy range.
        min: f64,
        /// Optimal saturation.
        optimal: f64,
        /// Upper bound of the healthy range.
        max: f64,
    },

    /// A watering schedule was configured with a zero check interval.
    #[error("watering check interval for section {section_id} must be at least 1 tick")]
    ZeroCheckInterval {
        /// Section the schedule targets.
        section_id: String,
    },
}

/// Errors produced by the run-state protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    /// The command is not valid from the current run state.
    #[error("cannot {command} a simulator that is {state}")]
    InvalidTransition {
        /// The command that was attempted.
        command: &'static str,
        /// The run state at the time of the attempt.
        state: RunState,
    },
}

/// Errors produced by the simulator command surface.
#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    /// A plant with this id was already added during this simulator's lifetime.
    #[error("duplicate plant id: {0}")]
    DuplicatePlant(String),

    /// The tick interval must be non-zero.
    #[error("tick interval must be greater than zero")]
    ZeroTickInterval,

    /// A control command was rejected.
    #[error("control error: {source}")]
    Control {
        /// The underlying control error.
        #[from]
        source: ControlError,
    },

    /// The clock thread could not be spawned.
    #[error("failed to spawn clock thread: {source}")]
    Spawn {
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The clock thread panicked before acknowledging stop.
    #[error("clock thread panicked")]
    ClockPanicked,
}
