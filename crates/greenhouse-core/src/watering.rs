//! Watering events and automated watering schedules.
//!
//! A [`WateringEvent`] adds water to every living plant of a section. A
//! [`WateringSchedule`] checks a section's average saturation every
//! `check_interval` ticks and produces an automatic event when it has
//! dropped below the target.
//!
//! Events are applied in one step; `duration` is carried for reporting but
//! water is not spread across ticks.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::plant::check_unit;

/// A single watering occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WateringEvent {
    /// Section receiving the water.
    pub section_id: String,
    /// Saturation added to each living plant, `[0, 1]`.
    pub amount: f64,
    /// When the event was issued.
    pub start_time: DateTime<Utc>,
    /// Nominal duration of the watering.
    pub duration: Duration,
    /// `true` for operator-triggered events, `false` for scheduled ones.
    pub is_manual: bool,
}

impl WateringEvent {
    /// Create an operator-triggered watering event starting now.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if `section_id` is empty or `amount` is
    /// outside `[0, 1]`.
    pub fn manual(
        section_id: impl Into<String>,
        amount: f64,
        duration: Duration,
    ) -> Result<Self, ModelError> {
        let section_id = section_id.into();
        if section_id.is_empty() {
            return Err(ModelError::EmptyField {
                field: "section id",
            });
        }
        check_unit("watering amount", amount)?;
        Ok(Self {
            section_id,
            amount,
            start_time: Utc::now(),
            duration,
            is_manual: true,
        })
    }
}

/// Automated watering configuration for one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WateringSchedule {
    /// Section monitored and watered.
    pub section_id: String,
    /// Average saturation below which the section is watered.
    pub target_saturation: f64,
    /// Ticks between checks.
    pub check_interval: u64,
    /// Saturation added per watering.
    pub water_amount: f64,
    /// Disabled schedules never fire.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl WateringSchedule {
    /// Validate the schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the section is empty, the target or amount
    /// is outside `[0, 1]`, or the check interval is zero.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.section_id.is_empty() {
            return Err(ModelError::EmptyField {
                field: "section id",
            });
        }
        check_unit("target saturation", self.target_saturation)?;
        check_unit("water amount", self.water_amount)?;
        if self.check_interval == 0 {
            return Err(ModelError::ZeroCheckInterval {
                section_id: self.section_id.clone(),
            });
        }
        Ok(())
    }

    /// Whether the schedule checks its section at `tick`.
    pub fn is_due(&self, tick: u64) -> bool {
        self.enabled && tick.checked_rem(self.check_interval) == Some(0)
    }

    /// Produce an automatic watering event if the schedule is due at `tick`
    /// and `average_saturation` is below target.
    pub fn evaluate(&self, tick: u64, average_saturation: f64) -> Option<WateringEvent> {
        if !self.is_due(tick) || average_saturation >= self.target_saturation {
            return None;
        }
        Some(WateringEvent {
            section_id: self.section_id.clone(),
            amount: self.water_amount,
            start_time: Utc::now(),
            duration: Duration::ZERO,
            is_manual: false,
        })
    }
}

const fn default_true() -> bool {
    true
}
