//! The simulator: a background clock thread plus a concurrency-safe
//! command surface.
//!
//! The [`Simulator`] owns the authoritative [`Greenhouse`] behind a single
//! [`RwLock`]. The clock thread takes the write lock for the whole of each
//! tick, so [`Simulator::get_plants`] and [`Simulator::get_current_tick`]
//! always observe a fully pre-tick or fully post-tick state.
//!
//! Reads and [`Simulator::add_plant`] synchronize only on that lock, never
//! on the run-state token, so they keep working while the clock is paused
//! or before it was ever started.
//!
//! The simulator is meant to be constructed once and shared explicitly,
//! typically as `Arc<Simulator>`.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::control::{ClockCommand, ControlSignal, RunControl, RunState};
use crate::error::SimulatorError;
use crate::plant::Plant;
use crate::tick::{self, Greenhouse};
use crate::watering::WateringEvent;

/// Name given to the clock thread.
const CLOCK_THREAD_NAME: &str = "greenhouse-clock";

/// State shared between the command surface and the clock thread.
#[derive(Debug)]
struct Shared {
    tick_interval: Duration,
    greenhouse: RwLock<Greenhouse>,
    control: RunControl,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, Greenhouse> {
        self.greenhouse.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Greenhouse> {
        self.greenhouse.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Tick-driven greenhouse simulator.
#[derive(Debug)]
pub struct Simulator {
    shared: Arc<Shared>,
    clock: Mutex<Option<JoinHandle<()>>>,
}

impl Simulator {
    /// Create an idle simulator that will tick every `tick_interval` once
    /// started.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::ZeroTickInterval`] for a zero interval.
    pub fn new(tick_interval: Duration) -> Result<Self, SimulatorError> {
        if tick_interval.is_zero() {
            return Err(SimulatorError::ZeroTickInterval);
        }
        Ok(Self {
            shared: Arc::new(Shared {
                tick_interval,
                greenhouse: RwLock::new(Greenhouse::new()),
                control: RunControl::new(),
            }),
            clock: Mutex::new(None),
        })
    }

    // -----------------------------------------------------------------------
    // Run control
    // -----------------------------------------------------------------------

    /// Start the clock thread. The first tick fires one interval from now
    /// and is numbered 0.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::Control`] unless the simulator is idle, or
    /// [`SimulatorError::Spawn`] if the thread could not be created.
    pub fn start(&self) -> Result<(), SimulatorError> {
        self.shared.control.begin()?;

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(CLOCK_THREAD_NAME.to_owned())
            .spawn(move || run_clock(&shared));

        match spawned {
            Ok(handle) => {
                *self.clock.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                info!(
                    tick_interval_ms =
                        u64::try_from(self.shared.tick_interval.as_millis()).unwrap_or(u64::MAX),
                    "Starting..."
                );
                Ok(())
            }
            Err(source) => {
                self.shared.control.abandon();
                Err(SimulatorError::Spawn { source })
            }
        }
    }

    /// Suspend tick delivery. Blocks until the clock thread has paused.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::Control`] if the simulator is idle or
    /// stopped.
    pub fn pause(&self) -> Result<ControlSignal, SimulatorError> {
        Ok(self.shared.control.pause()?)
    }

    /// Resume tick delivery after a pause.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::Control`] if the simulator is idle or
    /// stopped.
    pub fn resume(&self) -> Result<ControlSignal, SimulatorError> {
        Ok(self.shared.control.resume()?)
    }

    /// Stop the simulator for good. Blocks until the clock thread has
    /// finished any in-flight tick and exited. A concurrent second stop
    /// waits for the same exit before returning
    /// [`ControlSignal::AlreadyStopped`].
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::ClockPanicked`] if the clock thread
    /// panicked.
    pub fn stop(&self) -> Result<ControlSignal, SimulatorError> {
        let signal = self.shared.control.stop();
        let handle = self
            .clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.join().map_err(|_panic| SimulatorError::ClockPanicked)?;
        }
        Ok(signal)
    }

    /// Current run state.
    pub fn run_state(&self) -> RunState {
        self.shared.control.run_state()
    }

    /// Whether the simulator is paused.
    pub fn is_paused(&self) -> bool {
        self.run_state() == RunState::Paused
    }

    /// Configured tick interval.
    pub fn tick_interval(&self) -> Duration {
        self.shared.tick_interval
    }

    // -----------------------------------------------------------------------
    // Plant collection
    // -----------------------------------------------------------------------

    /// Add a plant. A plant added while a tick is running joins from the
    /// next tick.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::DuplicatePlant`] if a plant with the same
    /// id was added before.
    pub fn add_plant(&self, plant: Plant) -> Result<(), SimulatorError> {
        let plant_id = plant.id().to_owned();
        let section_id = plant.section_id().to_owned();
        self.shared.write().add_plant(plant)?;
        info!(plant_id, section_id, "Plant added");
        Ok(())
    }

    /// Snapshot of every plant in insertion order.
    pub fn get_plants(&self) -> Vec<Plant> {
        self.shared.read().plants().to_vec()
    }

    /// Snapshot of the plants in one section, in insertion order.
    pub fn plants_in_section(&self, section_id: &str) -> Vec<Plant> {
        self.shared.read().plants_in_section(section_id)
    }

    /// Number of ticks processed so far.
    pub fn get_current_tick(&self) -> u64 {
        self.shared.read().tick()
    }

    /// Apply a watering event to every living plant in its section.
    /// Returns how many plants were watered.
    pub fn apply_watering(&self, event: &WateringEvent) -> usize {
        let watered = self
            .shared
            .write()
            .water_section(&event.section_id, event.amount);
        info!(
            section_id = event.section_id,
            amount = event.amount,
            manual = event.is_manual,
            watered,
            "Watering applied"
        );
        watered
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        if self.run_state() != RunState::Stopped {
            let _stopped = self.stop();
        }
    }
}

/// Body of the clock thread.
fn run_clock(shared: &Shared) {
    let interval = shared.tick_interval;
    let started = Instant::now();
    let mut next_tick = started.checked_add(interval).unwrap_or(started);

    while shared.control.next_command(interval, &mut next_tick) == ClockCommand::Tick {
        let summary = {
            let mut greenhouse = shared.write();
            tick::run_tick(&mut greenhouse)
        };
        info!(
            tick = summary.tick,
            plants_total = summary.plants_total,
            plants_alive = summary.plants_alive,
            deaths = summary.deaths.len(),
            "Tick complete"
        );

        let now = Instant::now();
        next_tick = next_tick.checked_add(interval).unwrap_or(now);
        if next_tick < now {
            debug!(tick = summary.tick, "Tick overran its interval");
            next_tick = now;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_rejected() {
        assert!(matches!(
            Simulator::new(Duration::ZERO),
            Err(SimulatorError::ZeroTickInterval)
        ));
    }

    #[test]
    fn new_simulator_is_idle_at_tick_zero() {
        let sim = Simulator::new(Duration::from_secs(1)).unwrap();
        assert_eq!(sim.run_state(), RunState::Idle);
        assert_eq!(sim.get_current_tick(), 0);
        assert!(sim.get_plants().is_empty());
        assert!(!sim.is_paused());
    }

    #[test]
    fn start_twice_is_rejected() {
        let sim = Simulator::new(Duration::from_secs(60)).unwrap();
        sim.start().unwrap();
        assert!(matches!(sim.start(), Err(SimulatorError::Control { .. })));
        sim.stop().unwrap();
    }

    #[test]
    fn stop_is_terminal() {
        let sim = Simulator::new(Duration::from_secs(60)).unwrap();
        sim.start().unwrap();
        assert_eq!(sim.stop().unwrap(), ControlSignal::Applied);
        assert_eq!(sim.run_state(), RunState::Stopped);
        assert!(sim.resume().is_err());
        assert!(sim.start().is_err());
        assert_eq!(sim.stop().unwrap(), ControlSignal::AlreadyStopped);
    }
}
