//! Run-state control shared between callers and the clock thread.
//!
//! The run state is an explicit token guarded by a [`Mutex`], with a
//! [`Condvar`] for the blocking handoffs:
//!
//! - `pause` returns only after the clock thread has acknowledged entering
//!   the paused state.
//! - `resume` returns only after the clock thread is running again.
//! - `stop` returns only after the clock thread has observed the stop and
//!   left its loop. A tick already in progress finishes first.
//!
//! Two tokens are tracked: the state callers *requested* and the state the
//! clock thread has *acknowledged*. Callers see the requested state.
//!
//! Every accepted command also bumps a command epoch, and the clock records
//! the last epoch it has observed. A handoff waits for the clock to reach
//! its own epoch rather than a particular state, so a later command from
//! another thread can supersede it without leaving it asleep. A repeated
//! command waits for the latest epoch before reporting that nothing
//! changed.
//!
//! ```text
//! idle -> running <-> paused
//!   \        \          /
//!    +------> stopped <+
//! ```

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ControlError;

/// Lifecycle state of a simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Constructed but never started.
    Idle,
    /// The clock is firing ticks.
    Running,
    /// Tick delivery is suspended.
    Paused,
    /// Terminal. The clock thread has exited or never existed.
    Stopped,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Outcome of an accepted control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// The command changed the run state.
    Applied,
    /// `pause` on an already paused simulator; nothing changed.
    AlreadyPaused,
    /// `resume` on an already running simulator; nothing changed.
    AlreadyRunning,
    /// `stop` on an already stopped simulator; nothing changed.
    AlreadyStopped,
}

/// What the clock thread should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCommand {
    /// The interval elapsed while running: process one tick.
    Tick,
    /// Stop was requested: leave the loop.
    Exit,
}

#[derive(Debug)]
struct Tokens {
    requested: RunState,
    acknowledged: RunState,
    /// Bumped by every command that changes `requested`.
    epoch: u64,
    /// Last epoch the clock thread has acted on.
    ack_epoch: u64,
}

impl Tokens {
    fn request(&mut self, state: RunState) -> u64 {
        self.requested = state;
        self.epoch = self.epoch.saturating_add(1);
        self.epoch
    }

    fn settle(&mut self, state: RunState) {
        self.requested = state;
        self.acknowledged = state;
        self.ack_epoch = self.epoch;
    }

    /// Whether a caller waiting on `epoch` may return.
    const fn caught_up(&self, epoch: u64) -> bool {
        self.ack_epoch >= epoch || matches!(self.acknowledged, RunState::Stopped)
    }
}

/// Shared run-state token with blocking handoffs.
#[derive(Debug)]
pub struct RunControl {
    tokens: Mutex<Tokens>,
    changed: Condvar,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    /// Create a control block in the [`RunState::Idle`] state.
    pub const fn new() -> Self {
        Self {
            tokens: Mutex::new(Tokens {
                requested: RunState::Idle,
                acknowledged: RunState::Idle,
                epoch: 0,
                ack_epoch: 0,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tokens> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The most recently requested run state.
    pub fn run_state(&self) -> RunState {
        self.lock().requested
    }

    // -----------------------------------------------------------------------
    // Caller side
    // -----------------------------------------------------------------------

    /// Move from idle to running. The caller is expected to spawn the
    /// clock thread afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidTransition`] unless the state is idle.
    pub fn begin(&self) -> Result<(), ControlError> {
        let mut tokens = self.lock();
        if tokens.requested != RunState::Idle {
            return Err(ControlError::InvalidTransition {
                command: "start",
                state: tokens.requested,
            });
        }
        tokens.request(RunState::Running);
        Ok(())
    }

    /// Mark the control stopped without a clock thread, e.g. when the
    /// thread could not be spawned.
    pub fn abandon(&self) {
        self.lock().settle(RunState::Stopped);
        self.changed.notify_all();
    }

    /// Suspend tick delivery and wait for the clock thread to acknowledge.
    ///
    /// If another thread's command lands before the clock acknowledges,
    /// this returns once the clock has acted on that later command. A
    /// repeated pause still waits for the clock to catch up before
    /// returning [`ControlSignal::AlreadyPaused`].
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidTransition`] if the simulator is idle
    /// or stopped.
    pub fn pause(&self) -> Result<ControlSignal, ControlError> {
        let mut tokens = self.lock();
        match tokens.requested {
            RunState::Paused => {
                warn!("Already paused, ignoring");
                let epoch = tokens.epoch;
                drop(self.await_epoch(tokens, epoch));
                return Ok(ControlSignal::AlreadyPaused);
            }
            RunState::Running => {}
            state @ (RunState::Idle | RunState::Stopped) => {
                return Err(ControlError::InvalidTransition {
                    command: "pause",
                    state,
                });
            }
        }

        let epoch = tokens.request(RunState::Paused);
        self.changed.notify_all();
        drop(self.await_epoch(tokens, epoch));
        Ok(ControlSignal::Applied)
    }

    /// Resume tick delivery and wait for the clock thread to acknowledge.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidTransition`] if the simulator is idle
    /// or stopped.
    pub fn resume(&self) -> Result<ControlSignal, ControlError> {
        let mut tokens = self.lock();
        match tokens.requested {
            RunState::Running => {
                warn!("Already running, ignoring");
                let epoch = tokens.epoch;
                drop(self.await_epoch(tokens, epoch));
                return Ok(ControlSignal::AlreadyRunning);
            }
            RunState::Paused => {}
            state @ (RunState::Idle | RunState::Stopped) => {
                return Err(ControlError::InvalidTransition {
                    command: "resume",
                    state,
                });
            }
        }

        let epoch = tokens.request(RunState::Running);
        self.changed.notify_all();
        drop(self.await_epoch(tokens, epoch));
        Ok(ControlSignal::Applied)
    }

    /// Request a stop and wait for the clock thread to leave its loop.
    ///
    /// Stopping an idle control has no clock thread to wait for and
    /// completes immediately. A second stop waits for the same exit and
    /// then reports [`ControlSignal::AlreadyStopped`].
    pub fn stop(&self) -> ControlSignal {
        let mut tokens = self.lock();
        match tokens.requested {
            RunState::Stopped => {
                warn!("Already stopped, ignoring");
                drop(self.await_stopped(tokens));
                return ControlSignal::AlreadyStopped;
            }
            RunState::Idle => {
                tokens.settle(RunState::Stopped);
                self.changed.notify_all();
                return ControlSignal::Applied;
            }
            RunState::Running | RunState::Paused => {}
        }

        tokens.request(RunState::Stopped);
        self.changed.notify_all();
        drop(self.await_stopped(tokens));
        ControlSignal::Applied
    }

    /// Block until the clock thread has acted on `epoch` or stopped.
    fn await_epoch<'a>(
        &'a self,
        tokens: MutexGuard<'a, Tokens>,
        epoch: u64,
    ) -> MutexGuard<'a, Tokens> {
        self.changed
            .wait_while(tokens, |t| !t.caught_up(epoch))
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the clock thread has left its loop.
    fn await_stopped<'a>(&'a self, tokens: MutexGuard<'a, Tokens>) -> MutexGuard<'a, Tokens> {
        self.changed
            .wait_while(tokens, |t| t.acknowledged != RunState::Stopped)
            .unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Clock side
    // -----------------------------------------------------------------------

    /// Block the clock thread until the next tick is due or a stop is
    /// requested, acknowledging pause and resume along the way.
    ///
    /// `next_tick` is the deadline of the next tick; it is reset to one
    /// `interval` from now whenever the clock resumes from a pause.
    pub fn next_command(&self, interval: Duration, next_tick: &mut Instant) -> ClockCommand {
        let mut tokens = self.lock();
        loop {
            match tokens.requested {
                RunState::Stopped => {
                    tokens.settle(RunState::Stopped);
                    self.changed.notify_all();
                    info!("Stopping...");
                    return ClockCommand::Exit;
                }
                RunState::Paused => {
                    if tokens.acknowledged != RunState::Paused || tokens.ack_epoch != tokens.epoch {
                        if tokens.acknowledged != RunState::Paused {
                            info!("Paused");
                        }
                        tokens.settle(RunState::Paused);
                        self.changed.notify_all();
                    }
                    tokens = self
                        .changed
                        .wait(tokens)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                RunState::Running | RunState::Idle => {
                    let now = Instant::now();
                    if tokens.acknowledged == RunState::Paused {
                        info!("Resumed");
                        *next_tick = now.checked_add(interval).unwrap_or(now);
                    }
                    if tokens.acknowledged != RunState::Running || tokens.ack_epoch != tokens.epoch {
                        tokens.settle(RunState::Running);
                        self.changed.notify_all();
                    }
                    if now >= *next_tick {
                        return ClockCommand::Tick;
                    }
                    let remaining = next_tick.saturating_duration_since(now);
                    let (guard, _timeout) = self
                        .changed
                        .wait_timeout(tokens, remaining)
                        .unwrap_or_else(PoisonError::into_inner);
                    tokens = guard;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;

    use super::*;

    /// Run a minimal clock loop that counts ticks until told to exit.
    fn spawn_clock(control: &Arc<RunControl>, interval: Duration) -> thread::JoinHandle<u64> {
        let control = Arc::clone(control);
        thread::spawn(move || {
            let mut ticks = 0_u64;
            let mut next_tick = Instant::now() + interval;
            while control.next_command(interval, &mut next_tick) == ClockCommand::Tick {
                ticks += 1;
                next_tick += interval;
            }
            ticks
        })
    }

    #[test]
    fn initial_state_is_idle() {
        let control = RunControl::new();
        assert_eq!(control.run_state(), RunState::Idle);
    }

    #[test]
    fn begin_only_from_idle() {
        let control = RunControl::new();
        control.begin().unwrap();
        assert_eq!(control.run_state(), RunState::Running);
        let err = control.begin().unwrap_err();
        assert_eq!(
            err,
            ControlError::InvalidTransition {
                command: "start",
                state: RunState::Running,
            }
        );
    }

    #[test]
    fn pause_and_resume_require_a_started_clock() {
        let control = RunControl::new();
        assert!(control.pause().is_err());
        assert!(control.resume().is_err());
    }

    #[test]
    fn stop_while_idle_completes_immediately() {
        let control = RunControl::new();
        assert_eq!(control.stop(), ControlSignal::Applied);
        assert_eq!(control.run_state(), RunState::Stopped);
        assert_eq!(control.stop(), ControlSignal::AlreadyStopped);
        assert!(control.begin().is_err());
    }

    #[test]
    fn pause_resume_stop_handoffs() {
        let control = Arc::new(RunControl::new());
        control.begin().unwrap();
        let clock = spawn_clock(&control, Duration::from_secs(60));

        assert_eq!(control.pause().unwrap(), ControlSignal::Applied);
        assert_eq!(control.run_state(), RunState::Paused);
        assert_eq!(control.pause().unwrap(), ControlSignal::AlreadyPaused);

        assert_eq!(control.resume().unwrap(), ControlSignal::Applied);
        assert_eq!(control.run_state(), RunState::Running);
        assert_eq!(control.resume().unwrap(), ControlSignal::AlreadyRunning);

        assert_eq!(control.stop(), ControlSignal::Applied);
        assert_eq!(clock.join().unwrap(), 0);
        assert!(control.resume().is_err());
    }

    #[test]
    fn stop_while_paused_releases_the_clock() {
        let control = Arc::new(RunControl::new());
        control.begin().unwrap();
        let clock = spawn_clock(&control, Duration::from_secs(60));

        control.pause().unwrap();
        assert_eq!(control.stop(), ControlSignal::Applied);
        assert_eq!(clock.join().unwrap(), 0);
        assert_eq!(control.run_state(), RunState::Stopped);
    }

    #[test]
    fn clock_ticks_while_running() {
        let control = Arc::new(RunControl::new());
        control.begin().unwrap();
        let clock = spawn_clock(&control, Duration::from_millis(5));
        thread::sleep(Duration::from_millis(100));
        control.stop();
        assert!(clock.join().unwrap() > 0);
    }

    #[test]
    fn abandon_marks_stopped() {
        let control = RunControl::new();
        control.begin().unwrap();
        control.abandon();
        assert_eq!(control.run_state(), RunState::Stopped);
        assert!(control.pause().is_err());
    }

    #[test]
    fn pause_superseded_by_resume_still_returns() {
        let control = Arc::new(RunControl::new());
        control.begin().unwrap();
        let clock = spawn_clock(&control, Duration::from_millis(1));

        for _ in 0..50 {
            let (done_tx, done_rx) = mpsc::channel();
            let pauser = {
                let control = Arc::clone(&control);
                thread::spawn(move || {
                    let signal = control.pause().unwrap();
                    done_tx.send(signal).unwrap();
                })
            };
            while control.run_state() != RunState::Paused {
                thread::yield_now();
            }
            assert_eq!(control.resume().unwrap(), ControlSignal::Applied);
            assert_eq!(
                done_rx.recv_timeout(Duration::from_secs(2)).unwrap(),
                ControlSignal::Applied
            );
            pauser.join().unwrap();
        }

        control.stop();
        clock.join().unwrap();
    }

    #[test]
    fn repeated_pause_waits_for_the_clock() {
        let control = Arc::new(RunControl::new());
        control.begin().unwrap();
        let clock = spawn_clock(&control, Duration::from_millis(1));

        let first = {
            let control = Arc::clone(&control);
            thread::spawn(move || control.pause().unwrap())
        };
        while control.run_state() != RunState::Paused {
            thread::yield_now();
        }
        assert_eq!(control.pause().unwrap(), ControlSignal::AlreadyPaused);
        {
            let tokens = control.lock();
            assert_eq!(tokens.acknowledged, RunState::Paused);
            assert_eq!(tokens.ack_epoch, tokens.epoch);
        }
        assert_eq!(first.join().unwrap(), ControlSignal::Applied);

        control.stop();
        clock.join().unwrap();
    }
}
