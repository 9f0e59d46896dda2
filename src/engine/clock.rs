//! Round Clock
//!
//! Cancellable timers driving phase transitions. Exactly one timer task is
//! live at a time: arming a new phase's timer aborts the previous task and
//! bumps a generation counter. Abort alone is not enough - a tick already
//! sitting in the channel when the abort lands would otherwise be applied
//! to the wrong phase - so every signal is stamped with the generation that
//! armed it, and the engine drops signals from stale generations.
//!
//! Timer tasks never touch round state. They only push signals into the
//! engine's mpsc channel, which is the single serialization point.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::trace;

/// A timer firing, delivered to the engine loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// One second of the betting countdown elapsed. `remaining == 0` means
    /// betting just closed; the countdown task stops itself after this.
    CountdownTick {
        /// Whole seconds left in the betting phase.
        remaining: u32,
    },
    /// One multiplier ramp interval elapsed.
    RampTick,
    /// The post-crash delay elapsed; the next betting phase is due.
    RestartElapsed,
}

/// A clock event stamped with the generation that armed its timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSignal {
    /// Generation of the arming call. Stale generations must be ignored.
    pub generation: u64,
    /// What fired.
    pub event: ClockEvent,
}

/// Owner of the currently armed timer task.
///
/// At most one task is live per clock; every arming call cancels the
/// previous task first.
pub struct RoundClock {
    tx: mpsc::Sender<ClockSignal>,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl RoundClock {
    /// Create a clock that delivers signals into `tx`.
    pub fn new(tx: mpsc::Sender<ClockSignal>) -> Self {
        Self {
            tx,
            generation: 0,
            task: None,
        }
    }

    /// Whether a signal belongs to the currently armed timer.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Cancel the armed timer, if any.
    ///
    /// The generation still advances on the next arm, so a firing that
    /// slipped past the abort is dropped by [`RoundClock::is_current`].
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Arm the betting countdown: one tick per second, counting
    /// `from_secs - 1` down to 0, then the task stops itself.
    pub fn start_countdown(&mut self, from_secs: u32) {
        let generation = self.arm();
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            let mut timer = interval(Duration::from_secs(1));
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First interval tick completes immediately; consume it so the
            // countdown holds its starting value for a full second.
            timer.tick().await;

            for remaining in (0..from_secs).rev() {
                timer.tick().await;
                trace!(generation, remaining, "countdown tick");
                let signal = ClockSignal {
                    generation,
                    event: ClockEvent::CountdownTick { remaining },
                };
                if tx.send(signal).await.is_err() {
                    return;
                }
            }
        }));
    }

    /// Arm the multiplier ramp: one tick per `tick_interval`, forever.
    ///
    /// The engine decides when the ramp is over (multiplier reached the
    /// crash point) and cancels this timer.
    pub fn start_ramp(&mut self, tick_interval: Duration) {
        let generation = self.arm();
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            let mut timer = interval(tick_interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            timer.tick().await;

            loop {
                timer.tick().await;
                let signal = ClockSignal {
                    generation,
                    event: ClockEvent::RampTick,
                };
                if tx.send(signal).await.is_err() {
                    return;
                }
            }
        }));
    }

    /// Arm the one-shot delay between a crash and the next betting phase.
    pub fn start_restart_delay(&mut self, delay: Duration) {
        let generation = self.arm();
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            sleep(delay).await;
            let signal = ClockSignal {
                generation,
                event: ClockEvent::RestartElapsed,
            };
            let _ = tx.send(signal).await;
        }));
    }

    /// Cancel the previous timer and advance to a fresh generation.
    fn arm(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;
        self.generation
    }
}

impl Drop for RoundClock {
    fn drop(&mut self) {
        self.cancel();
    }
}

// =============================================================================
// TESTS
// =============================================================================
