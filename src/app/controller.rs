//! Feed controller: one feed cycle, end to end.
//!
//! ```text
//!  FeederService / RecoveryPolicy / CLI
//!              │ feed(trigger, now, next_fire)
//!              ▼
//!  ┌──────────────────────┐  rotate × feeds_per_day  ┌───────────┐
//!  │    FeedController    │ ───────────────────────▶ │ MotorPort │
//!  │  in-memory FeedState │                          └───────────┘
//!  │                      │  record(outcome)         ┌───────────┐
//!  │                      │ ───────────────────────▶ │ FeedStore │
//!  └──────────────────────┘                          └───────────┘
//! ```
//!
//! The in-memory [`FeedState`] is authoritative for the running process.
//! If persisting an outcome fails, memory is still updated so recovery
//! and status in this process see the attempt; only a restart loses it.

use chrono::NaiveDateTime;
use log::{error, info, warn};

use crate::config::FeederConfig;
use crate::error::{ActuatorError, Error};
use crate::state::{FeedOutcome, FeedState};

use super::events::{AppEvent, FeedTrigger};
use super::ports::{EventSink, FeedStore, MotorPort};

/// What a successful feed cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedReport {
    pub repetitions: u32,
    /// False when the outcome could not be written to the store.
    pub persisted: bool,
}

pub struct FeedController<M: MotorPort, S: FeedStore> {
    motor: M,
    store: S,
    steps_per_feed: i32,
    repetitions: u32,
    state: FeedState,
}

impl<M: MotorPort, S: FeedStore> FeedController<M, S> {
    /// Build the controller and seed its memory from the store.
    ///
    /// A corrupt record is logged and treated as "no prior state".
    pub fn new(config: &FeederConfig, motor: M, store: S) -> Self {
        let state = match store.load() {
            Ok(state) => state,
            Err(e) => {
                warn!("Feed state unreadable, starting from empty history: {}", e);
                FeedState::default()
            }
        };
        Self {
            motor,
            store,
            steps_per_feed: i32::try_from(config.motor.steps_per_feed).unwrap_or(i32::MAX),
            repetitions: config.feeds_per_day,
            state,
        }
    }

    /// Run one feed cycle.
    ///
    /// Drives `feeds_per_day` repetitions sequentially.  The first failing
    /// repetition aborts the rest; the attempt is recorded as `Failed` and
    /// the actuator error is returned.  A failure is never recorded as
    /// success.
    pub fn feed(
        &mut self,
        trigger: FeedTrigger,
        now: NaiveDateTime,
        next_fire: Option<NaiveDateTime>,
        sink: &mut impl EventSink,
    ) -> Result<FeedReport, Error> {
        info!(
            "Feed cycle ({:?}): {} repetition(s) of {} steps",
            trigger, self.repetitions, self.steps_per_feed
        );
        sink.emit(&AppEvent::FeedStarted {
            trigger,
            repetitions: self.repetitions,
        });

        match self.run_repetitions() {
            Ok(()) => {
                let persisted = self.record(FeedOutcome::Success, now, next_fire, None, sink);
                sink.emit(&AppEvent::FeedCompleted {
                    trigger,
                    repetitions: self.repetitions,
                    total_count: self.state.total_count,
                });
                Ok(FeedReport {
                    repetitions: self.repetitions,
                    persisted,
                })
            }
            Err((repetition, e)) => {
                error!("Feed cycle ({:?}) aborted at repetition {}: {}", trigger, repetition, e);
                self.record(FeedOutcome::Failed, now, next_fire, Some(e.to_string()), sink);
                sink.emit(&AppEvent::FeedFailed {
                    trigger,
                    repetition,
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Returns the 1-based repetition that failed alongside the error.
    fn run_repetitions(&mut self) -> Result<(), (u32, ActuatorError)> {
        for repetition in 1..=self.repetitions {
            self.motor
                .rotate(self.steps_per_feed)
                .map_err(|e| (repetition, e))?;
        }
        Ok(())
    }

    /// Persist the attempt; memory is updated either way.
    fn record(
        &mut self,
        outcome: FeedOutcome,
        now: NaiveDateTime,
        next_fire: Option<NaiveDateTime>,
        cause: Option<String>,
        sink: &mut impl EventSink,
    ) -> bool {
        match self.store.record(outcome, now, next_fire, cause.clone()) {
            Ok(stored) => {
                self.state = stored;
                true
            }
            Err(e) => {
                error!("Feed outcome {:?} not persisted: {}", outcome, e);
                self.state.apply(outcome, now, next_fire, cause);
                sink.emit(&AppEvent::StateNotPersisted {
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Drive a fixed number of steps without recording a feed.
    pub fn calibrate(&mut self, steps: i32) -> Result<(), Error> {
        info!("Calibration: rotating {} steps", steps);
        self.motor.rotate(steps)?;
        Ok(())
    }

    /// De-energize the motor.
    pub fn release(&mut self) -> Result<(), Error> {
        self.motor.release()?;
        Ok(())
    }

    /// Authoritative history for this process.
    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn motor(&self) -> &M {
        &self.motor
    }
}
