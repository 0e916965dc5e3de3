//! Application service: the control loop.
//!
//! [`FeederService`] owns the feed controller, the daily scheduler and the
//! recovery policy.  It exposes a hardware-agnostic API; all I/O flows
//! through the port traits the controller was built with, and time is
//! always passed in, so the whole loop runs under test with a fake clock.
//!
//! ```text
//!               ┌───────────────────────────────┐
//!  Clock ─now─▶ │         FeederService         │ ──▶ EventSink
//!               │  Scheduler · RecoveryPolicy   │
//!               │         FeedController        │ ──▶ MotorPort / FeedStore
//!               └───────────────────────────────┘
//! ```

use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime};
use log::{info, warn};

use crate::config::FeederConfig;
use crate::recovery::{RecoveryDecision, RecoveryPolicy};
use crate::scheduler::{Scheduler, TickOutcome};
use crate::shutdown::ShutdownToken;

use super::controller::FeedController;
use super::events::{AppEvent, FeedTrigger};
use super::ports::{Clock, EventSink, FeedStore, MotorPort, SchedulerDelegate};

/// Label of the single daily job.
pub const DAILY_FEED_JOB: &str = "daily-feed";

// ───────────────────────────────────────────────────────────────
// Scheduler delegate
// ───────────────────────────────────────────────────────────────

/// Runs a scheduled feed cycle when the daily job fires.
struct ScheduledFeed<'a, M: MotorPort, S: FeedStore, E: EventSink> {
    controller: &'a mut FeedController<M, S>,
    sink: &'a mut E,
}

impl<M: MotorPort, S: FeedStore, E: EventSink> SchedulerDelegate for ScheduledFeed<'_, M, S, E> {
    fn on_schedule_fired(
        &mut self,
        _label: &str,
        now: NaiveDateTime,
        next_fire: NaiveDateTime,
    ) -> crate::error::Result<()> {
        self.controller
            .feed(FeedTrigger::Scheduled, now, Some(next_fire), &mut *self.sink)
            .map(|_| ())
    }
}

// ───────────────────────────────────────────────────────────────
// Reports
// ───────────────────────────────────────────────────────────────

/// What one heartbeat did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub tick: TickOutcome,
    /// `None` when heartbeat recovery is switched off.
    pub recovery: Option<RecoveryDecision>,
}

/// Tally of a manual test run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestRun {
    pub succeeded: u32,
    pub failed: u32,
    pub interrupted: bool,
}

// ───────────────────────────────────────────────────────────────
// FeederService
// ───────────────────────────────────────────────────────────────

pub struct FeederService<M: MotorPort, S: FeedStore, E: EventSink> {
    controller: FeedController<M, S>,
    scheduler: Scheduler,
    recovery: RecoveryPolicy,
    sink: E,
    feed_time: NaiveTime,
    recover_on_heartbeat: bool,
    heartbeat: Duration,
}

impl<M: MotorPort, S: FeedStore, E: EventSink> FeederService<M, S, E> {
    /// Construct the service.  Does **not** arm the scheduler; call
    /// [`start`](Self::start) next.
    pub fn new(config: &FeederConfig, motor: M, store: S, sink: E) -> Self {
        Self {
            controller: FeedController::new(config, motor, store),
            scheduler: Scheduler::new(),
            recovery: RecoveryPolicy::new(config),
            sink,
            feed_time: config.feed_time,
            recover_on_heartbeat: config.recovery.enabled && config.recovery.on_heartbeat,
            heartbeat: Duration::from_secs(config.heartbeat_secs),
        }
    }

    /// Override the heartbeat interval (schedule test).
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Arm the daily job and run the startup recovery evaluation.
    pub fn start(&mut self, now: NaiveDateTime) -> RecoveryDecision {
        let next_fire = self.scheduler.schedule_daily(DAILY_FEED_JOB, self.feed_time, now);
        info!("Feeder started, next feed at {}", next_fire);
        self.sink.emit(&AppEvent::Started { next_fire });
        self.evaluate_recovery(now)
    }

    /// Tick the scheduler, then re-evaluate recovery if enabled.
    pub fn heartbeat(&mut self, now: NaiveDateTime) -> Heartbeat {
        let mut job = ScheduledFeed {
            controller: &mut self.controller,
            sink: &mut self.sink,
        };
        let tick = self.scheduler.tick(now, &mut job);
        if let TickOutcome::Fired { next_fire } | TickOutcome::Failed { next_fire } = tick {
            self.sink.emit(&AppEvent::ScheduleRearmed { next_fire });
        }

        let recovery = if self.recover_on_heartbeat {
            Some(self.evaluate_recovery(now))
        } else {
            None
        };
        Heartbeat { tick, recovery }
    }

    /// Heartbeat until cancelled, or until the daily job has fired
    /// `max_fires` times.  The motor is released on every exit path.
    ///
    /// Returns the number of scheduled fires.
    pub fn run(
        &mut self,
        clock: &impl Clock,
        shutdown: &ShutdownToken,
        max_fires: Option<u64>,
    ) -> u64 {
        info!("Control loop running, heartbeat {}s", self.heartbeat.as_secs());
        loop {
            if shutdown.is_cancelled() {
                info!("Shutdown requested");
                break;
            }
            self.heartbeat(clock.now());
            if max_fires.is_some_and(|limit| self.scheduler.fire_count() >= limit) {
                info!("Fire limit reached");
                break;
            }
            if shutdown.wait_timeout(self.heartbeat) {
                info!("Shutdown requested");
                break;
            }
        }
        self.stop()
    }

    /// Run `iterations` manual feeds, waiting `interval` between them.
    ///
    /// A failed feed is counted and the run continues; cancellation ends
    /// it early.  The motor is released afterward either way.
    pub fn run_test_feeds(
        &mut self,
        iterations: u32,
        interval: Duration,
        clock: &impl Clock,
        shutdown: &ShutdownToken,
    ) -> TestRun {
        let mut run = TestRun::default();
        for i in 1..=iterations {
            if shutdown.is_cancelled() {
                run.interrupted = true;
                break;
            }
            info!("Test iteration {}/{}", i, iterations);
            let next_fire = self.scheduler.next_fire_time();
            match self
                .controller
                .feed(FeedTrigger::Manual, clock.now(), next_fire, &mut self.sink)
            {
                Ok(_) => run.succeeded += 1,
                Err(_) => run.failed += 1,
            }
            if i < iterations && shutdown.wait_timeout(interval) {
                run.interrupted = true;
                break;
            }
        }
        if run.interrupted {
            info!("Test run interrupted by user");
        }
        self.stop();
        run
    }

    /// Release the motor and report how many times the job fired.
    pub fn stop(&mut self) -> u64 {
        if let Err(e) = self.controller.release() {
            warn!("Motor release on exit failed: {}", e);
        }
        let fires = self.scheduler.fire_count();
        self.sink.emit(&AppEvent::Stopped { fires });
        fires
    }

    fn evaluate_recovery(&mut self, now: NaiveDateTime) -> RecoveryDecision {
        let next_fire = self.scheduler.next_fire_time();
        self.recovery
            .run(now, &mut self.controller, next_fire, &mut self.sink)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn next_fire_time(&self) -> Option<NaiveDateTime> {
        self.scheduler.next_fire_time()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn controller(&self) -> &FeedController<M, S> {
        &self.controller
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }
}
