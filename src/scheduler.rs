//! Daily wall-clock scheduler.
//!
//! Owns a single [`ScheduledJob`] bound to a time-of-day.  The caller's
//! control loop drives it with [`Scheduler::tick`] and an injected `now`;
//! when the job is due the scheduler re-arms for the next occurrence and
//! then notifies a [`SchedulerDelegate`].
//!
//! ```text
//!   control loop ── tick(now) ──▶ Scheduler ── on_schedule_fired ──▶ delegate
//!                                    │                                   │
//!                                    └── next_fire_time() ◀── status ────┘
//! ```
//!
//! Nothing here is persisted.  A crash before a fire loses at most that
//! occurrence; the recovery policy picks it up on restart.

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use log::{error, info};

use crate::app::ports::SchedulerDelegate;
use crate::error::Error;

// ═══════════════════════════════════════════════════════════════
//  Occurrence arithmetic
// ═══════════════════════════════════════════════════════════════

/// First occurrence of `at` that is `>= now`.
pub fn first_occurrence(at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today >= now {
        today
    } else {
        today + TimeDelta::days(1)
    }
}

/// First occurrence of `at` strictly after `now`.
pub fn next_occurrence(at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + TimeDelta::days(1)
    }
}

/// Most recent occurrence of `at` that is `<= now`.
pub fn latest_occurrence(at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today <= now {
        today
    } else {
        today - TimeDelta::days(1)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Job
// ═══════════════════════════════════════════════════════════════

/// The single daily trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub label: String,
    pub at: NaiveTime,
    next_fire: NaiveDateTime,
    fire_count: u64,
    failure_count: u64,
}

impl ScheduledJob {
    pub fn next_fire(&self) -> NaiveDateTime {
        self.next_fire
    }
}

/// What a single [`Scheduler::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No job registered or not due yet.
    Idle,
    /// The job ran and succeeded.
    Fired { next_fire: NaiveDateTime },
    /// The job ran and failed; it stays armed.
    Failed { next_fire: NaiveDateTime },
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// The scheduler engine.
///
/// Decoupled from the feed controller: the job body is supplied per tick
/// as a [`SchedulerDelegate`], so the scheduler is testable with a
/// recording delegate and a fake `now`.
#[derive(Debug, Default)]
pub struct Scheduler {
    job: Option<ScheduledJob>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { job: None }
    }

    /// Register the daily job, replacing any previous registration.
    ///
    /// Returns the first fire time: today's `at` if it has not passed yet,
    /// otherwise tomorrow's.
    pub fn schedule_daily(
        &mut self,
        label: impl Into<String>,
        at: NaiveTime,
        now: NaiveDateTime,
    ) -> NaiveDateTime {
        let label = label.into();
        let next_fire = first_occurrence(at, now);
        info!("Scheduler: '{}' daily at {}, next fire {}", label, at.format("%H:%M:%S"), next_fire);
        self.job = Some(ScheduledJob {
            label,
            at,
            next_fire,
            fire_count: 0,
            failure_count: 0,
        });
        next_fire
    }

    /// Remove the job.
    pub fn clear(&mut self) {
        if let Some(job) = self.job.take() {
            info!("Scheduler: removed '{}'", job.label);
        }
    }

    /// Tick the scheduler.  Call once per heartbeat.
    ///
    /// If `now` has reached the next fire time the job is re-armed for the
    /// first occurrence strictly after `now` and then invoked exactly once.
    /// A late tick (suspend, long heartbeat) fires once, never once per
    /// skipped day.
    pub fn tick(&mut self, now: NaiveDateTime, delegate: &mut dyn SchedulerDelegate) -> TickOutcome {
        let Some(job) = self.job.as_mut() else {
            return TickOutcome::Idle;
        };
        if now < job.next_fire {
            return TickOutcome::Idle;
        }

        let due = job.next_fire;
        job.next_fire = next_occurrence(job.at, now);
        job.fire_count += 1;
        let next_fire = job.next_fire;
        info!("Scheduler: '{}' fired (due {}, next {})", job.label, due, next_fire);

        match delegate.on_schedule_fired(&job.label, now, next_fire) {
            Ok(()) => TickOutcome::Fired { next_fire },
            Err(e) => {
                job.failure_count += 1;
                let fault = Error::ScheduleJob {
                    label: job.label.clone(),
                    source: Box::new(e),
                };
                error!("Scheduler: {} (still armed for {})", fault, next_fire);
                TickOutcome::Failed { next_fire }
            }
        }
    }

    /// When the job is next expected to run, if one is registered.
    pub fn next_fire_time(&self) -> Option<NaiveDateTime> {
        self.job.as_ref().map(|j| j.next_fire)
    }

    pub fn job(&self) -> Option<&ScheduledJob> {
        self.job.as_ref()
    }

    /// Fires since registration (successful or not).
    pub fn fire_count(&self) -> u64 {
        self.job.as_ref().map_or(0, |j| j.fire_count)
    }

    pub fn failure_count(&self) -> u64 {
        self.job.as_ref().map_or(0, |j| j.failure_count)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
