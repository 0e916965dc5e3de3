//! Missed-feed recovery policy.
//!
//! Evaluated once at startup and, optionally, on every heartbeat.
//!
//! ```text
//!           ┌──────────┐  disabled            ┌──────────┐
//!  now ───▶ │ enabled? │ ───────────────────▶ │ Disabled │
//!           └────┬─────┘                      └──────────┘
//!                │ no attempt ever recorded   ┌──────────┐
//!                ├──────────────────────────▶ │ NeverFed │
//!                │                            └──────────┘
//!                │ attempt at/after latest    ┌───────────┐
//!                ├──────────────────────────▶ │ NotMissed │
//!                │ occurrence, or now == occ. └───────────┘
//!                │ missed, delay <= window    ┌─────────────────┐
//!                ├──────────────────────────▶ │ Recover / Skip  │
//!                │                            └─────────────────┘
//!                │ missed, delay > window     ┌───────────────┐
//!                └──────────────────────────▶ │ WindowElapsed │
//!                                             └───────────────┘
//! ```
//!
//! "Missed" is decided against the most recent scheduled occurrence, not
//! against calendar dates: an attempt recorded at or after that occurrence
//! means it fired.  This keeps late-evening feed times and a restart just
//! after midnight correct.

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use log::{error, info, warn};

use crate::app::controller::FeedController;
use crate::app::events::{AppEvent, FeedTrigger};
use crate::app::ports::{EventSink, FeedStore, MotorPort};
use crate::config::{FeederConfig, RecoveryMode};
use crate::scheduler::latest_occurrence;
use crate::state::FeedState;

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// Recovery is switched off.
    Disabled,
    /// No feed was ever recorded; a first run is not a missed feed.
    NeverFed,
    /// The latest occurrence already fired, or is exactly now.
    NotMissed,
    /// This process already acted on the occurrence.
    AlreadyHandled { occurrence: NaiveDateTime },
    /// Missed within the window, mode `feed`.
    Recover {
        occurrence: NaiveDateTime,
        delay: TimeDelta,
    },
    /// Missed within the window, mode `skip`.
    Skip {
        occurrence: NaiveDateTime,
        delay: TimeDelta,
    },
    /// Missed, but later than the window allows.
    WindowElapsed {
        occurrence: NaiveDateTime,
        delay: TimeDelta,
    },
}

impl RecoveryDecision {
    /// The occurrence this decision is about, for actionable outcomes.
    pub fn occurrence(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Recover { occurrence, .. }
            | Self::Skip { occurrence, .. }
            | Self::WindowElapsed { occurrence, .. }
            | Self::AlreadyHandled { occurrence } => Some(*occurrence),
            Self::Disabled | Self::NeverFed | Self::NotMissed => None,
        }
    }
}

pub struct RecoveryPolicy {
    enabled: bool,
    mode: RecoveryMode,
    max_delay: TimeDelta,
    feed_time: NaiveTime,
    /// Occurrence this process already recovered, skipped or abandoned.
    handled: Option<NaiveDateTime>,
}

impl RecoveryPolicy {
    pub fn new(config: &FeederConfig) -> Self {
        let max_secs = i64::try_from(config.recovery.max_delay_secs).unwrap_or(i64::MAX);
        Self {
            enabled: config.recovery.enabled,
            mode: config.recovery.mode,
            max_delay: TimeDelta::try_seconds(max_secs).unwrap_or(TimeDelta::MAX),
            feed_time: config.feed_time,
            handled: None,
        }
    }

    /// Pure decision for `now` against the recorded history.
    pub fn evaluate(&self, now: NaiveDateTime, state: &FeedState) -> RecoveryDecision {
        if !self.enabled {
            return RecoveryDecision::Disabled;
        }
        let Some(last_feed_at) = state.last_feed_at else {
            return RecoveryDecision::NeverFed;
        };

        let occurrence = latest_occurrence(self.feed_time, now);
        if now <= occurrence || last_feed_at >= occurrence {
            return RecoveryDecision::NotMissed;
        }

        let delay = now - occurrence;
        if delay > self.max_delay {
            RecoveryDecision::WindowElapsed { occurrence, delay }
        } else {
            match self.mode {
                RecoveryMode::Feed => RecoveryDecision::Recover { occurrence, delay },
                RecoveryMode::Skip => RecoveryDecision::Skip { occurrence, delay },
            }
        }
    }

    /// Evaluate, act on the decision, and remember the occurrence.
    ///
    /// In `feed` mode the missed feed runs immediately through `controller`.
    /// Skips and abandoned occurrences are logged once per occurrence.  A
    /// failed recovery feed is recorded by the controller and logged here;
    /// it still counts as handled so it is not retried every heartbeat.
    pub fn run<M: MotorPort, S: FeedStore>(
        &mut self,
        now: NaiveDateTime,
        controller: &mut FeedController<M, S>,
        next_fire: Option<NaiveDateTime>,
        sink: &mut impl EventSink,
    ) -> RecoveryDecision {
        let mut decision = self.evaluate(now, controller.state());
        if let Some(occurrence) = decision.occurrence() {
            if self.handled == Some(occurrence) {
                decision = RecoveryDecision::AlreadyHandled { occurrence };
            }
        }

        match decision {
            RecoveryDecision::Disabled
            | RecoveryDecision::NeverFed
            | RecoveryDecision::NotMissed
            | RecoveryDecision::AlreadyHandled { .. } => return decision,
            RecoveryDecision::Recover { occurrence, delay } => {
                info!(
                    "Recovery: feed due {} missed by {}s, feeding now",
                    occurrence,
                    delay.num_seconds()
                );
            }
            RecoveryDecision::Skip { occurrence, delay } => {
                info!(
                    "Recovery: feed due {} missed by {}s, mode=skip, not feeding",
                    occurrence,
                    delay.num_seconds()
                );
            }
            RecoveryDecision::WindowElapsed { occurrence, delay } => {
                warn!(
                    "Recovery: feed due {} missed by {}s (> {}s window), abandoned until next occurrence",
                    occurrence,
                    delay.num_seconds(),
                    self.max_delay.num_seconds()
                );
            }
        }

        self.handled = decision.occurrence();
        sink.emit(&AppEvent::Recovery(decision));

        if matches!(decision, RecoveryDecision::Recover { .. }) {
            if let Err(e) = controller.feed(FeedTrigger::Recovery, now, next_fire, sink) {
                error!("Recovery: feed for {} failed: {}", now, e);
            }
        }
        decision
    }
}
