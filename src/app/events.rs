//! Outbound application events.
//!
//! The [`FeedController`](super::controller::FeedController) and
//! [`FeederService`](super::service::FeederService) emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (log line, test recorder, ...).

use chrono::NaiveDateTime;

use crate::recovery::RecoveryDecision;

/// Why a feed cycle was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedTrigger {
    /// The daily scheduler fired.
    Scheduled,
    /// A missed feed inside the recovery window.
    Recovery,
    /// A test command.
    Manual,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service armed its daily job.
    Started { next_fire: NaiveDateTime },

    /// A feed cycle began.
    FeedStarted { trigger: FeedTrigger, repetitions: u32 },

    /// All repetitions completed.
    FeedCompleted {
        trigger: FeedTrigger,
        repetitions: u32,
        total_count: u64,
    },

    /// A repetition failed; the remaining ones were aborted.
    FeedFailed {
        trigger: FeedTrigger,
        repetition: u32,
        error: String,
    },

    /// The outcome could not be persisted; memory stays authoritative.
    StateNotPersisted { error: String },

    /// The scheduler re-armed after a fire.
    ScheduleRearmed { next_fire: NaiveDateTime },

    /// The recovery policy reached a decision worth reporting.
    Recovery(RecoveryDecision),

    /// The control loop is exiting.
    Stopped { fires: u64 },
}
