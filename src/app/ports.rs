//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FeedController / FeederService (domain)
//! ```
//!
//! Driven adapters (motor, state file, clock, event sinks) implement these
//! traits.  The domain consumes them via generics, so the core never
//! touches GPIO, the filesystem or the wall clock directly.

use chrono::NaiveDateTime;

use crate::error::{ActuatorError, StorageError};
use crate::state::{FeedOutcome, FeedState};

// ───────────────────────────────────────────────────────────────
// Motor port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Abstract "drive N steps" capability.
///
/// Implementations must leave every output de-energized when `rotate`
/// returns, on success and on error alike.
pub trait MotorPort {
    /// Drive `steps.abs()` increments; negative values reverse direction.
    fn rotate(&mut self, steps: i32) -> Result<(), ActuatorError>;

    /// De-energize all outputs.
    fn release(&mut self) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Feed store port (driven adapter: domain ↔ persisted history)
// ───────────────────────────────────────────────────────────────

/// Result of reading the backing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredState {
    /// No record exists yet: the feeder has never fed.  Not an error.
    Absent,
    Present(FeedState),
}

impl StoredState {
    pub fn into_state(self) -> FeedState {
        match self {
            Self::Absent => FeedState::default(),
            Self::Present(state) => state,
        }
    }
}

/// Durable feed history.
///
/// # Atomicity
///
/// `record` must replace the backing record atomically: a concurrent
/// reader sees either the old or the new state, and a crash mid-write
/// never leaves a truncated record.
pub trait FeedStore {
    /// Read the record.  Unreadable or invalid data is [`StorageError::Corrupt`].
    fn read(&self) -> Result<StoredState, StorageError>;

    /// Fold one attempt into the stored history and return the new state.
    fn record(
        &mut self,
        outcome: FeedOutcome,
        at: NaiveDateTime,
        next_scheduled_at: Option<NaiveDateTime>,
        error: Option<String>,
    ) -> Result<FeedState, StorageError>;

    /// Replace the record wholesale.
    fn seed(&mut self, state: &FeedState) -> Result<(), StorageError>;

    /// Zero state when absent.
    fn load(&self) -> Result<FeedState, StorageError> {
        self.read().map(StoredState::into_state)
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Local wall-clock time source.  Injected so tests control `now`.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from the feed controller)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when its job fires.
///
/// The scheduler re-arms before calling, so `next_fire` is already the
/// following occurrence.  An `Err` is logged and swallowed by the
/// scheduler; it never deregisters the job.
pub trait SchedulerDelegate {
    fn on_schedule_fired(
        &mut self,
        label: &str,
        now: NaiveDateTime,
        next_fire: NaiveDateTime,
    ) -> crate::error::Result<()>;
}
