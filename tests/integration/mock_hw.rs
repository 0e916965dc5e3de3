//! Mock adapters for integration tests.
//!
//! Records every motor call and every emitted event so tests can assert on
//! the full history without touching real GPIO or the filesystem.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use petfeeder::app::events::AppEvent;
use petfeeder::app::ports::{Clock, EventSink, FeedStore, MotorPort, StoredState};
use petfeeder::error::{ActuatorError, StorageError};
use petfeeder::state::{FeedOutcome, FeedState};

/// `2025-06-{day} {h}:{m}:{s}`.
pub fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, day)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

// ── Motor ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum MotorCall {
    Rotate(i32),
    Release,
}

#[derive(Debug, Default)]
pub struct MotorLog {
    pub calls: Vec<MotorCall>,
    /// 1-based rotate call that fails.
    pub fail_on_rotate: Option<usize>,
    /// Every rotate call fails.
    pub always_fail: bool,
}

#[allow(dead_code)]
impl MotorLog {
    pub fn rotations(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, MotorCall::Rotate(_)))
            .count()
    }

    pub fn releases(&self) -> usize {
        self.calls.iter().filter(|c| **c == MotorCall::Release).count()
    }
}

/// Motor whose log stays readable after it is moved into the controller.
#[derive(Clone, Default)]
pub struct MockMotor {
    pub log: Rc<RefCell<MotorLog>>,
}

#[allow(dead_code)]
impl MockMotor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(rotate: usize) -> Self {
        let m = Self::new();
        m.log.borrow_mut().fail_on_rotate = Some(rotate);
        m
    }

    pub fn broken() -> Self {
        let m = Self::new();
        m.log.borrow_mut().always_fail = true;
        m
    }
}

impl MotorPort for MockMotor {
    fn rotate(&mut self, steps: i32) -> Result<(), ActuatorError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(MotorCall::Rotate(steps));
        let n = log.rotations();
        if log.always_fail || log.fail_on_rotate == Some(n) {
            return Err(ActuatorError::output(2, "EIO"));
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), ActuatorError> {
        self.log.borrow_mut().calls.push(MotorCall::Release);
        Ok(())
    }
}

// ── Store ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct StoreCell {
    pub state: Option<FeedState>,
    pub corrupt: bool,
    pub fail_writes: bool,
    pub writes: usize,
}

/// In-memory [`FeedStore`] with fault switches.
#[derive(Clone, Default)]
pub struct MemStore {
    pub cell: Rc<RefCell<StoreCell>>,
}

#[allow(dead_code)]
impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: FeedState) -> Self {
        let s = Self::new();
        s.cell.borrow_mut().state = Some(state);
        s
    }

    pub fn persisted(&self) -> Option<FeedState> {
        self.cell.borrow().state.clone()
    }
}

impl FeedStore for MemStore {
    fn read(&self) -> Result<StoredState, StorageError> {
        let cell = self.cell.borrow();
        if cell.corrupt {
            return Err(StorageError::Corrupt {
                path: "mem".into(),
                cause: "garbage".into(),
            });
        }
        Ok(cell.state.clone().map_or(StoredState::Absent, StoredState::Present))
    }

    fn record(
        &mut self,
        outcome: FeedOutcome,
        at: NaiveDateTime,
        next: Option<NaiveDateTime>,
        error: Option<String>,
    ) -> Result<FeedState, StorageError> {
        if self.cell.borrow().fail_writes {
            return Err(StorageError::Write {
                path: "mem".into(),
                source: std::io::Error::other("disk full"),
            });
        }
        let mut state = self.load().unwrap_or_default();
        state.apply(outcome, at, next, error);
        let mut cell = self.cell.borrow_mut();
        cell.corrupt = false;
        cell.state = Some(state.clone());
        cell.writes += 1;
        Ok(state)
    }

    fn seed(&mut self, state: &FeedState) -> Result<(), StorageError> {
        self.cell.borrow_mut().state = Some(state.clone());
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Fake clock that advances by `step` on every read.
pub struct SteppingClock {
    now: Cell<NaiveDateTime>,
    step: TimeDelta,
}

#[allow(dead_code)]
impl SteppingClock {
    pub fn new(start: NaiveDateTime, step: TimeDelta) -> Self {
        Self {
            now: Cell::new(start),
            step,
        }
    }

    pub fn peek(&self) -> NaiveDateTime {
        self.now.get()
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> NaiveDateTime {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}
