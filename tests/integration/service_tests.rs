//! Integration tests for the FeederService control loop: scheduler,
//! recovery policy and feed controller wired together over mocks.

use std::time::Duration;

use chrono::{NaiveTime, TimeDelta};

use crate::mock_hw::{at, MemStore, MockMotor, MotorCall, RecordingSink, SteppingClock};

use petfeeder::app::events::{AppEvent, FeedTrigger};
use petfeeder::app::service::FeederService;
use petfeeder::config::{FeederConfig, RecoveryMode};
use petfeeder::recovery::RecoveryDecision;
use petfeeder::scheduler::TickOutcome;
use petfeeder::shutdown::ShutdownToken;
use petfeeder::state::{FeedOutcome, FeedState, FeedStatus};

type Service = FeederService<MockMotor, MemStore, RecordingSink>;

fn config() -> FeederConfig {
    let mut c = FeederConfig::default();
    c.feed_time = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
    c.recovery.max_delay_secs = 3600;
    c
}

fn fed_at(when: chrono::NaiveDateTime) -> FeedState {
    let mut s = FeedState::default();
    s.apply(FeedOutcome::Success, when, None, None);
    s
}

fn service(config: &FeederConfig, motor: &MockMotor, store: &MemStore) -> Service {
    FeederService::new(config, motor.clone(), store.clone(), RecordingSink::new())
}

// ── Scenario A: first run ─────────────────────────────────────

#[test]
fn first_run_without_state_does_not_recover() {
    let motor = MockMotor::new();
    let store = MemStore::new();
    let mut svc = service(&config(), &motor, &store);

    let decision = svc.start(at(2, 8, 5, 0));

    assert_eq!(decision, RecoveryDecision::NeverFed);
    assert!(!svc.controller().state().active);
    assert_eq!(svc.controller().state().last_feed_at, None);
    assert_eq!(motor.log.borrow().rotations(), 0);
    assert_eq!(svc.next_fire_time(), Some(at(3, 8, 0, 0)));
}

// ── Scenario B: missed inside the window ──────────────────────

#[test]
fn missed_feed_inside_window_is_recovered_once() {
    let motor = MockMotor::new();
    let store = MemStore::with_state(fed_at(at(1, 8, 1, 0)));
    let mut svc = service(&config(), &motor, &store);

    let decision = svc.start(at(2, 8, 5, 0));
    assert!(matches!(decision, RecoveryDecision::Recover { .. }));

    let persisted = store.persisted().unwrap();
    assert_eq!(persisted.total_count, 2);
    assert_eq!(persisted.success_count, 2);
    assert_eq!(persisted.last_feed_status, FeedStatus::Success);
    assert_eq!(persisted.last_feed_at, Some(at(2, 8, 5, 0)));

    // Idempotence: later heartbeats find nothing missed.
    let hb = svc.heartbeat(at(2, 8, 6, 0));
    assert_eq!(hb.tick, TickOutcome::Idle);
    assert_eq!(hb.recovery, Some(RecoveryDecision::NotMissed));
    assert_eq!(motor.log.borrow().rotations(), 1);
    assert_eq!(
        svc.sink()
            .count(|e| matches!(e, AppEvent::FeedStarted { trigger: FeedTrigger::Recovery, .. })),
        1
    );
}

// ── Scenario C: missed beyond the window ──────────────────────

#[test]
fn missed_feed_beyond_window_is_abandoned() {
    let motor = MockMotor::new();
    let store = MemStore::with_state(fed_at(at(1, 8, 1, 0)));
    let mut svc = service(&config(), &motor, &store);

    let now = at(2, 8, 0, 0) + TimeDelta::seconds(4000);
    let decision = svc.start(now);
    assert!(matches!(decision, RecoveryDecision::WindowElapsed { .. }));

    let hb = svc.heartbeat(now + TimeDelta::seconds(60));
    assert!(matches!(hb.recovery, Some(RecoveryDecision::AlreadyHandled { .. })));

    assert_eq!(motor.log.borrow().rotations(), 0);
    assert_eq!(store.persisted().unwrap().total_count, 1);
    assert_eq!(
        svc.sink().count(|e| matches!(e, AppEvent::Recovery(_))),
        1,
        "abandoned occurrence is reported once"
    );
}

#[test]
fn skip_mode_reports_once_and_never_feeds() {
    let mut c = config();
    c.recovery.mode = RecoveryMode::Skip;
    let motor = MockMotor::new();
    let store = MemStore::with_state(fed_at(at(1, 8, 1, 0)));
    let mut svc = service(&c, &motor, &store);

    assert!(matches!(svc.start(at(2, 8, 5, 0)), RecoveryDecision::Skip { .. }));
    svc.heartbeat(at(2, 8, 6, 0));
    svc.heartbeat(at(2, 8, 7, 0));

    assert_eq!(motor.log.borrow().rotations(), 0);
    assert_eq!(svc.sink().count(|e| matches!(e, AppEvent::Recovery(_))), 1);
}

#[test]
fn recovery_not_repeated_when_outcome_cannot_be_persisted() {
    let motor = MockMotor::new();
    let store = MemStore::with_state(fed_at(at(1, 8, 1, 0)));
    store.cell.borrow_mut().fail_writes = true;
    let mut svc = service(&config(), &motor, &store);

    svc.start(at(2, 8, 5, 0));
    svc.heartbeat(at(2, 8, 6, 0));
    svc.heartbeat(at(2, 8, 7, 0));

    assert_eq!(motor.log.borrow().rotations(), 1);
    assert_eq!(store.persisted().unwrap().total_count, 1);
    assert_eq!(svc.controller().state().total_count, 2);
}

#[test]
fn heartbeat_recovery_can_be_switched_off() {
    let mut c = config();
    c.recovery.on_heartbeat = false;
    let mut svc = service(&c, &MockMotor::new(), &MemStore::new());
    svc.start(at(2, 7, 0, 0));
    assert_eq!(svc.heartbeat(at(2, 7, 1, 0)).recovery, None);
}

// ── Scenario E: scheduled job failure ─────────────────────────

#[test]
fn failed_scheduled_feed_stays_armed_for_next_day() {
    let motor = MockMotor::broken();
    let store = MemStore::new();
    let mut svc = service(&config(), &motor, &store);

    svc.start(at(2, 7, 59, 0));
    let hb = svc.heartbeat(at(2, 8, 0, 0));

    assert_eq!(hb.tick, TickOutcome::Failed { next_fire: at(3, 8, 0, 0) });
    assert_eq!(svc.next_fire_time(), Some(at(3, 8, 0, 0)));
    assert_eq!(svc.scheduler().failure_count(), 1);
    assert_eq!(hb.recovery, Some(RecoveryDecision::NotMissed));

    let persisted = store.persisted().unwrap();
    assert_eq!(persisted.last_feed_status, FeedStatus::Failed);
    assert_eq!(persisted.failure_count, 1);
    assert_eq!(persisted.next_scheduled_at, Some(at(3, 8, 0, 0)));
}

#[test]
fn scheduled_feed_fires_once_per_day() {
    let motor = MockMotor::new();
    let mut svc = service(&config(), &motor, &MemStore::new());
    svc.start(at(2, 7, 0, 0));

    let mut now = at(2, 7, 0, 0);
    while now < at(4, 7, 0, 0) {
        svc.heartbeat(now);
        now += TimeDelta::minutes(1);
    }

    assert_eq!(svc.scheduler().fire_count(), 2);
    assert_eq!(motor.log.borrow().rotations(), 2);
}

// ── Control loop ──────────────────────────────────────────────

#[test]
fn run_stops_after_fire_limit_and_releases() {
    let motor = MockMotor::new();
    let store = MemStore::new();
    let mut svc = service(&config(), &motor, &store).with_heartbeat(Duration::ZERO);
    let clock = SteppingClock::new(at(2, 7, 59, 57), TimeDelta::seconds(1));

    svc.start(at(2, 7, 59, 57));
    let fires = svc.run(&clock, &ShutdownToken::new(), Some(1));

    assert_eq!(fires, 1);
    assert_eq!(store.persisted().unwrap().last_feed_at, Some(at(2, 8, 0, 0)));
    assert_eq!(motor.log.borrow().calls.last(), Some(&MotorCall::Release));
    assert!(matches!(svc.sink().events.last(), Some(AppEvent::Stopped { fires: 1 })));
}

#[test]
fn cancelled_token_exits_before_first_heartbeat() {
    let motor = MockMotor::new();
    let mut svc = service(&config(), &motor, &MemStore::new());
    let clock = SteppingClock::new(at(2, 8, 0, 0), TimeDelta::seconds(1));
    let token = ShutdownToken::new();
    token.cancel();

    svc.start(at(2, 7, 0, 0));
    assert_eq!(svc.run(&clock, &token, None), 0);
    assert_eq!(motor.log.borrow().calls, vec![MotorCall::Release]);
    assert_eq!(clock.peek(), at(2, 8, 0, 0), "clock never read");
}

#[test]
fn test_feeds_count_failures_and_continue() {
    let motor = MockMotor::failing_on(2);
    let store = MemStore::new();
    let mut svc = service(&config(), &motor, &store);
    let clock = SteppingClock::new(at(2, 12, 0, 0), TimeDelta::seconds(10));

    let run = svc.run_test_feeds(3, Duration::ZERO, &clock, &ShutdownToken::new());

    assert_eq!(run.succeeded, 2);
    assert_eq!(run.failed, 1);
    assert!(!run.interrupted);
    let persisted = store.persisted().unwrap();
    assert_eq!(persisted.total_count, 3);
    assert_eq!(persisted.failure_count, 1);
    assert_eq!(motor.log.borrow().calls.last(), Some(&MotorCall::Release));
}
