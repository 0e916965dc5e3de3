//! Integration tests for the FeedController → MotorPort / FeedStore chain.

use crate::mock_hw::{at, MemStore, MockMotor, MotorCall, RecordingSink};

use petfeeder::app::controller::FeedController;
use petfeeder::app::events::{AppEvent, FeedTrigger};
use petfeeder::config::FeederConfig;
use petfeeder::error::Error;
use petfeeder::state::{FeedState, FeedStatus};

fn config(feeds_per_day: u32) -> FeederConfig {
    let mut c = FeederConfig::default();
    c.feeds_per_day = feeds_per_day;
    c
}

#[test]
fn feed_drives_configured_steps_and_records_success() {
    let motor = MockMotor::new();
    let store = MemStore::new();
    let mut controller = FeedController::new(&config(2), motor.clone(), store.clone());
    let mut sink = RecordingSink::new();

    let report = controller
        .feed(FeedTrigger::Scheduled, at(2, 8, 0, 0), Some(at(3, 8, 0, 0)), &mut sink)
        .unwrap();

    assert_eq!(report.repetitions, 2);
    assert_eq!(
        motor.log.borrow().calls,
        vec![MotorCall::Rotate(128), MotorCall::Rotate(128)]
    );
    let persisted = store.persisted().unwrap();
    assert_eq!(persisted.last_feed_status, FeedStatus::Success);
    assert_eq!(persisted.next_scheduled_at, Some(at(3, 8, 0, 0)));
    assert!(persisted.active);
    assert!(matches!(
        sink.events.last(),
        Some(AppEvent::FeedCompleted { total_count: 1, .. })
    ));
}

// Scenario D: fault on repetition 2 of 3.
#[test]
fn fault_mid_cycle_aborts_and_records_failure() {
    let motor = MockMotor::failing_on(2);
    let store = MemStore::new();
    let mut controller = FeedController::new(&config(3), motor.clone(), store.clone());
    let mut sink = RecordingSink::new();

    let err = controller
        .feed(FeedTrigger::Scheduled, at(2, 8, 0, 0), None, &mut sink)
        .unwrap_err();

    assert!(matches!(err, Error::Actuator(_)));
    assert_eq!(motor.log.borrow().rotations(), 2);
    let persisted = store.persisted().unwrap();
    assert_eq!(persisted.last_feed_status, FeedStatus::Failed);
    assert_eq!(persisted.failure_count, 1);
    assert_eq!(persisted.success_count, 0);
    assert!(persisted.last_error.as_deref().unwrap().contains("EIO"));
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::FeedFailed { repetition: 2, .. })));
}

#[test]
fn storage_failure_keeps_memory_authoritative() {
    let store = MemStore::new();
    store.cell.borrow_mut().fail_writes = true;
    let mut controller = FeedController::new(&config(1), MockMotor::new(), store.clone());
    let mut sink = RecordingSink::new();

    let report = controller
        .feed(FeedTrigger::Manual, at(2, 9, 0, 0), None, &mut sink)
        .unwrap();

    assert!(!report.persisted);
    assert!(store.persisted().is_none());
    assert_eq!(controller.state().total_count, 1);
    assert_eq!(controller.state().last_feed_at, Some(at(2, 9, 0, 0)));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::StateNotPersisted { .. })),
        1
    );
}

#[test]
fn corrupt_store_starts_from_empty_history() {
    let store = MemStore::new();
    store.cell.borrow_mut().corrupt = true;
    let controller = FeedController::new(&config(1), MockMotor::new(), store);
    assert_eq!(controller.state(), &FeedState::default());
}

#[test]
fn calibrate_moves_without_recording() {
    let motor = MockMotor::new();
    let store = MemStore::new();
    let mut controller = FeedController::new(&config(1), motor.clone(), store.clone());

    controller.calibrate(512).unwrap();
    controller.release().unwrap();

    assert_eq!(
        motor.log.borrow().calls,
        vec![MotorCall::Rotate(512), MotorCall::Release]
    );
    assert_eq!(store.cell.borrow().writes, 0);
}
